// ==========================================
// 贸易 EDI 核心 - 同步记录仓储
// ==========================================
// 职责: 每 (实体, 目的地) 的发送去重账本
// 不变式: (entity_key, trading_partner) 唯一; context 以 JSON 落库
// ==========================================

use crate::domain::milestone::{SyncContext, SyncRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// SyncRecordStore - 同步记录访问接口
// ==========================================
// 实现者: SyncRecordRepository（生产）、测试内存桩
pub trait SyncRecordStore: Send + Sync {
    /// 按 (实体键, 目的地) 查找，不存在则创建空记录
    fn find_or_create(
        &self,
        entity_key: &str,
        trading_partner: &str,
    ) -> RepositoryResult<SyncRecord>;

    /// 整行保存（指纹 + 发送时间 + 上下文必须同一次写入）
    fn save(&self, record: &SyncRecord) -> RepositoryResult<()>;

    /// 传输成功后标记确认时间
    fn mark_confirmed(
        &self,
        entity_key: &str,
        trading_partner: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<()>;
}

// ==========================================
// SyncRecordRepository - SQLite 实现
// ==========================================
pub struct SyncRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SyncRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl SyncRecordStore for SyncRecordRepository {
    fn find_or_create(
        &self,
        entity_key: &str,
        trading_partner: &str,
    ) -> RepositoryResult<SyncRecord> {
        let conn = self.get_conn()?;

        let row: Option<(Option<String>, Option<String>, Option<String>, String)> =
            match conn.query_row(
                r#"SELECT fingerprint, sent_at, confirmed_at, context
                   FROM sync_record
                   WHERE entity_key = ? AND trading_partner = ?"#,
                params![entity_key, trading_partner],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            ) {
                Ok(row) => Some(row),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e.into()),
            };

        if let Some((fingerprint, sent_at, confirmed_at, context)) = row {
            let mut record = SyncRecord::new(entity_key, trading_partner);
            record.fingerprint = fingerprint;
            record.sent_at = sent_at
                .map(|s| parse_ts("sync_record", "sent_at", &s))
                .transpose()?;
            record.confirmed_at = confirmed_at
                .map(|s| parse_ts("sync_record", "confirmed_at", &s))
                .transpose()?;
            record.context = serde_json::from_str::<SyncContext>(&context)?;
            return Ok(record);
        }

        let record = SyncRecord::new(entity_key, trading_partner);
        conn.execute(
            r#"INSERT INTO sync_record (entity_key, trading_partner, fingerprint, sent_at, confirmed_at, context)
               VALUES (?, ?, NULL, NULL, NULL, '{}')"#,
            params![entity_key, trading_partner],
        )?;
        Ok(record)
    }

    fn save(&self, record: &SyncRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let context = serde_json::to_string(&record.context)?;
        let changed = conn.execute(
            r#"UPDATE sync_record
               SET fingerprint = ?, sent_at = ?, confirmed_at = ?, context = ?
               WHERE entity_key = ? AND trading_partner = ?"#,
            params![
                &record.fingerprint,
                record.sent_at.map(|ts| format_ts(&ts)),
                record.confirmed_at.map(|ts| format_ts(&ts)),
                context,
                &record.entity_key,
                &record.trading_partner,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "sync_record".to_string(),
                key: format!("{}/{}", record.entity_key, record.trading_partner),
            });
        }
        Ok(())
    }

    fn mark_confirmed(
        &self,
        entity_key: &str,
        trading_partner: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"UPDATE sync_record SET confirmed_at = ?
               WHERE entity_key = ? AND trading_partner = ?"#,
            params![format_ts(&at), entity_key, trading_partner],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "sync_record".to_string(),
                key: format!("{entity_key}/{trading_partner}"),
            });
        }
        Ok(())
    }
}
