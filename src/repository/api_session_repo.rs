// ==========================================
// 贸易 EDI 核心 - 外部 API 会话仓储
// ==========================================
// 职责: 持久化外部 REST 调用的会话与响应附件（审计/排障）
// 用途: TradeLens 客户端每次响应都挂为附件
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::format_ts;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// ApiSessionStore - 会话访问接口
// ==========================================
pub trait ApiSessionStore: Send + Sync {
    /// 创建会话，返回会话 id（幂等/排障用）
    fn create_session(&self, name: &str, url: &str) -> RepositoryResult<String>;

    /// 追加响应附件（完整响应体）
    fn append_attachment(
        &self,
        session_id: &str,
        name: &str,
        body: &str,
    ) -> RepositoryResult<()>;

    /// 记录最终 HTTP 状态码
    fn set_result(&self, session_id: &str, status_code: u16) -> RepositoryResult<()>;
}

// ==========================================
// ApiSessionRepository - SQLite 实现
// ==========================================
pub struct ApiSessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ApiSessionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

impl ApiSessionStore for ApiSessionRepository {
    fn create_session(&self, name: &str, url: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let session_id = Uuid::new_v4().to_string();
        conn.execute(
            r#"INSERT INTO api_session (session_id, name, url, status_code, created_at)
               VALUES (?, ?, ?, NULL, ?)"#,
            params![&session_id, name, url, format_ts(&Utc::now())],
        )?;
        Ok(session_id)
    }

    fn append_attachment(
        &self,
        session_id: &str,
        name: &str,
        body: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO api_session_attachment (session_id, name, body, created_at)
               VALUES (?, ?, ?, ?)"#,
            params![session_id, name, body, format_ts(&Utc::now())],
        )?;
        Ok(())
    }

    fn set_result(&self, session_id: &str, status_code: u16) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE api_session SET status_code = ? WHERE session_id = ?",
            params![status_code as i64, session_id],
        )?;
        if changed == 0 {
            return Err(RepositoryError::NotFound {
                entity: "api_session".to_string(),
                key: session_id.to_string(),
            });
        }
        Ok(())
    }
}
