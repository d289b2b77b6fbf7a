// ==========================================
// 贸易 EDI 核心 - 315 里程碑分发引擎
// ==========================================
// 职责: 领域对象快照 -> 规范化事件 -> 指纹判重 -> 拆分出站 -> 送达确认
// 并发: 同一 broker_reference 的分发经命名锁串行化（锁键 "315-<编号>"）
// 红线: 指纹、发送时间、已占用分钟必须在送达前同一次写入 ——
//       崩溃后重放对相同持久状态得到相同结果
// ==========================================

use crate::config::field_registry::FieldRegistry;
use crate::config::milestone::MilestoneConfig;
use crate::domain::entry::Entry;
use crate::domain::milestone::MilestoneUpdate;
use crate::engine::fingerprint::{milestone_code, milestone_fingerprint};
use crate::engine::locks::NamedLockRegistry;
use crate::engine::time_adjust::{self, adjust_collision};
use crate::output::splitter::split_documents;
use crate::output::OutboundGenerator;
use crate::repository::sync_record_repo::SyncRecordStore;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

// ==========================================
// DispatchSummary - 单趟分发结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub emitted: usize,       // 本趟生成并尝试送达的事件数
    pub suppressed: usize,    // 指纹判重拦下的事件数
    pub skipped_blank: usize, // 字段值为空而跳过的事件数
    pub delivered_docs: usize,
    pub failed_docs: usize,   // 送达失败的文档数（同步记录保持未确认，等重发窗口）
}

// ==========================================
// MilestoneDispatchEngine - 分发引擎
// ==========================================
pub struct MilestoneDispatchEngine<'a> {
    config: &'a MilestoneConfig,
    registry: &'a FieldRegistry,
    store: &'a dyn SyncRecordStore,
    generator: &'a dyn OutboundGenerator,
    locks: &'a NamedLockRegistry,
}

impl<'a> MilestoneDispatchEngine<'a> {
    pub fn new(
        config: &'a MilestoneConfig,
        registry: &'a FieldRegistry,
        store: &'a dyn SyncRecordStore,
        generator: &'a dyn OutboundGenerator,
        locks: &'a NamedLockRegistry,
    ) -> Self {
        Self {
            config,
            registry,
            store,
            generator,
            locks,
        }
    }

    /// 对一份领域对象快照跑一趟分发
    ///
    /// # 流程
    /// 1. 取 "315-<broker_reference>" 命名锁
    /// 2. 检索条件求值（任一不满足则整趟跳过）
    /// 3. 逐里程碑字段: 导出 -> 规范化 -> 指纹判重 -> 冲突规避 -> 登记发送
    /// 4. 按输出方式拆分文档并送达（失败不回滚已登记状态，等重发窗口）
    pub async fn dispatch(&self, entry: &Entry) -> anyhow::Result<DispatchSummary> {
        let lock_key = format!("315-{}", entry.broker_reference);
        let _guard = self.locks.acquire(&lock_key).await;

        let mut summary = DispatchSummary::default();

        // === 步骤 1: 检索条件 ===
        for criterion in &self.config.search_criteria {
            let exported = self.registry.export_string(entry, &criterion.field_id);
            if !criterion.matches(exported.as_deref()) {
                tracing::debug!(
                    entity = %entry.broker_reference,
                    field = %criterion.field_id,
                    "检索条件不满足，整趟跳过"
                );
                return Ok(summary);
            }
        }

        // === 步骤 2: 辅助指纹字段（一趟内对所有事件相同） ===
        let aux_fields: Vec<String> = self
            .config
            .fingerprint_fields
            .iter()
            .filter_map(|field_id| self.registry.export_string(entry, field_id))
            .collect();

        // === 步骤 3: 逐里程碑字段生成事件 ===
        let now = Utc::now();
        let mut updates: Vec<MilestoneUpdate> = Vec::new();
        for field in &self.config.milestone_fields {
            let Some(raw) = self.registry.export_datetime(entry, &field.field_id) else {
                summary.skipped_blank += 1;
                continue;
            };

            let tz = field.timezone.unwrap_or(self.config.default_timezone);
            let mut date = normalize(raw, tz, field.no_time);
            let code = milestone_code(&field.field_id).to_string();
            let trading_partner = format!("315_{code}");

            if self.config.testing {
                // 测试模式: 绕过指纹判重，总是发送；不触碰同步账本
                updates.push(MilestoneUpdate {
                    code,
                    date,
                    trading_partner,
                });
                summary.emitted += 1;
                continue;
            }

            let mut record = self
                .store
                .find_or_create(&entry.broker_reference, &trading_partner)?;
            let fingerprint = milestone_fingerprint(&code, &date, &aux_fields);

            if !record.should_send(&fingerprint, now) {
                summary.suppressed += 1;
                continue;
            }

            if self.config.gtn_time_modifier {
                let resend = record.fingerprint.as_deref() == Some(fingerprint.as_str());
                let day = time_adjust::day_key(&date);
                date = match record.context.assigned_minutes.get(&day) {
                    // 同指纹重发: 复用自己已占用的分钟，重试不漂移
                    Some(&minute) if resend => time_adjust::with_minute_of_day(&date, minute),
                    _ => {
                        let adjusted = adjust_collision(&mut record.context.milestone_uids, date);
                        record
                            .context
                            .assigned_minutes
                            .insert(day, adjusted.hour() * 60 + adjusted.minute());
                        adjusted
                    }
                };
            }

            // 指纹、发送时间、已占用分钟同一次落库，然后才尝试送达
            record.fingerprint = Some(fingerprint);
            record.sent_at = Some(now);
            record.confirmed_at = None;
            self.store.save(&record)?;

            updates.push(MilestoneUpdate {
                code,
                date,
                trading_partner,
            });
            summary.emitted += 1;
        }

        if updates.is_empty() {
            return Ok(summary);
        }

        // === 步骤 4: 拆分出站并并发送达 ===
        let docs = split_documents(self.config.output_style, entry, &updates);
        let results = futures::future::join_all(
            docs.iter()
                .map(|doc| self.generator.generate_and_send(doc, self.store)),
        )
        .await;
        for result in results {
            match result {
                Ok(()) => summary.delivered_docs += 1,
                Err(e) => {
                    summary.failed_docs += 1;
                    tracing::error!(
                        entity = %entry.broker_reference,
                        error = %e,
                        "出站文档送达失败，同步记录保持未确认"
                    );
                }
            }
        }

        tracing::info!(
            entity = %entry.broker_reference,
            emitted = summary.emitted,
            suppressed = summary.suppressed,
            delivered = summary.delivered_docs,
            failed = summary.failed_docs,
            "315 分发完成"
        );
        Ok(summary)
    }
}

/// 规范化事件时间: 换到目标时区，秒与纳秒归零；仅日期字段截断到当日零点
fn normalize(raw: DateTime<Utc>, tz: Tz, no_time: bool) -> DateTime<Tz> {
    let local = raw.with_timezone(&tz);
    if no_time {
        tz.with_ymd_and_hms(local.year(), local.month(), local.day(), 0, 0, 0)
            .single()
            .unwrap_or(local)
    } else {
        local
            .with_second(0)
            .and_then(|d| d.with_nanosecond(0))
            .unwrap_or(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_strips_seconds() {
        let raw = Utc.with_ymd_and_hms(2020, 3, 15, 12, 30, 17).unwrap();
        let normalized = normalize(raw, chrono_tz::America::New_York, false);
        // 2020-03-15 为美东夏令时（UTC-4）
        assert_eq!(normalized.to_rfc3339(), "2020-03-15T08:30:00-04:00");
    }

    #[test]
    fn test_normalize_date_only_is_local_midnight() {
        let raw = Utc.with_ymd_and_hms(2020, 3, 15, 12, 30, 17).unwrap();
        let normalized = normalize(raw, chrono_tz::America::New_York, true);
        assert_eq!(normalized.to_rfc3339(), "2020-03-15T00:00:00-04:00");
    }

    #[test]
    fn test_normalize_timezone_shifts_day() {
        // UTC 晚间在上海已是次日
        let raw = Utc.with_ymd_and_hms(2020, 3, 15, 22, 0, 0).unwrap();
        let normalized = normalize(raw, chrono_tz::Asia::Shanghai, true);
        assert_eq!(normalized.to_rfc3339(), "2020-03-16T00:00:00+08:00");
    }
}
