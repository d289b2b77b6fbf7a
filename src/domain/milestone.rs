// ==========================================
// 贸易 EDI 核心 - 里程碑与同步记录
// ==========================================
// 职责: 315 分发的事件记录与去重账本
// 不变式: fingerprint 只在计算指纹变化时更新;
//         confirmed_at 只在传输成功后写入;
//         sent_at 已设而 confirmed_at 为空超过 5 分钟 → 可重发
// ==========================================

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 未确认发送的重发窗口（分钟）
pub const RESEND_WINDOW_MINUTES: i64 = 5;

// ==========================================
// MilestoneUpdate - 里程碑事件（瞬态）
// ==========================================
// 每个配置的里程碑字段、每趟分发生成一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneUpdate {
    pub code: String,                     // 事件码（字段标识去掉首个下划线前缀段）
    pub date: DateTime<Tz>,               // 规范化后的时间（目标时区、分钟精度）
    pub trading_partner: String,          // 对应同步记录目的地（"315_" + code）
}

// ==========================================
// SyncRecord - 同步记录
// ==========================================
// 每 (实体, 目的地) 一行；外部协作者持久化，本核心只读写其字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRecord {
    pub entity_key: String,               // 实体键（broker_reference）
    pub trading_partner: String,          // 目的地（"315_" + 事件码）
    pub fingerprint: Option<String>,      // 上次发送的内容指纹
    pub sent_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub context: SyncContext,             // 时间冲突规避状态
}

impl SyncRecord {
    pub fn new(entity_key: impl Into<String>, trading_partner: impl Into<String>) -> Self {
        Self {
            entity_key: entity_key.into(),
            trading_partner: trading_partner.into(),
            fingerprint: None,
            sent_at: None,
            confirmed_at: None,
            context: SyncContext::default(),
        }
    }

    /// 判断本次计算指纹是否需要发送
    ///
    /// # 规则（任一满足即发送）
    /// - 指纹与存储值不同
    /// - 从未发送（sent_at 为空）
    /// - 上次发送疑似失败: confirmed_at 为空且 sent_at 已超过 5 分钟
    pub fn should_send(&self, fingerprint: &str, now: DateTime<Utc>) -> bool {
        if self.fingerprint.as_deref() != Some(fingerprint) {
            return true;
        }
        match self.sent_at {
            None => true,
            Some(sent) => {
                self.confirmed_at.is_none()
                    && now - sent > Duration::minutes(RESEND_WINDOW_MINUTES)
            }
        }
    }
}

// ==========================================
// SyncContext - 同步记录上下文
// ==========================================
// milestone_uids: 日期串 -> 当日已占用的分钟数（时间冲突规避）
// assigned_minutes: 日期串 -> 本记录当前指纹占用的分钟;
//   同指纹重发复用该分钟，不再走冲突规避（重试不漂移）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncContext {
    #[serde(default)]
    pub milestone_uids: BTreeMap<String, Vec<u32>>,
    #[serde(default)]
    pub assigned_minutes: BTreeMap<String, u32>,
}
