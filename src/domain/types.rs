// ==========================================
// 贸易 EDI 核心 - 领域类型定义
// ==========================================
// 职责: 跨模块共享的基础类型（新旧判定、落库结果）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 新旧判定指示器 (Staleness Indicator)
// ==========================================
// 两种策略（按接入方选择其一）:
// - SourceTimestamp: 报文信封时间戳（发送方不保证单调递增）
// - Revision: 发送方递增的修订号
// 红线: 比较一律使用 >= —— 相同指示器的重投报文必须可重新处理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StalenessIndicator {
    SourceTimestamp(DateTime<Utc>),
    Revision(i64),
}

impl StalenessIndicator {
    /// 判断本指示器（新到报文）是否可覆盖已存储的指示器
    ///
    /// # 规则
    /// - 存储为空（实体新建）: 任何报文都视为更新
    /// - 同类比较: incoming >= stored 则可覆盖（平局允许，容忍重复投递）
    /// - 类型不一致: 视为配置切换，按可覆盖处理并由调用方记录告警
    pub fn supersedes(&self, stored: Option<&StalenessIndicator>) -> bool {
        match (self, stored) {
            (_, None) => true,
            (
                StalenessIndicator::SourceTimestamp(incoming),
                Some(StalenessIndicator::SourceTimestamp(current)),
            ) => incoming >= current,
            (
                StalenessIndicator::Revision(incoming),
                Some(StalenessIndicator::Revision(current)),
            ) => incoming >= current,
            // 接入方切换了新旧判定策略，无法比较
            _ => true,
        }
    }
}

impl fmt::Display for StalenessIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StalenessIndicator::SourceTimestamp(ts) => write!(f, "ts:{}", ts.to_rfc3339()),
            StalenessIndicator::Revision(rev) => write!(f, "rev:{}", rev),
        }
    }
}

// ==========================================
// 落库结果 (Upsert Outcome)
// ==========================================
// 实体状态机: 新建 / 已更新 / 过期忽略
// 过期忽略不是错误 —— 静默 no-op，不落库、不告警
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpsertOutcome {
    Created,
    Updated,
    StaleIgnored,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpsertOutcome::Created => write!(f, "CREATED"),
            UpsertOutcome::Updated => write!(f, "UPDATED"),
            UpsertOutcome::StaleIgnored => write!(f, "STALE_IGNORED"),
        }
    }
}

// ==========================================
// HasStaleness - 可做新旧判定的外部实体
// ==========================================
// 实现者: TradeOrder, Shipment
pub trait HasStaleness {
    /// 读取当前存储的新旧判定指示器（新建实体为 None）
    fn staleness(&self) -> Option<StalenessIndicator>;

    /// 以新到报文的指示器覆盖存储值
    fn apply_staleness(&mut self, incoming: &StalenessIndicator);
}
