// ==========================================
// 贸易 EDI 核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: 所有条件写入走单事务 CAS 纪律（事务内重读前置条件）
// ==========================================

// 模块声明
pub mod api_session_repo;
pub mod error;
pub mod order_repo;
pub mod shipment_repo;
pub mod sync_record_repo;

// 重导出核心类型
pub use api_session_repo::{ApiSessionRepository, ApiSessionStore};
pub use error::{RepositoryError, RepositoryResult};
pub use order_repo::OrderRepository;
pub use shipment_repo::ShipmentRepository;
pub use sync_record_repo::{SyncRecordRepository, SyncRecordStore};

use crate::domain::types::{HasStaleness, StalenessIndicator};
use chrono::{DateTime, NaiveDate, Utc};

// ==========================================
// ExternalEntityStore - 外部实体仓储接口
// ==========================================
// 用途: 落库引擎对订单/运单的统一访问面
// 实现者: OrderRepository, ShipmentRepository
pub trait ExternalEntityStore: Send + Sync {
    type Entity: HasStaleness + Send;

    /// 实体名（命名锁键前缀: "Order-<单号>" / "Shipment-<单号>"）
    fn entity_name(&self) -> &'static str;

    /// 按 (importer_id, 外部单号) 查找，不存在则创建
    fn find_or_create(
        &self,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<(Self::Entity, bool)>;

    /// 按键加载完整实体图
    fn load(&self, importer_id: &str, reference: &str)
        -> RepositoryResult<Option<Self::Entity>>;

    /// 条件保存: 事务内重读新旧指示器，incoming 过期则整体回滚并返回 false
    fn save_if_newer(
        &self,
        entity: &Self::Entity,
        incoming: &StalenessIndicator,
    ) -> RepositoryResult<bool>;
}

// ==========================================
// 时间列编解码（统一 RFC3339 / ISO DATE 文本列）
// ==========================================

pub(crate) fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_ts(
    table: &str,
    column: &str,
    raw: &str,
) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::CorruptColumn {
            table: table.to_string(),
            column: column.to_string(),
            message: format!("{raw:?}: {e}"),
        })
}

pub(crate) fn parse_date(table: &str, column: &str, raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| RepositoryError::CorruptColumn {
        table: table.to_string(),
        column: column.to_string(),
        message: format!("{raw:?}: {e}"),
    })
}
