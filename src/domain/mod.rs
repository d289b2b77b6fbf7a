// ==========================================
// 贸易 EDI 核心 - 领域层
// ==========================================
// 职责: 实体与类型定义，不含业务流程
// ==========================================

// 模块声明
pub mod entry;
pub mod milestone;
pub mod order;
pub mod segment;
pub mod shipment;
pub mod types;

// 重导出核心类型
pub use entry::Entry;
pub use milestone::{MilestoneUpdate, SyncContext, SyncRecord, RESEND_WINDOW_MINUTES};
pub use order::{OrderLine, TradeOrder};
pub use segment::{EdiTransaction, Segment, SegmentLoop};
pub use shipment::{Shipment, ShipmentContainer, ShipmentLine};
pub use types::{HasStaleness, StalenessIndicator, UpsertOutcome};
