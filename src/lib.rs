// ==========================================
// 贸易合规物流平台 - EDI 解析与 315 分发核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite) + tokio
// 系统定位: 入站 EDI（850/856 形态）落库 + 出站 315 里程碑分发
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 解析层 - 分段/查找/循环提取
pub mod parser;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 报文处理框架与 315 分发
pub mod engine;

// 出站层 - 文档拆分与生成器
pub mod output;

// 配置层 - 里程碑配置与字段注册表
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{HasStaleness, StalenessIndicator, UpsertOutcome};

// 领域实体
pub use domain::{
    EdiTransaction, Entry, MilestoneUpdate, OrderLine, Segment, SegmentLoop, Shipment,
    ShipmentContainer, ShipmentLine, SyncContext, SyncRecord, TradeOrder,
};

// 解析层
pub use parser::{ErrorCollector, ParseError, ParseResult, SegmentTokenizer};

// 引擎
pub use engine::{
    DispatchSummary, Edi850Config, Edi850Framework, Edi850Hooks, Edi856Config, Edi856Framework,
    Edi856Hooks, MilestoneDispatchEngine, NamedLockRegistry, StalenessStrategy, UpsertEngine,
};

// 出站
pub use output::{
    MilestoneDocument, OutboundGenerator, TradeLensClient, TransportSink, XmlMilestoneGenerator,
};

// 配置
pub use config::{FieldRegistry, FieldValue, MilestoneConfig, MilestoneFieldConfig, OutputStyle};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "贸易 EDI 核心";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
