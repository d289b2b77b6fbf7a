// ==========================================
// 贸易 EDI 核心 - 配置层
// ==========================================
// 职责: 里程碑通知配置 + 字段导出注册表
// 红线: 配置是数据不是命令行输入；注册表显式构造、显式传递
// ==========================================

// 模块声明
pub mod field_registry;
pub mod milestone;

// 重导出核心类型
pub use field_registry::{FieldRegistry, FieldValue};
pub use milestone::{
    CriterionOperator, MilestoneConfig, MilestoneFieldConfig, OutputStyle, SearchCriterion,
};
