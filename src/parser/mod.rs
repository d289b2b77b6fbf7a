// ==========================================
// 贸易 EDI 核心 - 解析层
// ==========================================
// 职责: 原始报文 -> 段 -> 循环树 -> 限定符取值
// 红线: 本层全部为纯函数/无状态结构，不触达仓储
// ==========================================

// 模块声明
pub mod error;
pub mod lookup;
pub mod loop_extractor;
pub mod tokenizer;

// 重导出核心类型
pub use error::{ErrorCollector, ParseError, ParseResult};
pub use loop_extractor::extract_loops;
pub use tokenizer::{envelope_timestamp, SegmentTokenizer};
