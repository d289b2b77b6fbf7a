// ==========================================
// 贸易 EDI 核心 - 解析层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类:
// - 结构错误: 当前事务致命，不落库，不自动重试（上游重投是恢复路径）
// - 业务规则错误: 整个事务累积后一次性合并抛出（整单原子性）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 解析层错误类型
#[derive(Error, Debug)]
pub enum ParseError {
    // ===== 结构错误 =====
    #[error("信封日期解析失败: date={date:?} time={time:?}")]
    InvalidEnvelopeDate { date: String, time: String },

    #[error("日期解析失败 (segment={segment}, field={field}): 值 {value:?}")]
    InvalidDate {
        segment: String,
        field: usize,
        value: String,
    },

    #[error("紧凑日期解析失败: 值 {value:?}")]
    InvalidCompactDate { value: String },

    #[error("缺少必需段: {0}")]
    MissingSegment(String),

    #[error("缺少必需字段 (segment={segment}, field={field})")]
    MissingField { segment: String, field: usize },

    #[error("修订号格式错误 (segment={segment}, field={field}): 值 {value:?}")]
    InvalidRevision {
        segment: String,
        field: usize,
        value: String,
    },

    // ===== 业务规则错误（合并后的完整报告） =====
    #[error("业务规则错误:\n{0}")]
    BusinessRules(String),

    // ===== 下层透传 =====
    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),
}

pub type ParseResult<T> = Result<T, ParseError>;

// ==========================================
// ErrorCollector - 业务规则错误收集器
// ==========================================
// 用途: 构建整个实体图的过程中累积业务错误（找不到订单/订单行等），
//       全部构建完成后一次性合并抛出，调用方得到完整错误报告
pub struct ErrorCollector {
    errors: Vec<String>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// 为空则 Ok，否则合并为一条 BusinessRules 错误
    pub fn into_result(self) -> ParseResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ParseError::BusinessRules(self.errors.join("\n")))
        }
    }
}

impl Default for ErrorCollector {
    fn default() -> Self {
        Self::new()
    }
}
