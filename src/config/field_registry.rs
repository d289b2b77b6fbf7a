// ==========================================
// 贸易 EDI 核心 - 字段导出注册表
// ==========================================
// 职责: 字段标识 -> 导出闭包的显式注册表
// 生命周期: 每进程构建一次，引用传入所有需要字段元数据的组件
// 红线: 不做进程级隐藏缓存 —— 注册表是显式构造、显式传递的对象，
//       测试可各自构建互不影响
// ==========================================

use crate::domain::entry::Entry;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ==========================================
// FieldValue - 导出值
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(v) => write!(f, "{v}"),
            FieldValue::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            FieldValue::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

type ExporterFn = Arc<dyn Fn(&Entry) -> Option<FieldValue> + Send + Sync>;

// ==========================================
// FieldRegistry - 字段导出注册表
// ==========================================
pub struct FieldRegistry {
    exporters: HashMap<String, ExporterFn>,
}

impl FieldRegistry {
    /// 空注册表（仅使用显式注册的导出器）
    pub fn new() -> Self {
        Self {
            exporters: HashMap::new(),
        }
    }

    /// 标准注册表: 未显式注册的字段回退到 Entry 的日期/属性映射
    pub fn standard() -> Self {
        Self::new()
    }

    /// 注册字段导出器（覆盖同名注册）
    pub fn register(
        &mut self,
        field_id: impl Into<String>,
        exporter: impl Fn(&Entry) -> Option<FieldValue> + Send + Sync + 'static,
    ) {
        self.exporters.insert(field_id.into(), Arc::new(exporter));
    }

    /// 导出字段当前值
    ///
    /// # 查找顺序
    /// 1. 显式注册的导出器
    /// 2. Entry 的里程碑日期映射
    /// 3. Entry 的属性映射
    pub fn export(&self, entry: &Entry, field_id: &str) -> Option<FieldValue> {
        if let Some(exporter) = self.exporters.get(field_id) {
            return exporter(entry);
        }
        if let Some(ts) = entry.dates.get(field_id) {
            return Some(FieldValue::DateTime(*ts));
        }
        entry
            .attributes
            .get(field_id)
            .map(|v| FieldValue::Text(v.clone()))
    }

    /// 导出为时刻（仅日期的导出值视为当日零点 UTC）
    pub fn export_datetime(&self, entry: &Entry, field_id: &str) -> Option<DateTime<Utc>> {
        match self.export(entry, field_id)? {
            FieldValue::DateTime(ts) => Some(ts),
            FieldValue::Date(d) => d.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc()),
            FieldValue::Text(_) => None,
        }
    }

    /// 导出为文本（检索条件、指纹参与字段用）
    pub fn export_string(&self, entry: &Entry, field_id: &str) -> Option<String> {
        self.export(entry, field_id).map(|v| v.to_string())
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
