// ==========================================
// 贸易 EDI 核心 - 报关单领域模型
// ==========================================
// 职责: 315 里程碑分发的源领域对象
// 说明: 里程碑字段与辅助指纹字段是配置驱动的动态字段，
//       以映射表存放，统一经 FieldRegistry 导出
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Entry - 报关单快照
// ==========================================
// 315 引擎只读消费；变更触发分发由外围框架负责
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub broker_reference: String,         // 报关行内部编号（315 锁键）
    pub importer_id: String,              // 进口商标识

    pub master_bills: Vec<String>,        // 主提单号列表（拆分输出用）
    pub container_numbers: Vec<String>,   // 集装箱号列表（拆分输出用）

    // 里程碑日期字段: 字段标识 -> UTC 时间（如 ent_one_usg_date）
    pub dates: BTreeMap<String, DateTime<Utc>>,

    // 辅助字段: 字段标识 -> 文本值（指纹参与字段、检索条件字段）
    pub attributes: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(importer_id: impl Into<String>, broker_reference: impl Into<String>) -> Self {
        Self {
            broker_reference: broker_reference.into(),
            importer_id: importer_id.into(),
            master_bills: Vec::new(),
            container_numbers: Vec::new(),
            dates: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_date(mut self, field_id: impl Into<String>, value: DateTime<Utc>) -> Self {
        self.dates.insert(field_id.into(), value);
        self
    }

    pub fn with_attribute(
        mut self,
        field_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.insert(field_id.into(), value.into());
        self
    }
}
