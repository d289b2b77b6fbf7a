// ==========================================
// 贸易 EDI 核心 - 里程碑通知配置
// ==========================================
// 职责: 315 分发的配置数据（纯数据，不含控制流）
// 生命周期: 每进程构建一次，引用传入各组件 —— 无隐藏全局状态
// ==========================================

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

// ==========================================
// MilestoneFieldConfig - 单个里程碑字段
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneFieldConfig {
    pub field_id: String,                 // 字段标识（如 ent_one_usg_date）
    pub timezone: Option<Tz>,             // 时区覆盖（缺省用配置的默认时区）
    pub no_time: bool,                    // "仅日期"字段: 时刻截断到当日零点
}

impl MilestoneFieldConfig {
    pub fn new(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            timezone: None,
            no_time: false,
        }
    }

    pub fn with_timezone(mut self, tz: Tz) -> Self {
        self.timezone = Some(tz);
        self
    }

    pub fn date_only(mut self) -> Self {
        self.no_time = true;
        self
    }
}

// ==========================================
// OutputStyle - 输出拆分方式
// ==========================================
// 一个领域对象拆成 N 份出站文档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputStyle {
    Standard,                 // 单文档
    OnePerMasterBill,         // 每主提单一份
    OnePerContainer,          // 每集装箱一份
    MasterBillContainerCross, // 主提单 × 集装箱 笛卡尔积
}

// ==========================================
// SearchCriterion - 检索条件
// ==========================================
// 测试模式下将分发范围收窄到少量记录；字段经 FieldRegistry 导出后比较
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriterion {
    pub field_id: String,
    pub operator: CriterionOperator,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CriterionOperator {
    Eq,
    NotEq,
    Contains,
}

impl SearchCriterion {
    /// 对导出的文本值求值（字段缺失视为不匹配）
    pub fn matches(&self, exported: Option<&str>) -> bool {
        match (self.operator, exported) {
            (CriterionOperator::Eq, Some(v)) => v == self.value,
            (CriterionOperator::NotEq, Some(v)) => v != self.value,
            (CriterionOperator::NotEq, None) => true,
            (CriterionOperator::Contains, Some(v)) => v.contains(&self.value),
            _ => false,
        }
    }
}

// ==========================================
// MilestoneConfig - 315 分发配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    pub milestone_fields: Vec<MilestoneFieldConfig>, // 目标里程碑字段
    pub fingerprint_fields: Vec<String>,             // 辅助指纹字段（排序去重后参与指纹）
    pub output_style: OutputStyle,
    pub default_timezone: Tz,
    pub testing: bool,                               // 测试模式: 绕过指纹，总是发送
    pub gtn_time_modifier: bool,                     // 时间冲突规避开关
    #[serde(default)]
    pub search_criteria: Vec<SearchCriterion>,
}

impl MilestoneConfig {
    pub fn new(default_timezone: Tz) -> Self {
        Self {
            milestone_fields: Vec::new(),
            fingerprint_fields: Vec::new(),
            output_style: OutputStyle::Standard,
            default_timezone,
            testing: false,
            gtn_time_modifier: false,
            search_criteria: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: MilestoneFieldConfig) -> Self {
        self.milestone_fields.push(field);
        self
    }

    pub fn with_fingerprint_field(mut self, field_id: impl Into<String>) -> Self {
        self.fingerprint_fields.push(field_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_matching() {
        let eq = SearchCriterion {
            field_id: "ent_customer".to_string(),
            operator: CriterionOperator::Eq,
            value: "ACME".to_string(),
        };
        assert!(eq.matches(Some("ACME")));
        assert!(!eq.matches(Some("OTHER")));
        assert!(!eq.matches(None));

        let ne = SearchCriterion {
            operator: CriterionOperator::NotEq,
            ..eq.clone()
        };
        assert!(ne.matches(Some("OTHER")));
        assert!(ne.matches(None));

        let contains = SearchCriterion {
            operator: CriterionOperator::Contains,
            ..eq
        };
        assert!(contains.matches(Some("ACME-EAST")));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = MilestoneConfig::new(chrono_tz::America::New_York)
            .with_field(MilestoneFieldConfig::new("ent_one_usg_date"))
            .with_field(
                MilestoneFieldConfig::new("ent_release_date")
                    .with_timezone(chrono_tz::Asia::Shanghai)
                    .date_only(),
            )
            .with_fingerprint_field("ent_entry_number");

        let json = serde_json::to_string(&config).unwrap();
        let back: MilestoneConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.milestone_fields.len(), 2);
        assert_eq!(back.milestone_fields[1].timezone, Some(chrono_tz::Asia::Shanghai));
        assert!(back.milestone_fields[1].no_time);
    }
}
