// ==========================================
// 贸易 EDI 核心 - 出站文档拆分
// ==========================================
// 职责: 按配置的输出方式把一个领域对象的事件批拆成 N 份出站文档
// ==========================================

use crate::config::milestone::OutputStyle;
use crate::domain::entry::Entry;
use crate::domain::milestone::MilestoneUpdate;

// ==========================================
// MilestoneDocument - 出站文档（单份）
// ==========================================
#[derive(Debug, Clone)]
pub struct MilestoneDocument {
    pub entity_key: String,               // broker_reference
    pub importer_id: String,
    pub master_bill: Option<String>,      // 拆分维度: 主提单
    pub container_number: Option<String>, // 拆分维度: 集装箱
    pub transport_mode: Option<String>,   // 运输方式描述（出站时查码表）
    pub ports: Vec<(String, String)>,     // (港口角色, 地名)，出站时查限定符码表
    pub updates: Vec<MilestoneUpdate>,
}

/// 运输方式属性的字段标识
pub const TRANSPORT_MODE_FIELD: &str = "ent_transport_mode";

/// 港口角色属性的字段标识前缀（port_of_lading / port_of_unlading / ...）
pub const PORT_FIELD_PREFIX: &str = "port_of_";

/// 按输出方式拆分文档
///
/// # 规则
/// - Standard: 单文档，不带拆分维度
/// - OnePerMasterBill / OnePerContainer: 每维度值一份
/// - MasterBillContainerCross: 主提单 × 集装箱 笛卡尔积
/// - 拆分维度列表为空: 回退为单文档并告警（事件不丢失、同步记录可确认）
pub fn split_documents(
    style: OutputStyle,
    entry: &Entry,
    updates: &[MilestoneUpdate],
) -> Vec<MilestoneDocument> {
    let base = |master_bill: Option<String>, container_number: Option<String>| MilestoneDocument {
        entity_key: entry.broker_reference.clone(),
        importer_id: entry.importer_id.clone(),
        master_bill,
        container_number,
        transport_mode: entry.attributes.get(TRANSPORT_MODE_FIELD).cloned(),
        ports: entry
            .attributes
            .iter()
            .filter(|(key, _)| key.starts_with(PORT_FIELD_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        updates: updates.to_vec(),
    };

    match style {
        OutputStyle::Standard => vec![base(None, None)],
        OutputStyle::OnePerMasterBill => {
            if entry.master_bills.is_empty() {
                tracing::warn!(
                    entity = %entry.broker_reference,
                    "输出方式为每主提单一份，但主提单列表为空，回退为单文档"
                );
                return vec![base(None, None)];
            }
            entry
                .master_bills
                .iter()
                .map(|mbl| base(Some(mbl.clone()), None))
                .collect()
        }
        OutputStyle::OnePerContainer => {
            if entry.container_numbers.is_empty() {
                tracing::warn!(
                    entity = %entry.broker_reference,
                    "输出方式为每集装箱一份，但集装箱列表为空，回退为单文档"
                );
                return vec![base(None, None)];
            }
            entry
                .container_numbers
                .iter()
                .map(|container| base(None, Some(container.clone())))
                .collect()
        }
        OutputStyle::MasterBillContainerCross => {
            if entry.master_bills.is_empty() || entry.container_numbers.is_empty() {
                tracing::warn!(
                    entity = %entry.broker_reference,
                    "输出方式为主提单×集装箱，但维度列表为空，回退为单文档"
                );
                return vec![base(None, None)];
            }
            let mut docs = Vec::new();
            for mbl in &entry.master_bills {
                for container in &entry.container_numbers {
                    docs.push(base(Some(mbl.clone()), Some(container.clone())));
                }
            }
            docs
        }
    }
}
