// ==========================================
// 贸易 EDI 核心 - 运单领域模型
// ==========================================
// 职责: 856 类报文的目标可变实体（设备/订单/行项目三级结构）
// 键: (importer_id, reference) 唯一
// ==========================================

use crate::domain::types::{HasStaleness, StalenessIndicator};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Shipment - 运单主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    // ===== 键 =====
    pub importer_id: String,              // 进口商标识
    pub reference: String,                // 外部运单号（856 BSN02）

    // ===== 新旧判定 =====
    pub last_exported_from_source: Option<DateTime<Utc>>, // 信封时间戳

    // ===== 头字段 =====
    pub master_bill: Option<String>,      // 主提单号
    pub house_bill: Option<String>,       // 分提单号
    pub vessel: Option<String>,           // 船名
    pub voyage: Option<String>,           // 航次
    pub mode: Option<String>,             // 运输方式
    pub est_arrival_date: Option<NaiveDate>, // 预计到港日

    // ===== 设备（集装箱）层级 =====
    pub containers: Vec<ShipmentContainer>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub fn new(importer_id: impl Into<String>, reference: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            importer_id: importer_id.into(),
            reference: reference.into(),
            last_exported_from_source: None,
            master_bill: None,
            house_bill: None,
            vessel: None,
            voyage: None,
            mode: None,
            est_arrival_date: None,
            containers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasStaleness for Shipment {
    fn staleness(&self) -> Option<StalenessIndicator> {
        self.last_exported_from_source
            .map(StalenessIndicator::SourceTimestamp)
    }

    fn apply_staleness(&mut self, incoming: &StalenessIndicator) {
        if let StalenessIndicator::SourceTimestamp(ts) = incoming {
            self.last_exported_from_source = Some(*ts);
        }
    }
}

// ==========================================
// ShipmentContainer - 设备（集装箱）层
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentContainer {
    pub container_number: String,         // 集装箱号
    pub seal_number: Option<String>,      // 铅封号
    pub lines: Vec<ShipmentLine>,
}

// ==========================================
// ShipmentLine - 运单行项目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentLine {
    pub line_number: i32,
    pub order_number: Option<String>,     // 关联订单号（PRF01）
    pub product_uid: Option<String>,      // 商品唯一标识（VN 限定符）
    pub quantity: Option<f64>,            // 装运数量（SN102）
}
