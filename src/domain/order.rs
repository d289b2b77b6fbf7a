// ==========================================
// 贸易 EDI 核心 - 订单领域模型
// ==========================================
// 职责: 850 类报文的目标可变实体
// 键: (importer_id, order_number) 唯一
// 红线: 核心不删除订单 —— 取消是状态标记，不是删除
// ==========================================

use crate::domain::types::{HasStaleness, StalenessIndicator};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TradeOrder - 订单主数据
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    // ===== 键 =====
    pub importer_id: String,              // 进口商标识
    pub order_number: String,             // 外部订单号（850 BEG03）

    // ===== 新旧判定（二选一，按接入方策略） =====
    pub revision: Option<i64>,            // 发送方递增修订号
    pub last_exported_from_source: Option<DateTime<Utc>>, // 信封时间戳

    // ===== 头字段 =====
    pub customer_order_number: Option<String>, // 客户订单号（REF*CO）
    pub order_date: Option<NaiveDate>,         // 下单日期（BEG05）
    pub mode: Option<String>,                  // 运输方式
    pub terms_of_sale: Option<String>,         // 贸易条款
    pub cancelled: bool,                       // 取消标记（BEG01 = 01）

    // ===== 行项目 =====
    pub lines: Vec<OrderLine>,

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TradeOrder {
    /// 新建空订单（新旧判定指示器为"从未导出"，任何报文都视为更新）
    pub fn new(importer_id: impl Into<String>, order_number: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            importer_id: importer_id.into(),
            order_number: order_number.into(),
            revision: None,
            last_exported_from_source: None,
            customer_order_number: None,
            order_date: None,
            mode: None,
            terms_of_sale: None,
            cancelled: false,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasStaleness for TradeOrder {
    fn staleness(&self) -> Option<StalenessIndicator> {
        // 修订号策略优先（接入方只会配置一种）
        if let Some(rev) = self.revision {
            return Some(StalenessIndicator::Revision(rev));
        }
        self.last_exported_from_source
            .map(StalenessIndicator::SourceTimestamp)
    }

    fn apply_staleness(&mut self, incoming: &StalenessIndicator) {
        match incoming {
            StalenessIndicator::Revision(rev) => self.revision = Some(*rev),
            StalenessIndicator::SourceTimestamp(ts) => {
                self.last_exported_from_source = Some(*ts)
            }
        }
    }
}

// ==========================================
// OrderLine - 订单行项目
// ==========================================
// 每次接受的报文整体重建（先清空再写入，保证整单原子性）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_number: i32,                 // 行号（PO101）
    pub product_uid: Option<String>,      // 商品唯一标识（VN 限定符）
    pub sku: Option<String>,              // SKU（SK 限定符）
    pub quantity: Option<f64>,            // 数量（PO102）
    pub unit_of_measure: Option<String>,  // 数量单位（PO103）
    pub unit_price: Option<f64>,          // 单价（PO104）
}
