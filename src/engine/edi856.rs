// ==========================================
// 贸易 EDI 核心 - 856 运单报文处理框架
// ==========================================
// 职责: 原始 856 报文 -> 分段 -> 循环树（设备/订单/行项目多层） -> 钩子填充 -> 条件落库
// 结构: 与 850 框架同形，差异在循环层级数与钩子拿到的上下文循环
// 红线: 无任何设备循环的运单是业务错误 —— 空运单不落库
// ==========================================

use crate::domain::segment::SegmentLoop;
use crate::domain::shipment::{Shipment, ShipmentContainer};
use crate::domain::types::{StalenessIndicator, UpsertOutcome};
use crate::engine::edi850::HookFn;
use crate::engine::upsert::UpsertEngine;
use crate::parser::error::{ErrorCollector, ParseError, ParseResult};
use crate::parser::loop_extractor::extract_loops;
use crate::parser::lookup;
use crate::parser::tokenizer::SegmentTokenizer;
use crate::repository::ExternalEntityStore;

// ==========================================
// Edi856Config - 接入方配置
// ==========================================
#[derive(Debug, Clone)]
pub struct Edi856Config {
    pub importer_id: String,
    pub tokenizer: SegmentTokenizer,
    pub envelope_segment: String,
    pub envelope_date_index: usize,
    pub envelope_time_index: usize,
    /// 循环起始段，从最外层到最内层。
    /// 三层形态 ["EQD", "PRF", "LIN"]（设备/订单/行项目），
    /// 两层形态 ["EQD", "LIN"]（行项目直接挂设备）
    pub loop_starts: Vec<String>,
    pub stop_types: Vec<String>,
}

impl Edi856Config {
    pub fn new(importer_id: impl Into<String>) -> Self {
        Self {
            importer_id: importer_id.into(),
            tokenizer: SegmentTokenizer::default(),
            envelope_segment: "ISA".to_string(),
            envelope_date_index: 9,
            envelope_time_index: 10,
            loop_starts: vec!["EQD".to_string(), "PRF".to_string(), "LIN".to_string()],
            stop_types: vec!["CTT".to_string()],
        }
    }

    /// 是否带订单中间层（三层形态）
    fn has_order_level(&self) -> bool {
        self.loop_starts.len() >= 3
    }
}

/// 行项目钩子: (运单, 当前设备下标, 订单循环, 行项目循环)
/// 两层形态下订单循环为 None
pub type ItemHookFn = Box<
    dyn Fn(
            &mut Shipment,
            usize,
            Option<&SegmentLoop>,
            &SegmentLoop,
            &mut ErrorCollector,
        ) -> ParseResult<()>
        + Send
        + Sync,
>;

// ==========================================
// Edi856Hooks - 接入方钩子集
// ==========================================
pub struct Edi856Hooks {
    /// 从根循环取运单号（缺失是结构错误）
    pub reference: Box<dyn Fn(&SegmentLoop) -> ParseResult<String> + Send + Sync>,
    /// 头字段填充（根循环）
    pub header: HookFn<Shipment>,
    /// 设备循环填充: 成功时向 shipment.containers 追加一个设备
    pub container: HookFn<Shipment>,
    /// 行项目填充
    pub item: ItemHookFn,
}

impl Edi856Hooks {
    /// 常见 856 形态的缺省钩子
    ///
    /// # 字段位置
    /// - 运单号 BSN02；主提单 REF*BM；分提单 REF*HB
    /// - 船名/航次 V1 段 2/4；预计到港 DTM*056
    /// - 设备: 集装箱号 EQD02、铅封号 EQD03
    /// - 行项目: 行号 LIN01、商品 LIN 配对 VN（下标 2 起）、
    ///   数量 SN102、关联订单 PRF01
    pub fn standard() -> Self {
        Self {
            reference: Box::new(|root| {
                let bsn = root
                    .first_segment("BSN")
                    .ok_or_else(|| ParseError::MissingSegment("BSN".to_string()))?;
                bsn.non_blank_value(2)
                    .map(|v| v.to_string())
                    .ok_or(ParseError::MissingField {
                        segment: "BSN".to_string(),
                        field: 2,
                    })
            }),
            header: Box::new(|shipment, root, _errors| {
                shipment.master_bill =
                    lookup::find_ref_value(&root.segments, "BM").map(|v| v.to_string());
                shipment.house_bill =
                    lookup::find_ref_value(&root.segments, "HB").map(|v| v.to_string());
                if let Some(v1) = lookup::find_segment(&root.segments, "V1") {
                    shipment.vessel = v1.non_blank_value(2).map(|v| v.to_string());
                    shipment.voyage = v1.non_blank_value(4).map(|v| v.to_string());
                }
                shipment.est_arrival_date =
                    lookup::find_date_value(&root.segments, "DTM", "056")?;
                Ok(())
            }),
            container: Box::new(|shipment, container_loop, errors| {
                let Some(eqd) = container_loop.first_segment("EQD") else {
                    return Ok(());
                };
                let Some(container_number) = eqd.non_blank_value(2) else {
                    errors.push("EQD 集装箱号缺失".to_string());
                    return Ok(());
                };
                shipment.containers.push(ShipmentContainer {
                    container_number: container_number.to_string(),
                    seal_number: eqd.non_blank_value(3).map(|v| v.to_string()),
                    lines: Vec::new(),
                });
                Ok(())
            }),
            item: Box::new(|shipment, container_index, order_loop, item_loop, errors| {
                let Some(lin) = item_loop.first_segment("LIN") else {
                    return Ok(());
                };
                let Some(line_number) = lin.non_blank_value(1).and_then(|v| v.parse::<i32>().ok())
                else {
                    errors.push(format!(
                        "LIN 行号缺失或不是整数: {:?}",
                        lin.value(1).unwrap_or("")
                    ));
                    return Ok(());
                };

                let product_uid = lookup::find_segment_qualified_value(lin, "VN", 2);
                if product_uid.is_none() {
                    errors.push(format!("行 {line_number}: 商品标识 (VN) 缺失"));
                }

                let order_number = order_loop
                    .and_then(|ol| ol.first_segment("PRF"))
                    .and_then(|prf| prf.non_blank_value(1))
                    .map(|v| v.to_string());

                let quantity = item_loop
                    .first_segment("SN1")
                    .and_then(|sn1| sn1.non_blank_value(2))
                    .and_then(|v| v.parse().ok());

                if let Some(container) = shipment.containers.get_mut(container_index) {
                    container.lines.push(crate::domain::shipment::ShipmentLine {
                        line_number,
                        order_number,
                        product_uid: product_uid.map(|v| v.to_string()),
                        quantity,
                    });
                }
                Ok(())
            }),
        }
    }
}

// ==========================================
// Edi856Framework - 856 处理框架
// ==========================================
pub struct Edi856Framework<R: ExternalEntityStore<Entity = Shipment>> {
    config: Edi856Config,
    hooks: Edi856Hooks,
    engine: UpsertEngine<R>,
}

impl<R: ExternalEntityStore<Entity = Shipment>> Edi856Framework<R> {
    pub fn new(config: Edi856Config, hooks: Edi856Hooks, engine: UpsertEngine<R>) -> Self {
        Self {
            config,
            hooks,
            engine,
        }
    }

    /// 处理一个 856 事务
    ///
    /// # 返回与错误
    /// 同 850 框架；额外的业务规则: 无任何设备循环的运单整体拒绝
    pub async fn process_transaction(
        &self,
        raw: &str,
    ) -> ParseResult<(UpsertOutcome, Option<Shipment>)> {
        // === 步骤 1: 分段 + 信封时间戳 ===
        let transaction = self.config.tokenizer.parse_transaction(
            raw,
            &self.config.envelope_segment,
            self.config.envelope_date_index,
            self.config.envelope_time_index,
        )?;
        let incoming = StalenessIndicator::SourceTimestamp(transaction.envelope_date);

        // === 步骤 2: 循环树提取 ===
        let loop_starts: Vec<&str> = self.config.loop_starts.iter().map(|s| s.as_str()).collect();
        let stop_types: Vec<&str> = self.config.stop_types.iter().map(|s| s.as_str()).collect();
        let root = extract_loops(&transaction.segments, &loop_starts, &stop_types);

        // === 步骤 3: 运单号 ===
        let reference = (self.hooks.reference)(&root)?;
        tracing::debug!(reference = %reference, incoming = %incoming, "856 事务解析完成");

        // === 步骤 4: 条件落库 ===
        let has_order_level = self.config.has_order_level();
        self.engine
            .find_or_create_and_update(
                &self.config.importer_id,
                &reference,
                &incoming,
                |shipment, errors| {
                    // 设备层级整体重建
                    shipment.containers.clear();

                    (self.hooks.header)(shipment, &root, errors)?;
                    self.apply_container_loops(shipment, &root, has_order_level, errors)?;

                    if shipment.containers.is_empty() {
                        errors.push(format!("运单 {} 无任何设备循环", shipment.reference));
                    }
                    Ok(())
                },
            )
            .await
    }

    fn apply_container_loops(
        &self,
        shipment: &mut Shipment,
        root: &SegmentLoop,
        has_order_level: bool,
        errors: &mut ErrorCollector,
    ) -> ParseResult<()> {
        for container_loop in &root.children {
            let before = shipment.containers.len();
            (self.hooks.container)(shipment, container_loop, errors)?;
            if shipment.containers.len() == before {
                // 设备钩子未能产出设备（业务错误已入收集器），行项目无处可挂
                continue;
            }
            let container_index = shipment.containers.len() - 1;

            if has_order_level {
                for order_loop in &container_loop.children {
                    for item_loop in &order_loop.children {
                        (self.hooks.item)(
                            shipment,
                            container_index,
                            Some(order_loop),
                            item_loop,
                            errors,
                        )?;
                    }
                }
            } else {
                for item_loop in &container_loop.children {
                    (self.hooks.item)(shipment, container_index, None, item_loop, errors)?;
                }
            }
        }
        Ok(())
    }
}
