// ==========================================
// 贸易 EDI 核心 - 850 订单报文处理框架
// ==========================================
// 职责: 原始 850 报文 -> 分段 -> 新旧判定 -> 循环树 -> 钩子填充 -> 条件落库
// 结构: 框架管流程与原子性，接入方差异（字段位置、限定符）全部走钩子
// 红线: 行项目整体重建 —— 回调前清空，杜绝旧行残留
// ==========================================

use crate::domain::order::{OrderLine, TradeOrder};
use crate::domain::segment::SegmentLoop;
use crate::domain::types::{StalenessIndicator, UpsertOutcome};
use crate::engine::upsert::UpsertEngine;
use crate::parser::error::{ErrorCollector, ParseError, ParseResult};
use crate::parser::loop_extractor::extract_loops;
use crate::parser::lookup;
use crate::parser::tokenizer::SegmentTokenizer;
use crate::repository::ExternalEntityStore;

// ==========================================
// StalenessStrategy - 新旧判定策略
// ==========================================
#[derive(Debug, Clone)]
pub enum StalenessStrategy {
    /// 信封时间戳（ISA 等价头段的日期/时间对）
    EnvelopeTimestamp,
    /// 发送方递增修订号（指定段与字段下标）
    Revision { segment: String, field: usize },
}

// ==========================================
// Edi850Config - 接入方配置
// ==========================================
#[derive(Debug, Clone)]
pub struct Edi850Config {
    pub importer_id: String,
    pub tokenizer: SegmentTokenizer,
    pub envelope_segment: String,
    pub envelope_date_index: usize,
    pub envelope_time_index: usize,
    pub line_loop_starts: Vec<String>,    // 行循环起始段（常见 ["PO1"]）
    pub stop_types: Vec<String>,          // 终止段（常见 ["CTT"]）
    pub staleness: StalenessStrategy,
}

impl Edi850Config {
    pub fn new(importer_id: impl Into<String>) -> Self {
        Self {
            importer_id: importer_id.into(),
            tokenizer: SegmentTokenizer::default(),
            envelope_segment: "ISA".to_string(),
            envelope_date_index: 9,
            envelope_time_index: 10,
            line_loop_starts: vec!["PO1".to_string()],
            stop_types: vec!["CTT".to_string()],
            staleness: StalenessStrategy::EnvelopeTimestamp,
        }
    }
}

/// 实体填充钩子: 对循环树的一部分填充实体，业务错误写入收集器
pub type HookFn<E> =
    Box<dyn Fn(&mut E, &SegmentLoop, &mut ErrorCollector) -> ParseResult<()> + Send + Sync>;

// ==========================================
// Edi850Hooks - 接入方钩子集
// ==========================================
pub struct Edi850Hooks {
    /// 从根循环取订单号（缺失是结构错误）
    pub order_number: Box<dyn Fn(&SegmentLoop) -> ParseResult<String> + Send + Sync>,
    /// 头字段填充（根循环）
    pub header: HookFn<TradeOrder>,
    /// 参与方段填充（N1 类；可选）
    pub header_party: Option<HookFn<TradeOrder>>,
    /// 行项目填充（每个行循环调用一次）
    pub line: HookFn<TradeOrder>,
    /// 行项目之后的收尾填充（可选）
    pub after_lines: Option<HookFn<TradeOrder>>,
}

impl Edi850Hooks {
    /// 常见 850 形态的缺省钩子
    ///
    /// # 字段位置
    /// - 订单号 BEG03；取消标记 BEG01 == "01"；下单日期 BEG05
    /// - 客户订单号 REF*CO
    /// - 行: 行号 PO101、数量 PO102、单位 PO103、单价 PO104、
    ///   商品/SKU 为 PO1 下标 6 起的 (限定符, 值) 配对（VN / SK）
    pub fn standard() -> Self {
        Self {
            order_number: Box::new(|root| {
                let beg = root
                    .first_segment("BEG")
                    .ok_or_else(|| ParseError::MissingSegment("BEG".to_string()))?;
                beg.non_blank_value(3)
                    .map(|v| v.to_string())
                    .ok_or(ParseError::MissingField {
                        segment: "BEG".to_string(),
                        field: 3,
                    })
            }),
            header: Box::new(|order, root, _errors| {
                if let Some(beg) = root.first_segment("BEG") {
                    order.cancelled = beg.value(1) == Some("01");
                    order.order_date = lookup::segment_date_value(beg, 5)?;
                }
                order.customer_order_number =
                    lookup::find_ref_value(&root.segments, "CO").map(|v| v.to_string());
                Ok(())
            }),
            header_party: None,
            line: Box::new(|order, line_loop, errors| {
                let Some(po1) = line_loop.first_segment("PO1") else {
                    return Ok(());
                };

                let Some(line_number) = po1.non_blank_value(1).and_then(|v| v.parse::<i32>().ok())
                else {
                    errors.push(format!(
                        "PO1 行号缺失或不是整数: {:?}",
                        po1.value(1).unwrap_or("")
                    ));
                    return Ok(());
                };

                let product_uid = lookup::find_segment_qualified_value(po1, "VN", 6);
                if product_uid.is_none() {
                    errors.push(format!("行 {line_number}: 商品标识 (VN) 缺失"));
                }

                order.lines.push(OrderLine {
                    line_number,
                    product_uid: product_uid.map(|v| v.to_string()),
                    sku: lookup::find_segment_qualified_value(po1, "SK", 6).map(|v| v.to_string()),
                    quantity: po1.non_blank_value(2).and_then(|v| v.parse().ok()),
                    unit_of_measure: po1.non_blank_value(3).map(|v| v.to_string()),
                    unit_price: po1.non_blank_value(4).and_then(|v| v.parse().ok()),
                });
                Ok(())
            }),
            after_lines: None,
        }
    }
}

// ==========================================
// Edi850Framework - 850 处理框架
// ==========================================
pub struct Edi850Framework<R: ExternalEntityStore<Entity = TradeOrder>> {
    config: Edi850Config,
    hooks: Edi850Hooks,
    engine: UpsertEngine<R>,
}

impl<R: ExternalEntityStore<Entity = TradeOrder>> Edi850Framework<R> {
    pub fn new(config: Edi850Config, hooks: Edi850Hooks, engine: UpsertEngine<R>) -> Self {
        Self {
            config,
            hooks,
            engine,
        }
    }

    /// 处理一个 850 事务
    ///
    /// # 返回
    /// - (Created / Updated, Some(order)): 已接受并落库
    /// - (StaleIgnored, None): 报文过期，静默忽略
    ///
    /// # 错误
    /// - 结构错误（信封/订单号/修订号）: 不落库，整个事务拒绝
    /// - 业务规则错误: 合并为一条抛出，订单保持处理前状态
    pub async fn process_transaction(
        &self,
        raw: &str,
    ) -> ParseResult<(UpsertOutcome, Option<TradeOrder>)> {
        // === 步骤 1: 分段 + 信封时间戳 ===
        let transaction = self.config.tokenizer.parse_transaction(
            raw,
            &self.config.envelope_segment,
            self.config.envelope_date_index,
            self.config.envelope_time_index,
        )?;

        // === 步骤 2: 新旧判定指示器 ===
        let incoming = self.staleness_indicator(&transaction)?;

        // === 步骤 3: 循环树提取 ===
        let loop_starts: Vec<&str> =
            self.config.line_loop_starts.iter().map(|s| s.as_str()).collect();
        let stop_types: Vec<&str> = self.config.stop_types.iter().map(|s| s.as_str()).collect();
        let root = extract_loops(&transaction.segments, &loop_starts, &stop_types);

        // === 步骤 4: 订单号（结构必需） ===
        let order_number = (self.hooks.order_number)(&root)?;
        tracing::debug!(order_number = %order_number, incoming = %incoming, "850 事务解析完成");

        // === 步骤 5: 条件落库 ===
        self.engine
            .find_or_create_and_update(
                &self.config.importer_id,
                &order_number,
                &incoming,
                |order, errors| {
                    // 行项目整体重建
                    order.lines.clear();

                    (self.hooks.header)(order, &root, errors)?;
                    if let Some(hook) = &self.hooks.header_party {
                        hook(order, &root, errors)?;
                    }
                    for line_loop in &root.children {
                        (self.hooks.line)(order, line_loop, errors)?;
                    }
                    if let Some(hook) = &self.hooks.after_lines {
                        hook(order, &root, errors)?;
                    }
                    Ok(())
                },
            )
            .await
    }

    fn staleness_indicator(
        &self,
        transaction: &crate::domain::segment::EdiTransaction,
    ) -> ParseResult<StalenessIndicator> {
        match &self.config.staleness {
            StalenessStrategy::EnvelopeTimestamp => {
                Ok(StalenessIndicator::SourceTimestamp(transaction.envelope_date))
            }
            StalenessStrategy::Revision { segment, field } => {
                let seg = lookup::find_segment(&transaction.segments, segment)
                    .ok_or_else(|| ParseError::MissingSegment(segment.clone()))?;
                let raw = seg.non_blank_value(*field).ok_or(ParseError::MissingField {
                    segment: segment.clone(),
                    field: *field,
                })?;
                let revision = raw.parse::<i64>().map_err(|_| ParseError::InvalidRevision {
                    segment: segment.clone(),
                    field: *field,
                    value: raw.to_string(),
                })?;
                Ok(StalenessIndicator::Revision(revision))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::segment::Segment;
    use chrono::NaiveDate;

    fn root_from(lines: &[&str]) -> SegmentLoop {
        let segments: Vec<Segment> = lines.iter().map(|l| Segment::from_line(l, '*')).collect();
        extract_loops(&segments, &["PO1"], &["CTT"])
    }

    #[test]
    fn test_standard_order_number_from_beg() {
        let hooks = Edi850Hooks::standard();
        let root = root_from(&["BEG*00*SA*PO-1001**200315"]);
        assert_eq!((hooks.order_number)(&root).unwrap(), "PO-1001");

        let err = (hooks.order_number)(&root_from(&["REF*CO*X"])).unwrap_err();
        assert!(matches!(err, ParseError::MissingSegment(_)));
    }

    #[test]
    fn test_standard_header_hook() {
        let hooks = Edi850Hooks::standard();
        let root = root_from(&["BEG*01*SA*PO-1001**200315", "REF*CO*CUST-7"]);
        let mut order = TradeOrder::new("IMP", "PO-1001");
        let mut errors = ErrorCollector::new();

        (hooks.header)(&mut order, &root, &mut errors).unwrap();
        assert!(order.cancelled);
        assert_eq!(order.order_date, NaiveDate::from_ymd_opt(2020, 3, 15));
        assert_eq!(order.customer_order_number.as_deref(), Some("CUST-7"));
        assert!(errors.is_empty());
    }

    #[test]
    fn test_standard_line_hook_reads_qualified_pairs() {
        let hooks = Edi850Hooks::standard();
        let root = root_from(&["BEG*00*SA*PO-1", "PO1*1*24*EA*3.50**VN*PROD-9*SK*SKU-3"]);
        let mut order = TradeOrder::new("IMP", "PO-1");
        let mut errors = ErrorCollector::new();

        (hooks.line)(&mut order, &root.children[0], &mut errors).unwrap();
        assert!(errors.is_empty());
        let line = &order.lines[0];
        assert_eq!(line.line_number, 1);
        assert_eq!(line.quantity, Some(24.0));
        assert_eq!(line.unit_of_measure.as_deref(), Some("EA"));
        assert_eq!(line.unit_price, Some(3.5));
        assert_eq!(line.product_uid.as_deref(), Some("PROD-9"));
        assert_eq!(line.sku.as_deref(), Some("SKU-3"));
    }

    #[test]
    fn test_standard_line_hook_accumulates_business_errors() {
        let hooks = Edi850Hooks::standard();
        let root = root_from(&["BEG*00*SA*PO-1", "PO1*2*10*EA*1.00"]);
        let mut order = TradeOrder::new("IMP", "PO-1");
        let mut errors = ErrorCollector::new();

        (hooks.line)(&mut order, &root.children[0], &mut errors).unwrap();
        assert_eq!(errors.len(), 1);
        let err = errors.into_result().unwrap_err();
        assert!(err.to_string().contains("VN"));
    }
}
