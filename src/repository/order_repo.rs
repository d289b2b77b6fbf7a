// ==========================================
// 贸易 EDI 核心 - 订单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: save_if_newer 为单事务"带前置条件的条件更新"（CAS 式）——
//       事务内重读存储的新旧指示器，过期则整体回滚
// ==========================================

use crate::domain::order::{OrderLine, TradeOrder};
use crate::domain::types::{HasStaleness, StalenessIndicator};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_date, format_ts, parse_date, parse_ts, ExternalEntityStore};
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按键查找，不存在则创建空订单
    ///
    /// # 返回
    /// - (TradeOrder, created): created 表示本次调用新建了行
    ///
    /// # 并发
    /// - IMMEDIATE 事务保护同键并发 find-or-create；
    ///   调用方还应持有 "Order-<单号>" 命名锁（短临界区）
    pub fn find_or_create_order(
        &self,
        importer_id: &str,
        order_number: &str,
    ) -> RepositoryResult<(TradeOrder, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = Self::load_in_tx(&tx, importer_id, order_number)?;
        if let Some(order) = existing {
            tx.commit()?;
            return Ok((order, false));
        }

        let order = TradeOrder::new(importer_id, order_number);
        tx.execute(
            r#"INSERT INTO trade_order (
                importer_id, order_number, revision, last_exported_from_source,
                customer_order_number, order_date, mode, terms_of_sale,
                cancelled, created_at, updated_at
            ) VALUES (?, ?, NULL, NULL, NULL, NULL, NULL, NULL, 0, ?, ?)"#,
            params![
                &order.importer_id,
                &order.order_number,
                format_ts(&order.created_at),
                format_ts(&order.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok((order, true))
    }

    /// 按键加载订单（含行项目）
    pub fn load_order(
        &self,
        importer_id: &str,
        order_number: &str,
    ) -> RepositoryResult<Option<TradeOrder>> {
        let conn = self.get_conn()?;
        Self::load_in_tx(&conn, importer_id, order_number)
    }

    /// 条件保存: 仅当 incoming 不早于存储的指示器时写入
    ///
    /// # 返回
    /// - Ok(true): 已写入（头字段 + 整体重建行项目 + 新旧指示器，同一事务）
    /// - Ok(false): 存储侧已被更新的报文抢先覆盖，本次静默放弃
    ///
    /// # 流程
    /// 1. IMMEDIATE 事务内重读存储的新旧指示器
    /// 2. incoming 过期 → 回滚，返回 false
    /// 3. 否则 UPDATE 头 + DELETE/INSERT 行项目，提交
    pub fn save_order_if_newer(
        &self,
        order: &TradeOrder,
        incoming: &StalenessIndicator,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // === 步骤 1: 事务内重读前置条件 ===
        let stored = Self::load_in_tx(&tx, &order.importer_id, &order.order_number)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "trade_order".to_string(),
                key: format!("{}/{}", order.importer_id, order.order_number),
            })?;

        // === 步骤 2: 新旧判定（>= 可覆盖，平局允许） ===
        if !incoming.supersedes(stored.staleness().as_ref()) {
            return Ok(false); // 事务随 drop 回滚
        }

        // === 步骤 3: 写头字段 + 整体重建行项目 ===
        tx.execute(
            r#"UPDATE trade_order
               SET revision = ?, last_exported_from_source = ?,
                   customer_order_number = ?, order_date = ?, mode = ?,
                   terms_of_sale = ?, cancelled = ?, updated_at = ?
               WHERE importer_id = ? AND order_number = ?"#,
            params![
                &order.revision,
                order.last_exported_from_source.map(|ts| format_ts(&ts)),
                &order.customer_order_number,
                order.order_date.map(|d| format_date(&d)),
                &order.mode,
                &order.terms_of_sale,
                order.cancelled as i32,
                format_ts(&Utc::now()),
                &order.importer_id,
                &order.order_number,
            ],
        )?;

        tx.execute(
            "DELETE FROM order_line WHERE importer_id = ? AND order_number = ?",
            params![&order.importer_id, &order.order_number],
        )?;
        for line in &order.lines {
            tx.execute(
                r#"INSERT INTO order_line (
                    importer_id, order_number, line_number, product_uid,
                    sku, quantity, unit_of_measure, unit_price
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
                params![
                    &order.importer_id,
                    &order.order_number,
                    line.line_number,
                    &line.product_uid,
                    &line.sku,
                    line.quantity,
                    &line.unit_of_measure,
                    line.unit_price,
                ],
            )?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// 在事务/连接内加载完整订单
    fn load_in_tx(
        conn: &Connection,
        importer_id: &str,
        order_number: &str,
    ) -> RepositoryResult<Option<TradeOrder>> {
        type HeaderRow = (
            Option<i64>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            i32,
            String,
            String,
        );

        let header: Option<HeaderRow> = match conn.query_row(
            r#"SELECT revision, last_exported_from_source, customer_order_number,
                      order_date, mode, terms_of_sale, cancelled, created_at, updated_at
               FROM trade_order
               WHERE importer_id = ? AND order_number = ?"#,
            params![importer_id, order_number],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                ))
            },
        ) {
            Ok(row) => Some(row),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(e.into()),
        };

        let Some((
            revision,
            last_exported,
            customer_order_number,
            order_date,
            mode,
            terms_of_sale,
            cancelled,
            created_at,
            updated_at,
        )) = header
        else {
            return Ok(None);
        };

        let mut order = TradeOrder::new(importer_id, order_number);
        order.revision = revision;
        order.last_exported_from_source = last_exported
            .map(|s| parse_ts("trade_order", "last_exported_from_source", &s))
            .transpose()?;
        order.customer_order_number = customer_order_number;
        order.order_date = order_date
            .map(|s| parse_date("trade_order", "order_date", &s))
            .transpose()?;
        order.mode = mode;
        order.terms_of_sale = terms_of_sale;
        order.cancelled = cancelled != 0;
        order.created_at = parse_ts("trade_order", "created_at", &created_at)?;
        order.updated_at = parse_ts("trade_order", "updated_at", &updated_at)?;

        let mut stmt = conn.prepare(
            r#"SELECT line_number, product_uid, sku, quantity, unit_of_measure, unit_price
               FROM order_line
               WHERE importer_id = ? AND order_number = ?
               ORDER BY line_number"#,
        )?;
        order.lines = stmt
            .query_map(params![importer_id, order_number], |row| {
                Ok(OrderLine {
                    line_number: row.get(0)?,
                    product_uid: row.get(1)?,
                    sku: row.get(2)?,
                    quantity: row.get(3)?,
                    unit_of_measure: row.get(4)?,
                    unit_price: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(order))
    }
}

impl ExternalEntityStore for OrderRepository {
    type Entity = TradeOrder;

    fn entity_name(&self) -> &'static str {
        "Order"
    }

    fn find_or_create(
        &self,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<(TradeOrder, bool)> {
        self.find_or_create_order(importer_id, reference)
    }

    fn load(&self, importer_id: &str, reference: &str) -> RepositoryResult<Option<TradeOrder>> {
        self.load_order(importer_id, reference)
    }

    fn save_if_newer(
        &self,
        entity: &TradeOrder,
        incoming: &StalenessIndicator,
    ) -> RepositoryResult<bool> {
        self.save_order_if_newer(entity, incoming)
    }
}
