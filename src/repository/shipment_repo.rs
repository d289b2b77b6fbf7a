// ==========================================
// 贸易 EDI 核心 - 运单仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 并发: 与订单仓储同一条件更新纪律（事务内重读 + 过期回滚）
// ==========================================

use crate::domain::shipment::{Shipment, ShipmentContainer, ShipmentLine};
use crate::domain::types::{HasStaleness, StalenessIndicator};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_date, format_ts, parse_date, parse_ts, ExternalEntityStore};
use chrono::Utc;
use rusqlite::{params, Connection, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// ShipmentRepository - 运单仓储
// ==========================================
pub struct ShipmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ShipmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按键查找，不存在则创建空运单
    pub fn find_or_create_shipment(
        &self,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<(Shipment, bool)> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(shipment) = Self::load_in_tx(&tx, importer_id, reference)? {
            tx.commit()?;
            return Ok((shipment, false));
        }

        let shipment = Shipment::new(importer_id, reference);
        tx.execute(
            r#"INSERT INTO shipment (
                importer_id, reference, last_exported_from_source,
                master_bill, house_bill, vessel, voyage, mode, est_arrival_date,
                created_at, updated_at
            ) VALUES (?, ?, NULL, NULL, NULL, NULL, NULL, NULL, NULL, ?, ?)"#,
            params![
                &shipment.importer_id,
                &shipment.reference,
                format_ts(&shipment.created_at),
                format_ts(&shipment.updated_at),
            ],
        )?;
        tx.commit()?;
        Ok((shipment, true))
    }

    /// 按键加载运单（含集装箱与行项目）
    pub fn load_shipment(
        &self,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<Option<Shipment>> {
        let conn = self.get_conn()?;
        Self::load_in_tx(&conn, importer_id, reference)
    }

    /// 条件保存: 仅当 incoming 不早于存储的指示器时写入
    pub fn save_shipment_if_newer(
        &self,
        shipment: &Shipment,
        incoming: &StalenessIndicator,
    ) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // === 步骤 1: 事务内重读前置条件 ===
        let stored = Self::load_in_tx(&tx, &shipment.importer_id, &shipment.reference)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "shipment".to_string(),
                key: format!("{}/{}", shipment.importer_id, shipment.reference),
            })?;

        // === 步骤 2: 新旧判定 ===
        if !incoming.supersedes(stored.staleness().as_ref()) {
            return Ok(false);
        }

        // === 步骤 3: 写头字段 + 整体重建设备/行项目 ===
        tx.execute(
            r#"UPDATE shipment
               SET last_exported_from_source = ?, master_bill = ?, house_bill = ?,
                   vessel = ?, voyage = ?, mode = ?, est_arrival_date = ?, updated_at = ?
               WHERE importer_id = ? AND reference = ?"#,
            params![
                shipment.last_exported_from_source.map(|ts| format_ts(&ts)),
                &shipment.master_bill,
                &shipment.house_bill,
                &shipment.vessel,
                &shipment.voyage,
                &shipment.mode,
                shipment.est_arrival_date.map(|d| format_date(&d)),
                format_ts(&Utc::now()),
                &shipment.importer_id,
                &shipment.reference,
            ],
        )?;

        tx.execute(
            "DELETE FROM shipment_container WHERE importer_id = ? AND reference = ?",
            params![&shipment.importer_id, &shipment.reference],
        )?;
        for container in &shipment.containers {
            tx.execute(
                r#"INSERT INTO shipment_container (
                    importer_id, reference, container_number, seal_number
                ) VALUES (?, ?, ?, ?)"#,
                params![
                    &shipment.importer_id,
                    &shipment.reference,
                    &container.container_number,
                    &container.seal_number,
                ],
            )?;
            for line in &container.lines {
                tx.execute(
                    r#"INSERT INTO shipment_line (
                        importer_id, reference, container_number, line_number,
                        order_number, product_uid, quantity
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
                    params![
                        &shipment.importer_id,
                        &shipment.reference,
                        &container.container_number,
                        line.line_number,
                        &line.order_number,
                        &line.product_uid,
                        line.quantity,
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn load_in_tx(
        conn: &Connection,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<Option<Shipment>> {
        type HeaderRow = (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            String,
            String,
        );

        let header: Option<HeaderRow> = match conn.query_row(
            r#"SELECT last_exported_from_source, master_bill, house_bill, vessel,
                      voyage, mode, est_arrival_date, created_at, updated_at
               FROM shipment
               WHERE importer_id = ? AND reference = ?"#,
            params![importer_id, reference],
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
            last_exported,
            master_bill,
            house_bill,
            vessel,
            voyage,
            mode,
            est_arrival_date,
            created_at,
            updated_at,
        )) = header
        else {
            return Ok(None);
        };

        let mut shipment = Shipment::new(importer_id, reference);
        shipment.last_exported_from_source = last_exported
            .map(|s| parse_ts("shipment", "last_exported_from_source", &s))
            .transpose()?;
        shipment.master_bill = master_bill;
        shipment.house_bill = house_bill;
        shipment.vessel = vessel;
        shipment.voyage = voyage;
        shipment.mode = mode;
        shipment.est_arrival_date = est_arrival_date
            .map(|s| parse_date("shipment", "est_arrival_date", &s))
            .transpose()?;
        shipment.created_at = parse_ts("shipment", "created_at", &created_at)?;
        shipment.updated_at = parse_ts("shipment", "updated_at", &updated_at)?;

        // 设备（集装箱）层
        let mut stmt = conn.prepare(
            r#"SELECT container_number, seal_number
               FROM shipment_container
               WHERE importer_id = ? AND reference = ?
               ORDER BY container_number"#,
        )?;
        let containers: Vec<(String, Option<String>)> = stmt
            .query_map(params![importer_id, reference], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut line_stmt = conn.prepare(
            r#"SELECT line_number, order_number, product_uid, quantity
               FROM shipment_line
               WHERE importer_id = ? AND reference = ? AND container_number = ?
               ORDER BY line_number"#,
        )?;
        for (container_number, seal_number) in containers {
            let lines = line_stmt
                .query_map(params![importer_id, reference, &container_number], |row| {
                    Ok(ShipmentLine {
                        line_number: row.get(0)?,
                        order_number: row.get(1)?,
                        product_uid: row.get(2)?,
                        quantity: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            shipment.containers.push(ShipmentContainer {
                container_number,
                seal_number,
                lines,
            });
        }

        Ok(Some(shipment))
    }
}

impl ExternalEntityStore for ShipmentRepository {
    type Entity = Shipment;

    fn entity_name(&self) -> &'static str {
        "Shipment"
    }

    fn find_or_create(
        &self,
        importer_id: &str,
        reference: &str,
    ) -> RepositoryResult<(Shipment, bool)> {
        self.find_or_create_shipment(importer_id, reference)
    }

    fn load(&self, importer_id: &str, reference: &str) -> RepositoryResult<Option<Shipment>> {
        self.load_shipment(importer_id, reference)
    }

    fn save_if_newer(
        &self,
        entity: &Shipment,
        incoming: &StalenessIndicator,
    ) -> RepositoryResult<bool> {
        self.save_shipment_if_newer(entity, incoming)
    }
}
