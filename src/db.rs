// ==========================================
// 贸易 EDI 核心 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout 逐连接生效）
// - 统一建表入口，测试与生产走同一份 schema
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）—— 并发写入时减少偶发 busy 错误
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化全部数据表（幂等）
///
/// # 表清单
/// - trade_order / order_line: 订单及行项目
/// - shipment / shipment_container / shipment_line: 运单三级结构
/// - sync_record: 每 (实体, 目的地) 的发送去重账本
/// - api_session / api_session_attachment: 外部 REST 调用审计
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS trade_order (
            importer_id TEXT NOT NULL,
            order_number TEXT NOT NULL,
            revision INTEGER,
            last_exported_from_source TEXT,
            customer_order_number TEXT,
            order_date TEXT,
            mode TEXT,
            terms_of_sale TEXT,
            cancelled INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (importer_id, order_number)
        );

        CREATE TABLE IF NOT EXISTS order_line (
            importer_id TEXT NOT NULL,
            order_number TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            product_uid TEXT,
            sku TEXT,
            quantity REAL,
            unit_of_measure TEXT,
            unit_price REAL,
            PRIMARY KEY (importer_id, order_number, line_number),
            FOREIGN KEY (importer_id, order_number)
                REFERENCES trade_order(importer_id, order_number)
                ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS shipment (
            importer_id TEXT NOT NULL,
            reference TEXT NOT NULL,
            last_exported_from_source TEXT,
            master_bill TEXT,
            house_bill TEXT,
            vessel TEXT,
            voyage TEXT,
            mode TEXT,
            est_arrival_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (importer_id, reference)
        );

        CREATE TABLE IF NOT EXISTS shipment_container (
            importer_id TEXT NOT NULL,
            reference TEXT NOT NULL,
            container_number TEXT NOT NULL,
            seal_number TEXT,
            PRIMARY KEY (importer_id, reference, container_number),
            FOREIGN KEY (importer_id, reference)
                REFERENCES shipment(importer_id, reference)
                ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS shipment_line (
            importer_id TEXT NOT NULL,
            reference TEXT NOT NULL,
            container_number TEXT NOT NULL,
            line_number INTEGER NOT NULL,
            order_number TEXT,
            product_uid TEXT,
            quantity REAL,
            PRIMARY KEY (importer_id, reference, container_number, order_number, line_number),
            FOREIGN KEY (importer_id, reference, container_number)
                REFERENCES shipment_container(importer_id, reference, container_number)
                ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS sync_record (
            entity_key TEXT NOT NULL,
            trading_partner TEXT NOT NULL,
            fingerprint TEXT,
            sent_at TEXT,
            confirmed_at TEXT,
            context TEXT NOT NULL DEFAULT '{}',
            PRIMARY KEY (entity_key, trading_partner)
        );

        CREATE TABLE IF NOT EXISTS api_session (
            session_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            url TEXT NOT NULL,
            status_code INTEGER,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS api_session_attachment (
            attachment_id INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id TEXT NOT NULL REFERENCES api_session(session_id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
}
