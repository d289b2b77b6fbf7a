// ==========================================
// 856 处理框架端到端测试
// ==========================================
// 职责: 多层循环（设备/订单/行项目）报文的全链路验证
// ==========================================


use std::sync::Arc;
use trade_edi_core::engine::{
    Edi856Config, Edi856Framework, Edi856Hooks, NamedLockRegistry, UpsertEngine,
};
use trade_edi_core::repository::ShipmentRepository;
use trade_edi_core::UpsertOutcome;

use crate::test_helpers::{create_test_db, raw_856};

fn make_framework(
    loop_starts: &[&str],
) -> (
    tempfile::NamedTempFile,
    Arc<ShipmentRepository>,
    Edi856Framework<ShipmentRepository>,
) {
    let (temp_file, conn) = create_test_db();
    let repo = Arc::new(ShipmentRepository::new(conn));
    let engine = UpsertEngine::new(repo.clone(), Arc::new(NamedLockRegistry::new()));
    let mut config = Edi856Config::new("IMP");
    config.loop_starts = loop_starts.iter().map(|s| s.to_string()).collect();
    let framework = Edi856Framework::new(config, Edi856Hooks::standard(), engine);
    (temp_file, repo, framework)
}

#[tokio::test]
async fn test_three_level_shipment() {
    let (_db, repo, framework) = make_framework(&["EQD", "PRF", "LIN"]);

    let raw = raw_856(
        "200315",
        "0830",
        "SHP-1",
        &[
            "REF*BM*MBL-123",
            "V1*1*长荣轮**102E",
            "DTM*056*200320",
            "EQD*CN*CONT-1*SEAL-7",
            "PRF*PO-55",
            "LIN*1*VN*PROD-9",
            "SN1*1*40*EA",
            "LIN*2*VN*PROD-8",
            "SN1*2*8*EA",
            "PRF*PO-56",
            "LIN*1*VN*PROD-7",
            "SN1*1*16*EA",
            "EQD*CN*CONT-2",
            "PRF*PO-57",
            "LIN*1*VN*PROD-6",
            "SN1*1*4*EA",
        ],
    );

    let (outcome, shipment) = framework.process_transaction(&raw).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Created);

    let shipment = shipment.unwrap();
    assert_eq!(shipment.master_bill.as_deref(), Some("MBL-123"));
    assert_eq!(shipment.vessel.as_deref(), Some("长荣轮"));
    assert_eq!(shipment.containers.len(), 2);

    let cont1 = &shipment.containers[0];
    assert_eq!(cont1.container_number, "CONT-1");
    assert_eq!(cont1.seal_number.as_deref(), Some("SEAL-7"));
    assert_eq!(cont1.lines.len(), 3);
    assert_eq!(cont1.lines[0].order_number.as_deref(), Some("PO-55"));
    assert_eq!(cont1.lines[2].order_number.as_deref(), Some("PO-56"));
    assert_eq!(cont1.lines[0].quantity, Some(40.0));

    let cont2 = &shipment.containers[1];
    assert_eq!(cont2.lines.len(), 1);
    assert_eq!(cont2.lines[0].product_uid.as_deref(), Some("PROD-6"));

    // 落库后重载完整三级结构
    let stored = repo.load_shipment("IMP", "SHP-1").unwrap().unwrap();
    assert_eq!(stored.containers.len(), 2);
    assert_eq!(stored.containers[0].lines.len(), 3);
}

#[tokio::test]
async fn test_two_level_shipment_without_order_loop() {
    let (_db, _repo, framework) = make_framework(&["EQD", "LIN"]);

    let raw = raw_856(
        "200315",
        "0830",
        "SHP-2",
        &["EQD*CN*CONT-1", "LIN*1*VN*PROD-9", "SN1*1*40*EA"],
    );

    let (_, shipment) = framework.process_transaction(&raw).await.unwrap();
    let shipment = shipment.unwrap();
    assert_eq!(shipment.containers.len(), 1);
    let line = &shipment.containers[0].lines[0];
    assert_eq!(line.product_uid.as_deref(), Some("PROD-9"));
    // 两层形态没有订单中间层
    assert!(line.order_number.is_none());
}

#[tokio::test]
async fn test_shipment_without_containers_is_business_error() {
    let (_db, repo, framework) = make_framework(&["EQD", "PRF", "LIN"]);

    let raw = raw_856("200315", "0830", "SHP-3", &["REF*BM*MBL-9"]);
    let err = framework.process_transaction(&raw).await.unwrap_err();
    assert!(err.to_string().contains("SHP-3"));

    // 保存被中止: 运单行存在（find-or-create）但头字段未写入
    let stored = repo.load_shipment("IMP", "SHP-3").unwrap().unwrap();
    assert!(stored.master_bill.is_none());
    assert!(stored.containers.is_empty());
}

#[tokio::test]
async fn test_replacement_rebuilds_container_graph() {
    let (_db, repo, framework) = make_framework(&["EQD", "PRF", "LIN"]);

    let first = raw_856(
        "200315",
        "0830",
        "SHP-4",
        &["EQD*CN*CONT-1", "PRF*PO-1", "LIN*1*VN*P1", "SN1*1*10*EA"],
    );
    framework.process_transaction(&first).await.unwrap();

    // 更新版报文换了集装箱 —— 旧设备图必须整体替换
    let second = raw_856(
        "200316",
        "0900",
        "SHP-4",
        &["EQD*CN*CONT-9", "PRF*PO-1", "LIN*1*VN*P1", "SN1*1*10*EA"],
    );
    let (outcome, _) = framework.process_transaction(&second).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let stored = repo.load_shipment("IMP", "SHP-4").unwrap().unwrap();
    assert_eq!(stored.containers.len(), 1);
    assert_eq!(stored.containers[0].container_number, "CONT-9");
}
