// ==========================================
// TradeLens 客户端重试/审计测试
// ==========================================
// 职责: 验证 401 令牌刷新重试、非 401 快速失败、会话附件审计
// ==========================================


use async_trait::async_trait;
use rusqlite::Connection;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use trade_edi_core::output::tradelens::{EventPoster, TradeLensClient, MAX_AUTH_ATTEMPTS};
use trade_edi_core::repository::{ApiSessionRepository, ApiSessionStore};

use crate::test_helpers::create_test_db;

// ==========================================
// 测试替身: 按脚本返回状态码的 HTTP 面
// ==========================================
struct ScriptedPoster {
    statuses: Vec<u16>,             // 按调用次序返回的状态码（超出则重复末项）
    posts: Arc<AtomicU32>,
    auths: Arc<AtomicU32>,
}

impl ScriptedPoster {
    fn new(statuses: Vec<u16>) -> Self {
        Self {
            statuses,
            posts: Arc::new(AtomicU32::new(0)),
            auths: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl EventPoster for ScriptedPoster {
    async fn authenticate(&self) -> anyhow::Result<String> {
        self.auths.fetch_add(1, Ordering::SeqCst);
        Ok("access".to_string())
    }

    async fn exchange(&self, _access_token: &str) -> anyhow::Result<String> {
        Ok("onboarding".to_string())
    }

    async fn post_event(
        &self,
        _token: &str,
        _body: &serde_json::Value,
    ) -> anyhow::Result<(u16, String)> {
        let index = self.posts.fetch_add(1, Ordering::SeqCst) as usize;
        let status = *self
            .statuses
            .get(index)
            .or(self.statuses.last())
            .unwrap_or(&200);
        Ok((status, format!("{{\"status\":{status}}}")))
    }

    fn event_url(&self) -> &str {
        "https://tradelens.example/events"
    }
}

fn make_sessions() -> (tempfile::NamedTempFile, Arc<Mutex<Connection>>, Arc<ApiSessionRepository>) {
    let (temp_file, conn) = create_test_db();
    let sessions = Arc::new(ApiSessionRepository::new(conn.clone()));
    (temp_file, conn, sessions)
}

#[tokio::test]
async fn test_401_refreshes_token_and_retries() {
    let (_db, _conn, sessions) = make_sessions();
    let poster = ScriptedPoster::new(vec![401, 401, 200]);
    let auths = poster.auths.clone();
    let client = TradeLensClient::new(poster, sessions);

    let status = client
        .post_event(&serde_json::json!({"events": []}), "315-ENT-1")
        .await
        .unwrap();
    assert_eq!(status, 200);
    // 首次鉴权 1 次 + 两次 401 各强制刷新 1 次
    assert_eq!(auths.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_401_retry_exhaustion() {
    let (_db, _conn, sessions) = make_sessions();
    let poster = ScriptedPoster::new(vec![401]);
    let client = TradeLensClient::new(poster, sessions);

    let err = client
        .post_event(&serde_json::json!({"events": []}), "315-ENT-1")
        .await
        .unwrap_err();
    assert!(err.to_string().contains(&MAX_AUTH_ATTEMPTS.to_string()));
}

#[tokio::test]
async fn test_non_401_fails_fast_with_body() {
    let (_db, _conn, sessions) = make_sessions();
    let client = TradeLensClient::new(ScriptedPoster::new(vec![500]), sessions);

    let err = client
        .post_event(&serde_json::json!({"events": []}), "315-ENT-1")
        .await
        .unwrap_err();
    let msg = err.to_string();
    // 非 401 不重试，完整响应体进入错误报告
    assert!(msg.contains("500"));
    assert!(msg.contains("{\"status\":500}"));
}

#[tokio::test]
async fn test_every_response_is_attached_to_session() {
    let (_db, conn, sessions) = make_sessions();
    let client = TradeLensClient::new(ScriptedPoster::new(vec![401, 200]), sessions);

    client
        .post_event(&serde_json::json!({"events": []}), "315-ENT-1")
        .await
        .unwrap();

    let guard = conn.lock().unwrap();
    let attachments: i64 = guard
        .query_row("SELECT COUNT(*) FROM api_session_attachment", [], |row| row.get(0))
        .unwrap();
    assert_eq!(attachments, 2);

    let (name, status): (String, i64) = guard
        .query_row(
            "SELECT name, status_code FROM api_session",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "315-ENT-1");
    assert_eq!(status, 200);
}
