// ==========================================
// 贸易 EDI 核心 - TradeLens REST 客户端
// ==========================================
// 职责: 事件批 -> TradeLens 事件 POST（Bearer 鉴权）
// 鉴权: 两步 OAuth —— api key 换 access token，再换 onboarding token
// 重试: HTTP 401 视为令牌过期，强制刷新后重试，上限 10 次;
//       其他错误类别首次失败即终止并连完整响应体一起记录
// 审计: 每次响应都作为附件挂在持久化的 API 会话记录上
// ==========================================

use crate::output::splitter::MilestoneDocument;
use crate::output::OutboundGenerator;
use crate::repository::api_session_repo::ApiSessionStore;
use crate::repository::sync_record_repo::SyncRecordStore;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 401 重试上限（每次都强制刷新令牌）
pub const MAX_AUTH_ATTEMPTS: u32 = 10;

// ==========================================
// TradeLensConfig - 客户端配置
// ==========================================
#[derive(Debug, Clone)]
pub struct TradeLensConfig {
    pub auth_url: String,                 // 第一步: api key -> access token
    pub exchange_url: String,             // 第二步: access token -> onboarding token
    pub event_url: String,                // 事件 POST 端点
    pub api_key: String,
    pub org_id: String,
}

// ==========================================
// EventPoster - HTTP 调用面
// ==========================================
// 拆出接口便于对重试/刷新逻辑做无网络测试
#[async_trait]
pub trait EventPoster: Send + Sync {
    /// 第一步鉴权: api key 换 access token
    async fn authenticate(&self) -> anyhow::Result<String>;

    /// 第二步鉴权: access token 换 onboarding token
    async fn exchange(&self, access_token: &str) -> anyhow::Result<String>;

    /// POST 事件体，返回 (HTTP 状态码, 完整响应体)
    async fn post_event(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<(u16, String)>;

    fn event_url(&self) -> &str;
}

// ==========================================
// HttpEventPoster - reqwest 实现
// ==========================================
pub struct HttpEventPoster {
    http: reqwest::Client,
    config: TradeLensConfig,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct OnboardingTokenResponse {
    token: String,
}

impl HttpEventPoster {
    pub fn new(config: TradeLensConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl EventPoster for HttpEventPoster {
    async fn authenticate(&self) -> anyhow::Result<String> {
        let response = self
            .http
            .post(&self.config.auth_url)
            .json(&serde_json::json!({ "apikey": self.config.api_key }))
            .send()
            .await?
            .error_for_status()?;
        let body: AccessTokenResponse = response.json().await?;
        Ok(body.access_token)
    }

    async fn exchange(&self, access_token: &str) -> anyhow::Result<String> {
        let response = self
            .http
            .post(&self.config.exchange_url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "organizationId": self.config.org_id }))
            .send()
            .await?
            .error_for_status()?;
        let body: OnboardingTokenResponse = response.json().await?;
        Ok(body.token)
    }

    async fn post_event(
        &self,
        token: &str,
        body: &serde_json::Value,
    ) -> anyhow::Result<(u16, String)> {
        let response = self
            .http
            .post(&self.config.event_url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }

    fn event_url(&self) -> &str {
        &self.config.event_url
    }
}

// ==========================================
// TradeLensClient - 重试/刷新/审计编排
// ==========================================
pub struct TradeLensClient<P: EventPoster> {
    poster: P,
    sessions: Arc<dyn ApiSessionStore>,
    token: Mutex<Option<String>>,         // 缓存的 onboarding token
}

impl<P: EventPoster> TradeLensClient<P> {
    pub fn new(poster: P, sessions: Arc<dyn ApiSessionStore>) -> Self {
        Self {
            poster,
            sessions,
            token: Mutex::new(None),
        }
    }

    /// 取当前令牌（force_refresh 时重新走两步鉴权）
    async fn current_token(&self, force_refresh: bool) -> anyhow::Result<String> {
        let mut slot = self.token.lock().await;
        if force_refresh || slot.is_none() {
            let access = self.poster.authenticate().await?;
            let onboarding = self.poster.exchange(&access).await?;
            *slot = Some(onboarding);
        }
        slot.clone()
            .ok_or_else(|| anyhow::anyhow!("两步鉴权未产生令牌"))
    }

    /// POST 一份事件体（带 401 重试与会话审计）
    ///
    /// # 返回
    /// - Ok(status): 2xx 成功
    /// - Err: 401 重试耗尽，或其他错误类别首次失败
    pub async fn post_event(
        &self,
        body: &serde_json::Value,
        session_name: &str,
    ) -> anyhow::Result<u16> {
        let session_id = self
            .sessions
            .create_session(session_name, self.poster.event_url())?;

        for attempt in 1..=MAX_AUTH_ATTEMPTS {
            let token = self.current_token(attempt > 1).await?;
            let (status, response_body) = self.poster.post_event(&token, body).await?;

            self.sessions.append_attachment(
                &session_id,
                &format!("response-{attempt}"),
                &response_body,
            )?;
            self.sessions.set_result(&session_id, status)?;

            match status {
                200..=299 => return Ok(status),
                401 => {
                    tracing::warn!(session = %session_id, attempt, "TradeLens 401，刷新令牌后重试");
                    continue;
                }
                other => {
                    anyhow::bail!("TradeLens 调用失败: HTTP {other}: {response_body}");
                }
            }
        }
        anyhow::bail!("TradeLens 401 重试 {MAX_AUTH_ATTEMPTS} 次后仍未授权")
    }
}

#[async_trait]
impl<P: EventPoster> OutboundGenerator for TradeLensClient<P> {
    async fn generate_and_send(
        &self,
        doc: &MilestoneDocument,
        sync_store: &dyn SyncRecordStore,
    ) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "entityReference": doc.entity_key,
            "importerId": doc.importer_id,
            "billOfLading": doc.master_bill,
            "equipmentNumber": doc.container_number,
            "events": doc.updates.iter().map(|u| serde_json::json!({
                "eventType": u.code,
                "eventOccurrenceTime8601": u.date.to_rfc3339(),
            })).collect::<Vec<_>>(),
        });

        let session_name = format!("315-{}", doc.entity_key);
        self.post_event(&body, &session_name).await?;

        let now = Utc::now();
        for update in &doc.updates {
            sync_store.mark_confirmed(&doc.entity_key, &update.trading_partner, now)?;
        }
        Ok(())
    }
}
