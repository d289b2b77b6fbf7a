// ==========================================
// 贸易 EDI 核心 - 出站层模块
// ==========================================
// 职责: 事件批 -> 出站文档拆分 -> 生成器（XML 上传 / TradeLens REST）
// ==========================================

pub mod code_tables;
pub mod splitter;
pub mod tradelens;
pub mod xml;

pub use splitter::{split_documents, MilestoneDocument};
pub use tradelens::{HttpEventPoster, TradeLensClient, TradeLensConfig};
pub use xml::XmlMilestoneGenerator;

use crate::repository::sync_record_repo::SyncRecordStore;
use async_trait::async_trait;

// ==========================================
// OutboundGenerator - 出站生成器接口
// ==========================================
/// 把一份出站文档转成外部工件并送达；送达成功后负责确认同步记录。
/// 失败时同步记录保持未确认，由 5 分钟重发窗口兜底。
#[async_trait]
pub trait OutboundGenerator: Send + Sync {
    async fn generate_and_send(
        &self,
        doc: &MilestoneDocument,
        sync_store: &dyn SyncRecordStore,
    ) -> anyhow::Result<()>;
}

// ==========================================
// TransportSink - 工件传输接收器
// ==========================================
/// 工件落地（FTP/S3 等由接入方实现并注入）
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn upload(&self, artifact: Vec<u8>, folder: &str) -> anyhow::Result<()>;
}
