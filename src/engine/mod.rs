// ==========================================
// 贸易 EDI 核心 - 引擎层模块
// ==========================================
// 职责: 报文处理框架（850/856）、实体落库、315 分发与其支撑组件
// ==========================================

pub mod dispatch;
pub mod edi850;
pub mod edi856;
pub mod fingerprint;
pub mod locks;
pub mod time_adjust;
pub mod upsert;

pub use dispatch::{DispatchSummary, MilestoneDispatchEngine};
pub use edi850::{Edi850Config, Edi850Framework, Edi850Hooks, StalenessStrategy};
pub use edi856::{Edi856Config, Edi856Framework, Edi856Hooks};
pub use fingerprint::{milestone_code, milestone_fingerprint};
pub use locks::NamedLockRegistry;
pub use time_adjust::adjust_collision;
pub use upsert::UpsertEngine;
