// ==========================================
// 贸易 EDI 核心 - 实体落库引擎
// ==========================================
// 职责: 按外部单号定位或创建目标可变实体，
//       经新旧判定后委托格式回调填充头/行，条件保存
// 状态机: 新建 / 已更新 / 过期忽略（过期忽略是静默 no-op，不是错误）
// ==========================================

use crate::domain::types::{HasStaleness, StalenessIndicator, UpsertOutcome};
use crate::engine::locks::NamedLockRegistry;
use crate::parser::error::{ErrorCollector, ParseResult};
use crate::repository::ExternalEntityStore;
use std::sync::Arc;

// ==========================================
// UpsertEngine - 落库引擎
// ==========================================
pub struct UpsertEngine<R: ExternalEntityStore> {
    repo: Arc<R>,
    locks: Arc<NamedLockRegistry>,
}

impl<R: ExternalEntityStore> UpsertEngine<R> {
    pub fn new(repo: Arc<R>, locks: Arc<NamedLockRegistry>) -> Self {
        Self { repo, locks }
    }

    /// 定位或创建实体并条件更新（主入口）
    ///
    /// # 参数
    /// - importer_id / reference: 实体外部键
    /// - incoming: 新到报文的新旧判定指示器
    /// - apply: 格式回调，负责填充头字段与行项目；业务错误写入收集器
    ///
    /// # 返回
    /// - (Created / Updated, Some(entity)): 已接受并落库
    /// - (StaleIgnored, None): 报文过期或并发竞争失败 —— 静默 no-op
    ///
    /// # 流程
    /// 1. 命名锁 "Order-<单号>" 内 find-or-create（短临界区，只保护创建竞争）
    /// 2. 重载实体，内存侧新旧判定（过期 → 直接放弃，不调回调）
    /// 3. 执行格式回调，业务错误累积后一次性合并抛出
    /// 4. 条件保存（事务内重读前置条件）；并发冲突精确重试一次
    pub async fn find_or_create_and_update<F>(
        &self,
        importer_id: &str,
        reference: &str,
        incoming: &StalenessIndicator,
        mut apply: F,
    ) -> ParseResult<(UpsertOutcome, Option<R::Entity>)>
    where
        F: FnMut(&mut R::Entity, &mut ErrorCollector) -> ParseResult<()>,
    {
        // === 步骤 1: 命名锁内 find-or-create ===
        let lock_key = format!("{}-{}", self.repo.entity_name(), reference);
        let created = {
            let _guard = self.locks.acquire(&lock_key).await;
            let (_, created) = self.repo.find_or_create(importer_id, reference)?;
            created
            // 锁随作用域释放 —— 只保护创建竞争，不覆盖整个更新
        };

        // === 步骤 2~4: 条件更新，冲突精确重试一次 ===
        for attempt in 0..2 {
            // 每轮重载，保证新旧判定针对最新存储状态
            let Some(mut entity) = self.repo.load(importer_id, reference)? else {
                // find_or_create 之后行必然存在；并发删除不属于本核心的职责范围
                tracing::warn!(
                    entity = self.repo.entity_name(),
                    reference,
                    "实体在 find-or-create 之后消失，按过期忽略处理"
                );
                return Ok((UpsertOutcome::StaleIgnored, None));
            };

            if !incoming.supersedes(entity.staleness().as_ref()) {
                tracing::debug!(
                    entity = self.repo.entity_name(),
                    reference,
                    incoming = %incoming,
                    "报文过期，静默忽略"
                );
                return Ok((UpsertOutcome::StaleIgnored, None));
            }

            // 格式回调: 业务错误全部累积后合并抛出（整单原子性 —— 保存尚未发生）
            let mut errors = ErrorCollector::new();
            apply(&mut entity, &mut errors)?;
            errors.into_result()?;

            entity.apply_staleness(incoming);

            if self.repo.save_if_newer(&entity, incoming)? {
                let outcome = if created {
                    UpsertOutcome::Created
                } else {
                    UpsertOutcome::Updated
                };
                tracing::info!(
                    entity = self.repo.entity_name(),
                    reference,
                    outcome = %outcome,
                    "实体落库完成"
                );
                return Ok((outcome, Some(entity)));
            }

            tracing::debug!(
                entity = self.repo.entity_name(),
                reference,
                attempt,
                "条件保存被并发写入抢先，重载重试"
            );
        }

        // 两轮都被更新的并发报文抢先 —— 本报文已过期
        Ok((UpsertOutcome::StaleIgnored, None))
    }
}
