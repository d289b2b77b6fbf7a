// ==========================================
// 贸易 EDI 核心 - 命名互斥锁注册表
// ==========================================
// 职责: 进程内按字符串键的互斥锁（"Order-<单号>" / "315-<编号>" / "Product-<uid>"）
// 纪律: 外层实体锁先于任何嵌套 Product/Company 锁获取，绝不反向 —— 避免死锁
// 异常安全: 守卫随 drop 释放，临界区内报错不会滞留锁
// ==========================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

// ==========================================
// NamedLockRegistry - 命名锁注册表
// ==========================================
pub struct NamedLockRegistry {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NamedLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 获取命名锁（同键串行，异键并行）
    ///
    /// # 返回
    /// - OwnedMutexGuard: 持有期内同键调用方阻塞；drop 即释放
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            // 注册表自身的锁只保护 map 查找/插入，不跨 await 持有
            let mut map = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for NamedLockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let registry = Arc::new(NamedLockRegistry::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let in_section = in_section.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = registry.acquire("Order-PO-1").await;
                let now = in_section.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(2)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let registry = NamedLockRegistry::new();
        let _a = registry.acquire("Order-A").await;
        // 异键获取不得阻塞
        let _b = registry.acquire("Order-B").await;
    }
}
