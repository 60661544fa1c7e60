//! # 并发去重模块
//!
//! ## 设计思路
//!
//! 显示框架的记忆化层需要保证“同一键同时最多一个加载任务”，并把唯一结果分发给所有等待者。
//! `InflightLoads` 是这一约定的参考实现：只记录进行中的加载，结果落定后立即移除，
//! 不保留位图，也没有淘汰策略（保留与淘汰属于宿主的图片缓存）。
//!
//! ## 实现思路
//!
//! - 每个进行中的键对应一个 `tokio::sync::OnceCell`，第一个调用者执行加载，其余调用者等待。
//! - 成功与失败都以 `Arc` 形式分发，等待者拿到同一份结果。
//! - 结果落定后按 `Arc::ptr_eq` 移除对应条目，避免误删后来者新建的条目。
//! - 所有等待者都被取消时同样移除条目，不留下无人推进的加载。

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::OnceCell;

use super::{AssetBundle, DecodedBitmap, Rasterizer, SvgCacheKey, SvgError, SvgLoader};

/// 分发给所有等待者的加载结果。
pub type SharedLoad = Result<Arc<DecodedBitmap>, Arc<SvgError>>;

/// 进行中的加载表。
#[derive(Default)]
pub struct InflightLoads {
    pending: Mutex<HashMap<SvgCacheKey, Arc<OnceCell<SharedLoad>>>>,
}

impl InflightLoads {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前进行中的键数量。
    pub fn in_flight(&self) -> usize {
        self.lock_pending().len()
    }

    /// 通过 `SvgLoader` 加载，同一键的并发调用只触发一次加载。
    pub async fn load<B, R>(&self, loader: &SvgLoader<B, R>, key: &SvgCacheKey) -> SharedLoad
    where
        B: AssetBundle,
        R: Rasterizer,
    {
        self.run(key, || loader.load(key)).await
    }

    /// 以任意加载函数执行去重。
    pub async fn run<F, Fut>(&self, key: &SvgCacheKey, load: F) -> SharedLoad
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<DecodedBitmap, SvgError>>,
    {
        let cell = {
            let mut pending = self.lock_pending();
            Arc::clone(
                pending
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };
        let guard = PendingEntry {
            loads: self,
            key,
            cell,
        };

        guard
            .cell
            .get_or_init(|| async move {
                log::debug!("🚚 发起加载 - {}", key.locator());
                load().await.map(Arc::new).map_err(Arc::new)
            })
            .await
            .clone()
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<SvgCacheKey, Arc<OnceCell<SharedLoad>>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 调用方离开 `run` 时（完成或被取消）清理表项。
///
/// 结果已落定，或已没有其他等待者时移除；仍有等待者的未完成加载保留，由它们继续初始化。
struct PendingEntry<'a> {
    loads: &'a InflightLoads,
    key: &'a SvgCacheKey,
    cell: Arc<OnceCell<SharedLoad>>,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        let settled = self.cell.initialized();
        let mut pending = self.loads.lock_pending();
        // 表内一份 + 本调用一份
        let removable = pending.get(self.key).is_some_and(|current| {
            Arc::ptr_eq(current, &self.cell) && (settled || Arc::strong_count(current) <= 2)
        });

        if removable {
            if !settled {
                log::debug!("🧹 加载已无人等待，移除 - {}", self.key.locator());
            }
            pending.remove(self.key);
        }
    }
}
