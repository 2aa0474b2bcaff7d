/// 定位技术绑定
///
/// 每种技术把一个信号来源与一组缓存/匹配（或排除）策略绑定，
/// 对外暴露 `signal_data`（最新读数）与 `match_positions`（候选打分）。
/// 所有方法都只需 `&self`，可通过 `Arc` 在采集线程与匹配线程之间共享。

pub mod store;
pub mod wifi;
pub mod ble;
pub mod compass;
pub mod gps;

pub use ble::*;
pub use compass::*;
pub use gps::*;
pub use store::*;
pub use wifi::*;

use crate::algorithms::{
    BalanceCachingManager, CachingManager, CandidateScores, Fingerprint, Matcher,
    OrderMatcher, PositionInformation,
};
use std::sync::{Mutex, MutexGuard};

/// 定位技术接口（供位置管理器调用）
pub trait Technology: Send + Sync {
    fn name(&self) -> &str;

    /// 当前读数
    fn signal_data(&self) -> Fingerprint;

    /// 对候选位置打分；没有可用读数时返回 None
    fn match_positions(&self, persisted_positions: &[PositionInformation]) -> Option<CandidateScores>;
}

/// 缓存管理器与匹配器的绑定
pub struct TechnologyBinding {
    caching: Mutex<Box<dyn CachingManager>>,
    matcher: Box<dyn Matcher>,
    ignore_disabled_aps: bool,
}

impl TechnologyBinding {
    pub fn new(caching: Box<dyn CachingManager>, matcher: Box<dyn Matcher>) -> Self {
        TechnologyBinding {
            caching: Mutex::new(caching),
            matcher,
            ignore_disabled_aps: false,
        }
    }

    pub fn with_ignore_disabled_aps(mut self, ignore_disabled_aps: bool) -> Self {
        self.ignore_disabled_aps = ignore_disabled_aps;
        self
    }

    /// 将实时指纹送入缓存并对候选位置打分
    pub fn match_fingerprint(
        &self,
        fingerprint: Fingerprint,
        persisted_positions: &[PositionInformation],
    ) -> CandidateScores {
        let mut caching = lock(&self.caching);
        self.matcher.nearest_neighbour(
            &mut **caching,
            fingerprint,
            persisted_positions,
            self.ignore_disabled_aps,
        )
    }

    /// 当前缓存历史的插值结果
    pub fn interpolated(&self) -> Fingerprint {
        lock(&self.caching).interpolate_data()
    }

    pub fn clear_cache(&self) {
        lock(&self.caching).clear();
    }
}

impl Default for TechnologyBinding {
    /// 均衡缓存（容量 1）+ 秩序匹配
    fn default() -> Self {
        TechnologyBinding::new(Box::new(BalanceCachingManager::new()), Box::new(OrderMatcher))
    }
}

/// 获取锁；锁中毒时恢复内部数据而不是 panic
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering poisoned technology lock");
        poisoned.into_inner()
    })
}
