/// 指纹缓存与平滑
///
/// 每种定位技术持有一个有界 FIFO 历史，并将历史插值为单个代表性指纹。
/// 支持：
/// - 均衡平均（每个键按出现次数求算术平均）
/// - 卡尔曼平滑（每个键独立的一维卡尔曼滤波）

use crate::algorithms::{Fingerprint, SignalInformation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// 缓存策略接口
pub trait CachingManager: Send {
    /// 追加一条原始指纹，超出容量时淘汰最旧的一条
    fn add_data(&mut self, fingerprint: Fingerprint);

    /// 将当前历史插值为单个指纹
    fn interpolate_data(&self) -> Fingerprint;

    /// 当前历史（按到达顺序，最旧在前）
    fn history(&self) -> &VecDeque<Fingerprint>;

    fn capacity(&self) -> usize;

    fn clear(&mut self);
}

/// 缓存策略选择（用于配置）
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachingKind {
    #[default]
    Balance,
    Kalman,
}

impl CachingKind {
    /// 按策略构造缓存管理器
    pub fn build(self, capacity: usize) -> Box<dyn CachingManager> {
        match self {
            CachingKind::Balance => Box::new(BalanceCachingManager::with_capacity(capacity)),
            CachingKind::Kalman => Box::new(KalmanCachingManager::with_capacity(capacity)),
        }
    }
}

// ============================================================================
// 有界历史
// ============================================================================

#[derive(Clone, Debug)]
struct History {
    entries: VecDeque<Fingerprint>,
    capacity: usize,
}

impl History {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        History {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    fn push(&mut self, fingerprint: Fingerprint) {
        self.entries.push_back(fingerprint);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            tracing::trace!(capacity = self.capacity, "evicted oldest fingerprint");
        }
    }
}

// ============================================================================
// 均衡缓存
// ============================================================================

/// 均衡缓存管理器：每个键取其出现过的历史条目的算术平均
///
/// 未包含某键的条目不计入该键的除数。
#[derive(Clone, Debug)]
pub struct BalanceCachingManager {
    history: History,
}

impl BalanceCachingManager {
    /// 默认容量为 1
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BalanceCachingManager {
            history: History::new(capacity),
        }
    }
}

impl Default for BalanceCachingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CachingManager for BalanceCachingManager {
    fn add_data(&mut self, fingerprint: Fingerprint) {
        self.history.push(fingerprint);
    }

    fn interpolate_data(&self) -> Fingerprint {
        let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
        for entry in &self.history.entries {
            for (id, signal) in entry.iter() {
                let slot = sums.entry(id.as_str()).or_insert((0.0, 0));
                slot.0 += signal.strength;
                slot.1 += 1;
            }
        }
        sums.into_iter()
            .map(|(id, (sum, count))| {
                (id.to_string(), SignalInformation::new(sum / count as f64))
            })
            .collect()
    }

    fn history(&self) -> &VecDeque<Fingerprint> {
        &self.history.entries
    }

    fn capacity(&self) -> usize {
        self.history.capacity
    }

    fn clear(&mut self) {
        self.history.entries.clear();
    }
}

// ============================================================================
// 卡尔曼缓存
// ============================================================================

/// 简单的 1D 卡尔曼滤波器
#[derive(Clone, Debug)]
pub struct KalmanFilter1D {
    /// 过程噪声协方差
    pub q: f64,
    /// 测量噪声协方差
    pub r: f64,
    /// 状态估计协方差
    pub p: f64,
    /// 当前估计值
    pub value: f64,
}

impl KalmanFilter1D {
    pub fn new(q: f64, r: f64, initial_value: f64) -> Self {
        KalmanFilter1D {
            q,
            r,
            p: 1.0,
            value: initial_value,
        }
    }

    /// 输入一次测量，返回新的估计值
    pub fn update(&mut self, measurement: f64) -> f64 {
        // 预测
        self.p += self.q;

        let k = self.p / (self.p + self.r);

        self.value += k * (measurement - self.value);
        self.p *= 1.0 - k;

        self.value
    }
}

/// 卡尔曼缓存管理器
///
/// 每次插值都从历史重新计算：每个键以首次观测值初始化滤波器，
/// 再按到达顺序输入后续观测值，输出最终估计。
#[derive(Clone, Debug)]
pub struct KalmanCachingManager {
    history: History,
    q: f64,
    r: f64,
}

impl KalmanCachingManager {
    pub const DEFAULT_Q: f64 = 0.01;
    pub const DEFAULT_R: f64 = 4.0;

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_noise(capacity, Self::DEFAULT_Q, Self::DEFAULT_R)
    }

    /// 自定义过程噪声 q 与测量噪声 r
    pub fn with_noise(capacity: usize, q: f64, r: f64) -> Self {
        KalmanCachingManager {
            history: History::new(capacity),
            q,
            r,
        }
    }
}

impl CachingManager for KalmanCachingManager {
    fn add_data(&mut self, fingerprint: Fingerprint) {
        self.history.push(fingerprint);
    }

    fn interpolate_data(&self) -> Fingerprint {
        let mut filters: HashMap<&str, KalmanFilter1D> = HashMap::new();
        for entry in &self.history.entries {
            for (id, signal) in entry.iter() {
                match filters.get_mut(id.as_str()) {
                    Some(filter) => {
                        filter.update(signal.strength);
                    }
                    None => {
                        filters.insert(id.as_str(), KalmanFilter1D::new(self.q, self.r, signal.strength));
                    }
                }
            }
        }
        filters
            .into_iter()
            .map(|(id, filter)| (id.to_string(), SignalInformation::new(filter.value)))
            .collect()
    }

    fn history(&self) -> &VecDeque<Fingerprint> {
        &self.history.entries
    }

    fn capacity(&self) -> usize {
        self.history.capacity
    }

    fn clear(&mut self) {
        self.history.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_interpolate_reference_history() {
        let mut manager = BalanceCachingManager::with_capacity(10);
        for i in 0..10 {
            let i = i as f64;
            manager.add_data(Fingerprint::from_pairs(vec![
                ("a", i + 1.0),
                ("b", 10.0 - i),
                ("c", i + 11.0),
                ("d", 20.0 - i),
            ]));
        }
        let result = manager.interpolate_data();
        assert_eq!(result.strength("a"), Some(5.5));
        assert_eq!(result.strength("b"), Some(5.5));
        assert_eq!(result.strength("c"), Some(15.5));
        assert_eq!(result.strength("d"), Some(15.5));
    }

    #[test]
    fn test_balance_partial_keys_use_own_divisor() {
        let mut manager = BalanceCachingManager::with_capacity(3);
        manager.add_data(Fingerprint::from_pairs(vec![("a", -60.0), ("b", -40.0)]));
        manager.add_data(Fingerprint::from_pairs(vec![("a", -70.0)]));
        manager.add_data(Fingerprint::from_pairs(vec![("a", -80.0)]));
        let result = manager.interpolate_data();
        assert_eq!(result.strength("a"), Some(-70.0));
        assert_eq!(result.strength("b"), Some(-40.0));
    }

    #[test]
    fn test_default_capacity_keeps_latest_only() {
        let mut manager = BalanceCachingManager::new();
        manager.add_data(Fingerprint::from_pairs(vec![("a", 1.0)]));
        manager.add_data(Fingerprint::from_pairs(vec![("b", 2.0)]));
        assert_eq!(manager.history().len(), 1);
        let result = manager.interpolate_data();
        assert!(!result.contains("a"));
        assert_eq!(result.strength("b"), Some(2.0));
    }

    #[test]
    fn test_empty_history_interpolates_to_empty() {
        let manager = BalanceCachingManager::with_capacity(5);
        assert!(manager.interpolate_data().is_empty());
        let kalman = KalmanCachingManager::with_capacity(5);
        assert!(kalman.interpolate_data().is_empty());
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let manager = BalanceCachingManager::with_capacity(0);
        assert_eq!(manager.capacity(), 1);
    }

    #[test]
    fn test_kalman_filter_1d() {
        let mut filter = KalmanFilter1D::new(0.001, 0.1, 0.0);
        let v1 = filter.update(10.0);
        let v2 = filter.update(10.1);
        assert!(v1 > 0.0 && v1 < 10.0);
        assert!(v2 > v1 && v2 < 10.1);
    }

    #[test]
    fn test_kalman_single_observation_is_passthrough() {
        let mut manager = KalmanCachingManager::with_capacity(4);
        manager.add_data(Fingerprint::from_pairs(vec![("a", -55.0)]));
        assert_eq!(manager.interpolate_data().strength("a"), Some(-55.0));
    }

    #[test]
    fn test_kalman_smooths_towards_new_readings() {
        let mut manager = KalmanCachingManager::with_capacity(4);
        manager.add_data(Fingerprint::from_pairs(vec![("a", -60.0)]));
        manager.add_data(Fingerprint::from_pairs(vec![("a", -40.0)]));
        let value = manager.interpolate_data().strength("a").unwrap();
        assert!(value > -60.0 && value < -40.0);
        // 幂等
        assert_eq!(manager.interpolate_data().strength("a"), Some(value));
    }

    #[test]
    fn test_caching_kind_build() {
        let manager = CachingKind::Kalman.build(3);
        assert_eq!(manager.capacity(), 3);
        let manager = CachingKind::default().build(0);
        assert_eq!(manager.capacity(), 1);
    }
}
