/// 指纹匹配算法
///
/// 支持：
/// - 秩序匹配（按信号强度排序后的 ID 位置比较，不依赖绝对强度）
/// - 欧氏距离匹配（按强度差计算）

use crate::algorithms::{CachingManager, CandidateScores, Fingerprint, PositionInformation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 缺失接入点的替代强度 (dBm)
pub const MISSING_STRENGTH: f64 = -100.0;

/// 匹配策略接口
///
/// 实时指纹先送入缓存管理器平滑，再与每个候选位置打分。分数越低越相似。
pub trait Matcher: Send + Sync {
    fn nearest_neighbour(
        &self,
        caching_manager: &mut dyn CachingManager,
        fingerprint: Fingerprint,
        persisted_positions: &[PositionInformation],
        ignore_disabled_aps: bool,
    ) -> CandidateScores;
}

/// 匹配策略选择（用于配置）
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Order,
    Distance,
}

impl MatcherKind {
    pub fn build(self) -> Box<dyn Matcher> {
        match self {
            MatcherKind::Order => Box::new(OrderMatcher),
            MatcherKind::Distance => Box::new(DistanceMatcher),
        }
    }
}

// ============================================================================
// 秩序匹配
// ============================================================================

/// 秩序匹配器
///
/// 将实时指纹与候选指纹分别按强度升序排列（强度相同按 ID 字典序），
/// 逐位置比较 ID，不一致的位置数即为分数。适合采集参考库时与当前设备
/// 硬件校准不同的场景。
///
/// `ignore_disabled_aps` 仅为接口兼容保留，此算法不使用。
#[derive(Clone, Copy, Debug, Default)]
pub struct OrderMatcher;

impl OrderMatcher {
    /// 计算候选秩序与实时秩序的不一致位置数
    fn count_differences(live_order: &[&str], persisted: &Fingerprint) -> usize {
        let persisted_order = persisted.rank_order();
        live_order
            .iter()
            .enumerate()
            .filter(|(index, id)| persisted_order.get(*index) != Some(*id))
            .count()
    }
}

impl Matcher for OrderMatcher {
    fn nearest_neighbour(
        &self,
        caching_manager: &mut dyn CachingManager,
        fingerprint: Fingerprint,
        persisted_positions: &[PositionInformation],
        _ignore_disabled_aps: bool,
    ) -> CandidateScores {
        caching_manager.add_data(fingerprint);
        let interpolated = caching_manager.interpolate_data();
        let live_order = interpolated.rank_order();

        let mut scores = CandidateScores::new();
        for position in persisted_positions {
            let differences = Self::count_differences(&live_order, &position.fingerprint);
            tracing::trace!(position = %position.name, differences, "order match");
            scores.insert(position.clone(), differences as f64);
        }
        scores
    }
}

// ============================================================================
// 距离匹配
// ============================================================================

/// 欧氏距离匹配器
///
/// 在两侧键的并集上计算欧氏距离，单侧缺失的键按 [`MISSING_STRENGTH`] 计。
/// `ignore_disabled_aps` 为 true 时跳过实时指纹中未出现的接入点。
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceMatcher;

impl DistanceMatcher {
    fn distance(live: &Fingerprint, persisted: &Fingerprint, ignore_disabled_aps: bool) -> f64 {
        let keys: HashSet<&String> = live.keys().chain(persisted.keys()).collect();
        keys.into_iter()
            .filter(|id| !ignore_disabled_aps || live.contains(id))
            .map(|id| {
                let a = live.strength(id).unwrap_or(MISSING_STRENGTH);
                let b = persisted.strength(id).unwrap_or(MISSING_STRENGTH);
                (a - b).powi(2)
            })
            .sum::<f64>()
            .sqrt()
    }
}

impl Matcher for DistanceMatcher {
    fn nearest_neighbour(
        &self,
        caching_manager: &mut dyn CachingManager,
        fingerprint: Fingerprint,
        persisted_positions: &[PositionInformation],
        ignore_disabled_aps: bool,
    ) -> CandidateScores {
        caching_manager.add_data(fingerprint);
        let interpolated = caching_manager.interpolate_data();

        let mut scores = CandidateScores::new();
        for position in persisted_positions {
            let distance = Self::distance(&interpolated, &position.fingerprint, ignore_disabled_aps);
            tracing::trace!(position = %position.name, distance, "distance match");
            scores.insert(position.clone(), distance);
        }
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::BalanceCachingManager;

    fn persisted_positions() -> Vec<PositionInformation> {
        vec![
            PositionInformation::new(
                "1.",
                Fingerprint::from_pairs(vec![("A", -60.0), ("B", -50.0), ("C", -70.0)]),
            ),
            PositionInformation::new(
                "2.",
                Fingerprint::from_pairs(vec![("A", -50.0), ("B", -60.0), ("C", -70.0)]),
            ),
            PositionInformation::new(
                "3.",
                Fingerprint::from_pairs(vec![("A", -80.0), ("B", -60.0), ("C", -50.0)]),
            ),
        ]
    }

    #[test]
    fn test_order_matcher_reference_scenarios() {
        let positions = persisted_positions();
        let mut caching = BalanceCachingManager::new();
        let matcher = OrderMatcher;

        let live = Fingerprint::from_pairs(vec![("A", -60.0), ("B", -50.0), ("C", -80.0)]);
        let scores = matcher.nearest_neighbour(&mut caching, live, &positions, false);
        assert_eq!(scores.get("1."), Some(0.0));
        assert_eq!(scores.get("2."), Some(2.0));
        assert_eq!(scores.get("3."), Some(3.0));

        let live = Fingerprint::from_pairs(vec![("A", -10.0), ("B", -50.0), ("C", -70.0)]);
        let scores = matcher.nearest_neighbour(&mut caching, live, &positions, false);
        assert_eq!(scores.get("1."), Some(2.0));
        assert_eq!(scores.get("2."), Some(0.0));
        assert_eq!(scores.get("3."), Some(2.0));

        let live = Fingerprint::from_pairs(vec![("A", -50.0), ("B", -10.0), ("C", -30.0)]);
        let scores = matcher.nearest_neighbour(&mut caching, live, &positions, false);
        assert_eq!(scores.get("1."), Some(2.0));
        assert_eq!(scores.get("2."), Some(3.0));
        assert_eq!(scores.get("3."), Some(2.0));
    }

    #[test]
    fn test_order_matcher_empty_live_scores_zero() {
        let mut caching = BalanceCachingManager::new();
        let scores =
            OrderMatcher.nearest_neighbour(&mut caching, Fingerprint::new(), &persisted_positions(), false);
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|(_, score)| score == 0.0));
    }

    #[test]
    fn test_order_matcher_empty_candidate_scores_live_length() {
        let mut caching = BalanceCachingManager::new();
        let positions = vec![PositionInformation::new("empty", Fingerprint::new())];
        let live = Fingerprint::from_pairs(vec![("A", -60.0), ("B", -50.0)]);
        let scores = OrderMatcher.nearest_neighbour(&mut caching, live, &positions, false);
        assert_eq!(scores.get("empty"), Some(2.0));
    }

    #[test]
    fn test_order_matcher_ignores_disabled_flag() {
        let positions = persisted_positions();
        let live = Fingerprint::from_pairs(vec![("A", -60.0), ("B", -50.0), ("C", -80.0)]);
        let a = OrderMatcher.nearest_neighbour(&mut BalanceCachingManager::new(), live.clone(), &positions, false);
        let b = OrderMatcher.nearest_neighbour(&mut BalanceCachingManager::new(), live, &positions, true);
        assert_eq!(a, b);
    }

    #[test]
    fn test_distance_matcher_identical_is_zero() {
        let positions = persisted_positions();
        let live = positions[1].fingerprint.clone();
        let scores = DistanceMatcher.nearest_neighbour(&mut BalanceCachingManager::new(), live, &positions, false);
        assert_eq!(scores.get("2."), Some(0.0));
        assert_eq!(scores.best().map(|(p, _)| p.name.as_str()), Some("2."));
    }

    #[test]
    fn test_distance_matcher_missing_keys() {
        let positions = vec![PositionInformation::new(
            "p",
            Fingerprint::from_pairs(vec![("A", -60.0), ("B", -70.0)]),
        )];
        let live = Fingerprint::from_pairs(vec![("A", -60.0)]);

        let scores = DistanceMatcher.nearest_neighbour(&mut BalanceCachingManager::new(), live.clone(), &positions, false);
        assert_eq!(scores.get("p"), Some(30.0));

        let scores = DistanceMatcher.nearest_neighbour(&mut BalanceCachingManager::new(), live, &positions, true);
        assert_eq!(scores.get("p"), Some(0.0));
    }
}
