/// Wi-Fi 指纹定位技术
///
/// 扫描结果由外部采集方推入，接入点以 BSSID 为键。

use crate::algorithms::{
    BalanceCachingManager, CandidateScores, DistanceMatcher, Fingerprint, PositionInformation,
};
use crate::technology::{Technology, TechnologyBinding, lock};
use std::sync::Mutex;

pub struct WifiTechnology {
    name: String,
    /// 接入点白名单，None 表示全部允许
    whitelist: Option<Vec<String>>,
    last_scan: Mutex<Fingerprint>,
    binding: TechnologyBinding,
}

impl WifiTechnology {
    /// 默认使用均衡缓存（容量 1）与欧氏距离匹配
    pub fn new(name: impl Into<String>, whitelist: Option<Vec<String>>) -> Self {
        WifiTechnology {
            name: name.into(),
            whitelist,
            last_scan: Mutex::new(Fingerprint::new()),
            binding: TechnologyBinding::new(
                Box::new(BalanceCachingManager::new()),
                Box::new(DistanceMatcher),
            ),
        }
    }

    pub fn with_binding(mut self, binding: TechnologyBinding) -> Self {
        self.binding = binding;
        self
    }

    /// 记录一次扫描结果（替换上一次扫描）
    pub fn record_scan<K: Into<String>>(&self, results: impl IntoIterator<Item = (K, f64)>) {
        let mut scan = Fingerprint::from_pairs(results);
        if let Some(whitelist) = &self.whitelist {
            scan.retain_keys(whitelist);
        }
        tracing::trace!(technology = %self.name, access_points = scan.len(), "wifi scan recorded");
        *lock(&self.last_scan) = scan;
    }
}

impl Technology for WifiTechnology {
    fn name(&self) -> &str {
        &self.name
    }

    fn signal_data(&self) -> Fingerprint {
        lock(&self.last_scan).clone()
    }

    fn match_positions(&self, persisted_positions: &[PositionInformation]) -> Option<CandidateScores> {
        Some(self.binding.match_fingerprint(self.signal_data(), persisted_positions))
    }
}
