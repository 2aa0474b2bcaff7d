/// 指纹数据结构
///
/// 信号值、指纹（接入点 ID -> 信号值）以及持久化的参考位置

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

// ============================================================================
// 信号值
// ============================================================================

/// 单个标量测量值（RSSI、角度、经纬度等）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalInformation {
    pub strength: f64,
}

impl SignalInformation {
    pub fn new(strength: f64) -> Self {
        SignalInformation { strength }
    }
}

impl From<f64> for SignalInformation {
    fn from(strength: f64) -> Self {
        SignalInformation::new(strength)
    }
}

// ============================================================================
// 指纹
// ============================================================================

/// 一次扫描得到的指纹：接入点/信标 ID -> 信号值
///
/// 允许不完整（并非每次扫描都能看到所有接入点）
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint {
    signals: HashMap<String, SignalInformation>,
}

impl Fingerprint {
    /// 创建空指纹
    pub fn new() -> Self {
        Fingerprint {
            signals: HashMap::new(),
        }
    }

    /// 从 (id, 强度) 对创建
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, f64)>) -> Self {
        let mut fingerprint = Fingerprint::new();
        for (id, strength) in pairs {
            fingerprint.insert(id, strength);
        }
        fingerprint
    }

    /// 从 HashMap 创建
    pub fn from_hashmap(signals: HashMap<String, SignalInformation>) -> Self {
        Fingerprint { signals }
    }

    /// 插入或覆盖一个测量值
    pub fn insert(&mut self, id: impl Into<String>, strength: f64) {
        self.signals.insert(id.into(), SignalInformation::new(strength));
    }

    pub fn get(&self, id: &str) -> Option<&SignalInformation> {
        self.signals.get(id)
    }

    /// 获取强度值
    pub fn strength(&self, id: &str) -> Option<f64> {
        self.signals.get(id).map(|s| s.strength)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.signals.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SignalInformation)> {
        self.signals.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.signals.keys()
    }

    /// 只保留白名单中的键
    pub fn retain_keys(&mut self, whitelist: &[String]) {
        self.signals.retain(|id, _| whitelist.iter().any(|w| w == id));
    }

    /// 按信号强度升序排列的 ID 序列（排序结果即"秩序"）
    ///
    /// 强度相同时按 ID 字典序排列，保证结果可复现
    pub fn rank_order(&self) -> Vec<&str> {
        let mut entries: Vec<(&str, f64)> = self
            .signals
            .iter()
            .map(|(id, s)| (id.as_str(), s.strength))
            .collect();
        entries.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        entries.into_iter().map(|(id, _)| id).collect()
    }
}

impl FromIterator<(String, SignalInformation)> for Fingerprint {
    fn from_iter<I: IntoIterator<Item = (String, SignalInformation)>>(iter: I) -> Self {
        Fingerprint {
            signals: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// 参考位置
// ============================================================================

/// 持久化的参考点：名称 + 指纹
///
/// 由外部持久化层创建，匹配核心只读。身份即名称。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionInformation {
    pub name: String,
    pub fingerprint: Fingerprint,
}

impl PositionInformation {
    pub fn new(name: impl Into<String>, fingerprint: Fingerprint) -> Self {
        PositionInformation {
            name: name.into(),
            fingerprint,
        }
    }
}

impl PartialEq for PositionInformation {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PositionInformation {}

impl Hash for PositionInformation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// 以名称查找，与 `Hash`/`Eq` 一致
impl Borrow<str> for PositionInformation {
    fn borrow(&self) -> &str {
        &self.name
    }
}
