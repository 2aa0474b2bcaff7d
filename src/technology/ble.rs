/// 蓝牙信标定位技术
///
/// 三种策略共享同一个"最近一次观测"存储：
/// - Strength：每个信标的原始 RSSI 作为指纹值
/// - ProximityCategory：只输出处于 Immediate 类别的信标，值为类别数值
/// - Strongest：有效期内 RSSI 最强的单个信标，值恒为 1.0

use crate::algorithms::{
    BalanceCachingManager, BeaconAdvertisement, CandidateScores, DistanceCategory, Fingerprint,
    OrderMatcher, PositionInformation,
};
use crate::error::Result;
use crate::technology::{BeaconStore, Technology, TechnologyBinding};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 苹果公司 ID（iBeacon）
pub const APPLE_COMPANY_ID: &str = "4c00";
/// 定位信标 UUID 的文本内容
pub const POSITIONING_UUID_TEXT: &str = "Ind.Positioning";
/// Strength 策略默认的最低 RSSI（不含）
pub const STRENGTH_MIN_RSSI: i16 = -80;
/// 蓝牙技术默认缓存大小
pub const DEFAULT_BLE_CACHE_SIZE: usize = 5;

/// 信标输出策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlePolicy {
    Strength,
    ProximityCategory,
    Strongest,
}

// ============================================================================
// 准入过滤
// ============================================================================

/// 广播准入过滤条件，所有已设置的条件都必须满足
#[derive(Clone, Debug, Default)]
pub struct AdmissionFilter {
    pub company_id: Option<String>,
    /// UUID 白名单（十六进制文本），None 表示全部允许
    pub allowed_uuids: Option<Vec<String>>,
    pub uuid_text: Option<String>,
    /// RSSI 必须严格大于该值
    pub min_rssi: Option<i16>,
    /// 设备名称正则
    pub name_pattern: Option<Regex>,
}

impl AdmissionFilter {
    /// 不做任何过滤
    pub fn allow_all() -> Self {
        AdmissionFilter::default()
    }

    /// 各策略的默认准入条件
    pub fn for_policy(policy: BlePolicy) -> Self {
        match policy {
            BlePolicy::Strength => AdmissionFilter {
                company_id: Some(APPLE_COMPANY_ID.to_string()),
                min_rssi: Some(STRENGTH_MIN_RSSI),
                ..Default::default()
            },
            BlePolicy::ProximityCategory | BlePolicy::Strongest => AdmissionFilter {
                uuid_text: Some(POSITIONING_UUID_TEXT.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn with_allowed_uuids(mut self, allowed_uuids: Vec<String>) -> Self {
        self.allowed_uuids = Some(allowed_uuids);
        self
    }

    /// 按设备名称正则过滤
    pub fn with_name_pattern(mut self, pattern: &str) -> Result<Self> {
        self.name_pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn admits(&self, beacon: &BeaconAdvertisement) -> bool {
        if let Some(company_id) = &self.company_id {
            if beacon.company_id() != company_id {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed_uuids {
            if !allowed.iter().any(|uuid| uuid == beacon.uuid()) {
                return false;
            }
        }
        if let Some(text) = &self.uuid_text {
            if beacon.uuid_text() != Some(text.as_str()) {
                return false;
            }
        }
        if let Some(min_rssi) = self.min_rssi {
            if beacon.rssi() <= min_rssi {
                return false;
            }
        }
        if let Some(pattern) = &self.name_pattern {
            if !pattern.is_match(beacon.name()) {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// 蓝牙技术
// ============================================================================

/// 蓝牙信标技术
pub struct BleTechnology {
    name: String,
    policy: BlePolicy,
    admission: AdmissionFilter,
    store: BeaconStore,
    binding: TechnologyBinding,
}

impl BleTechnology {
    /// 使用策略默认准入条件、均衡缓存（容量 5）与秩序匹配创建
    pub fn new(name: impl Into<String>, policy: BlePolicy, validity: Duration) -> Self {
        BleTechnology {
            name: name.into(),
            policy,
            admission: AdmissionFilter::for_policy(policy),
            store: BeaconStore::new(validity),
            binding: TechnologyBinding::new(
                Box::new(BalanceCachingManager::with_capacity(DEFAULT_BLE_CACHE_SIZE)),
                Box::new(OrderMatcher),
            ),
        }
    }

    pub fn with_admission(mut self, admission: AdmissionFilter) -> Self {
        self.admission = admission;
        self
    }

    pub fn with_binding(mut self, binding: TechnologyBinding) -> Self {
        self.binding = binding;
        self
    }

    /// 注入外部存储（例如与另一种策略共享）
    pub fn with_store(mut self, store: BeaconStore) -> Self {
        self.store = store;
        self
    }

    pub fn policy(&self) -> BlePolicy {
        self.policy
    }

    pub fn store(&self) -> &BeaconStore {
        &self.store
    }

    /// 接收一条已解析的广播，返回是否被准入
    pub fn on_advertisement(&self, beacon: BeaconAdvertisement) -> bool {
        if !self.admission.admits(&beacon) {
            tracing::debug!(technology = %self.name, beacon = %beacon, "advertisement rejected");
            return false;
        }
        self.store.insert(beacon);
        true
    }

    /// 接收原始广播数据；格式错误时返回错误，调用方丢弃该条记录即可
    pub fn on_scan_record(
        &self,
        record: &[u8],
        rssi: i16,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Result<bool> {
        let beacon = BeaconAdvertisement::parse(record, rssi, name, address, Utc::now())?;
        Ok(self.on_advertisement(beacon))
    }

    /// 清除所有已收集的信标
    pub fn reset(&self) {
        self.store.clear();
        self.binding.clear_cache();
    }

    /// 计算 `now` 时刻的指纹
    pub fn signal_data_at(&self, now: DateTime<Utc>) -> Fingerprint {
        let beacons = self.store.valid_at(now);
        match self.policy {
            BlePolicy::Strength => Fingerprint::from_pairs(
                beacons.iter().map(|b| (b.identifier(), b.rssi() as f64)),
            ),
            BlePolicy::ProximityCategory => Fingerprint::from_pairs(
                beacons
                    .iter()
                    .filter(|b| b.distance_category() == DistanceCategory::Immediate)
                    .map(|b| (b.identifier(), b.distance_category().value())),
            ),
            // 已按 RSSI 从强到弱排序，第一个即最强
            BlePolicy::Strongest => {
                Fingerprint::from_pairs(beacons.first().map(|b| (b.identifier(), 1.0)))
            }
        }
    }
}

impl Technology for BleTechnology {
    fn name(&self) -> &str {
        &self.name
    }

    fn signal_data(&self) -> Fingerprint {
        self.signal_data_at(Utc::now())
    }

    /// Strongest 策略在没有有效信标时返回 None
    fn match_positions(&self, persisted_positions: &[PositionInformation]) -> Option<CandidateScores> {
        let fingerprint = self.signal_data();
        if self.policy == BlePolicy::Strongest && fingerprint.is_empty() {
            return None;
        }
        Some(self.binding.match_fingerprint(fingerprint, persisted_positions))
    }
}
