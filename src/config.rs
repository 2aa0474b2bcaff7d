//! 定位技术配置
//!
//! 以 JSON 描述要启用的技术及其缓存/匹配策略，例如：
//!
//! ```json
//! { "technologies": [
//!     { "kind": "wifi", "name": "WIFI", "matcher": "distance" },
//!     { "kind": "ble", "name": "BLE", "policy": "strength", "validity_seconds": 5 },
//!     { "kind": "compass", "name": "COMPASS", "allowed_angle": 60.0 },
//!     { "kind": "gps", "name": "GPS", "max_distance": 10.0 }
//! ] }
//! ```

use crate::algorithms::{CachingKind, MatcherKind};
use crate::error::{Error, Result};
use crate::technology::{
    AdmissionFilter, BlePolicy, BleTechnology, CompassTechnology, DEFAULT_BLE_CACHE_SIZE,
    GpsTechnology, Technology, TechnologyBinding, WifiTechnology,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 缓存/匹配策略
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// 缓存容量，缺省时使用技术的默认值
    #[serde(default)]
    pub cache_size: Option<usize>,
    #[serde(default)]
    pub caching: CachingKind,
    #[serde(default)]
    pub matcher: MatcherKind,
    #[serde(default)]
    pub ignore_disabled_aps: bool,
}

impl StrategyConfig {
    fn binding(&self, default_cache_size: usize) -> TechnologyBinding {
        let capacity = self.cache_size.unwrap_or(default_cache_size);
        TechnologyBinding::new(self.caching.build(capacity), self.matcher.build())
            .with_ignore_disabled_aps(self.ignore_disabled_aps)
    }
}

/// 蓝牙准入条件覆盖项；未设置的字段沿用策略默认值
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default)]
    pub allowed_uuids: Option<Vec<String>>,
    #[serde(default)]
    pub uuid_text: Option<String>,
    #[serde(default)]
    pub min_rssi: Option<i16>,
    #[serde(default)]
    pub name_pattern: Option<String>,
}

impl AdmissionConfig {
    fn build(&self, policy: BlePolicy) -> Result<AdmissionFilter> {
        let mut filter = AdmissionFilter::for_policy(policy);
        if let Some(company_id) = &self.company_id {
            filter.company_id = Some(company_id.clone());
        }
        if let Some(uuids) = &self.allowed_uuids {
            filter = filter.with_allowed_uuids(uuids.clone());
        }
        if let Some(text) = &self.uuid_text {
            filter.uuid_text = Some(text.clone());
        }
        if let Some(min_rssi) = self.min_rssi {
            filter.min_rssi = Some(min_rssi);
        }
        if let Some(pattern) = &self.name_pattern {
            filter = filter.with_name_pattern(pattern)?;
        }
        Ok(filter)
    }
}

fn default_validity_seconds() -> i64 {
    5
}

/// 有效期必须非负且能表示为时长
fn validity(seconds: i64) -> Result<Duration> {
    if seconds < 0 {
        return Err(Error::InvalidValidity(seconds));
    }
    Duration::try_seconds(seconds).ok_or(Error::InvalidValidity(seconds))
}

/// 单个技术的配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TechnologyConfig {
    Wifi {
        name: String,
        #[serde(default)]
        whitelist: Option<Vec<String>>,
        #[serde(flatten)]
        strategy: StrategyConfig,
    },
    Ble {
        name: String,
        policy: BlePolicy,
        #[serde(default = "default_validity_seconds")]
        validity_seconds: i64,
        #[serde(default)]
        admission: AdmissionConfig,
        #[serde(flatten)]
        strategy: StrategyConfig,
    },
    Compass {
        name: String,
        allowed_angle: f64,
    },
    Gps {
        name: String,
        max_distance: f64,
    },
}

/// 构建好的技术实例
#[derive(Clone)]
pub enum AnyTechnology {
    Wifi(Arc<WifiTechnology>),
    Ble(Arc<BleTechnology>),
    Compass(Arc<CompassTechnology>),
    Gps(Arc<GpsTechnology>),
}

impl AnyTechnology {
    pub fn as_technology(&self) -> &dyn Technology {
        match self {
            AnyTechnology::Wifi(t) => t.as_ref(),
            AnyTechnology::Ble(t) => t.as_ref(),
            AnyTechnology::Compass(t) => t.as_ref(),
            AnyTechnology::Gps(t) => t.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        self.as_technology().name()
    }
}

impl TechnologyConfig {
    pub fn build(&self) -> Result<AnyTechnology> {
        let technology = match self {
            TechnologyConfig::Wifi {
                name,
                whitelist,
                strategy,
            } => AnyTechnology::Wifi(Arc::new(
                WifiTechnology::new(name.clone(), whitelist.clone()).with_binding(strategy.binding(1)),
            )),
            TechnologyConfig::Ble {
                name,
                policy,
                validity_seconds,
                admission,
                strategy,
            } => AnyTechnology::Ble(Arc::new(
                BleTechnology::new(name.clone(), *policy, validity(*validity_seconds)?)
                    .with_admission(admission.build(*policy)?)
                    .with_binding(strategy.binding(DEFAULT_BLE_CACHE_SIZE)),
            )),
            TechnologyConfig::Compass {
                name,
                allowed_angle,
            } => AnyTechnology::Compass(Arc::new(CompassTechnology::new(name.clone(), *allowed_angle))),
            TechnologyConfig::Gps { name, max_distance } => {
                AnyTechnology::Gps(Arc::new(GpsTechnology::new(name.clone(), *max_distance)))
            }
        };
        tracing::debug!(technology = %technology.name(), "technology built");
        Ok(technology)
    }
}

/// 顶层配置
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositioningConfig {
    pub technologies: Vec<TechnologyConfig>,
}

impl PositioningConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn build(&self) -> Result<Vec<AnyTechnology>> {
        self.technologies.iter().map(TechnologyConfig::build).collect()
    }
}
