/// 地理半径评分
///
/// 按实时经纬度与参考位置之间的大圆距离筛选候选位置

use crate::algorithms::{CandidateScores, Fingerprint, PositionInformation};

/// 纬度键
pub const LAT_KEY: &str = "lat";
/// 经度键
pub const LNG_KEY: &str = "lng";

/// 地球平均半径（米）
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// 经纬度坐标（度）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        GeoPoint { lat, lng }
    }

    /// 从含有 lat/lng 键的指纹中读取坐标
    pub fn from_fingerprint(fingerprint: &Fingerprint) -> Option<Self> {
        Some(GeoPoint::new(
            fingerprint.strength(LAT_KEY)?,
            fingerprint.strength(LNG_KEY)?,
        ))
    }

    pub fn to_fingerprint(self) -> Fingerprint {
        Fingerprint::from_pairs(vec![(LAT_KEY, self.lat), (LNG_KEY, self.lng)])
    }

    /// Haversine 大圆距离（米）
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// 半径过滤器：保留距离不超过 `max_distance` 的候选位置，分数为距离（米）
#[derive(Clone, Copy, Debug)]
pub struct GeoRadius {
    pub max_distance: f64,
}

impl GeoRadius {
    pub fn new(max_distance: f64) -> Self {
        GeoRadius { max_distance }
    }

    /// 缺少经纬度的候选位置被跳过
    pub fn score(&self, location: &GeoPoint, persisted_positions: &[PositionInformation]) -> CandidateScores {
        let mut scores = CandidateScores::new();
        for position in persisted_positions {
            let Some(point) = GeoPoint::from_fingerprint(&position.fingerprint) else {
                tracing::debug!(position = %position.name, "position has no coordinates");
                continue;
            };
            let distance = location.distance_to(&point);
            if distance <= self.max_distance {
                scores.insert(position.clone(), distance);
            }
        }
        scores
    }
}
