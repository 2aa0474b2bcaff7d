/// GPS 区域技术
///
/// 参考位置以 lat/lng 记录坐标，保留当前位置一定半径内的候选位置。

use crate::algorithms::{CandidateScores, Fingerprint, GeoPoint, GeoRadius, PositionInformation};
use crate::technology::{Technology, lock};
use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// 定位数据的最长有效时间
pub const GPS_TIME_DELTA: Duration = Duration::seconds(10);

#[derive(Clone, Copy, Debug)]
struct Fix {
    point: GeoPoint,
    timestamp: DateTime<Utc>,
}

pub struct GpsTechnology {
    name: String,
    radius: GeoRadius,
    fix: Mutex<Option<Fix>>,
}

impl GpsTechnology {
    /// `max_distance` 为区域半径（米）
    pub fn new(name: impl Into<String>, max_distance: f64) -> Self {
        GpsTechnology {
            name: name.into(),
            radius: GeoRadius::new(max_distance),
            fix: Mutex::new(None),
        }
    }

    /// 位置服务回调
    pub fn set_location(&self, lat: f64, lng: f64, timestamp: DateTime<Utc>) {
        *lock(&self.fix) = Some(Fix {
            point: GeoPoint::new(lat, lng),
            timestamp,
        });
    }

    /// 位置服务不可用时清除当前位置
    pub fn clear_location(&self) {
        *lock(&self.fix) = None;
    }

    /// 在 `now` 时刻打分；没有位置或位置已过期时返回 None
    pub fn match_positions_at(
        &self,
        persisted_positions: &[PositionInformation],
        now: DateTime<Utc>,
    ) -> Option<CandidateScores> {
        let mut fix = lock(&self.fix);
        if let Some(current) = *fix {
            if current.timestamp + GPS_TIME_DELTA < now {
                tracing::debug!(technology = %self.name, "gps fix is stale");
                *fix = None;
            }
        }
        let current = (*fix)?;
        drop(fix);
        Some(self.radius.score(&current.point, persisted_positions))
    }
}

impl Technology for GpsTechnology {
    fn name(&self) -> &str {
        &self.name
    }

    fn signal_data(&self) -> Fingerprint {
        lock(&self.fix)
            .map(|fix| fix.point.to_fingerprint())
            .unwrap_or_default()
    }

    fn match_positions(&self, persisted_positions: &[PositionInformation]) -> Option<CandidateScores> {
        self.match_positions_at(persisted_positions, Utc::now())
    }
}
