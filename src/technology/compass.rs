/// 罗盘排除技术
///
/// 不对候选位置排序，只剔除参考方位与当前方位偏差超出允许角度的位置。

use crate::algorithms::{
    AngularExclusion, CandidateScores, ExclusionFilter, Fingerprint, PositionInformation,
};
use crate::technology::{Technology, lock};
use std::sync::Mutex;

/// 方位读数的指纹键
pub const COMPASS_KEY: &str = "compassSignal";

pub struct CompassTechnology {
    name: String,
    /// 半宽（允许角度的一半）
    allowed_delta: f64,
    bearing: Mutex<Option<f64>>,
    filter: Box<dyn ExclusionFilter>,
}

impl CompassTechnology {
    /// `allowed_angle` 为完整的允许角度，窗口为参考方位两侧各一半
    pub fn new(name: impl Into<String>, allowed_angle: f64) -> Self {
        CompassTechnology {
            name: name.into(),
            allowed_delta: allowed_angle / 2.0,
            bearing: Mutex::new(None),
            filter: Box::new(AngularExclusion),
        }
    }

    pub fn with_filter(mut self, filter: Box<dyn ExclusionFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn allowed_delta(&self) -> f64 {
        self.allowed_delta
    }

    /// 方向传感器回调
    pub fn set_bearing(&self, bearing: f64) {
        *lock(&self.bearing) = Some(bearing);
    }

    /// 候选位置是否被排除；没有记录方位的位置不排除
    pub fn is_excluded(&self, position: &PositionInformation) -> bool {
        let Some(reference) = position.fingerprint.strength(COMPASS_KEY) else {
            return false;
        };
        self.filter
            .is_out_of_range(&self.signal_data(), reference, self.allowed_delta)
    }
}

impl Technology for CompassTechnology {
    fn name(&self) -> &str {
        &self.name
    }

    fn signal_data(&self) -> Fingerprint {
        let bearing = *lock(&self.bearing);
        Fingerprint::from_pairs(bearing.map(|value| (COMPASS_KEY, value)))
    }

    /// 返回未被排除的候选位置，分数均为 0
    fn match_positions(&self, persisted_positions: &[PositionInformation]) -> Option<CandidateScores> {
        Some(
            persisted_positions
                .iter()
                .filter(|position| {
                    let excluded = self.is_excluded(position);
                    if excluded {
                        tracing::trace!(position = %position.name, "excluded by compass");
                    }
                    !excluded
                })
                .map(|position| (position.clone(), 0.0))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(name: &str, bearing: f64) -> PositionInformation {
        PositionInformation::new(name, Fingerprint::from_pairs(vec![(COMPASS_KEY, bearing)]))
    }

    #[test]
    fn test_allowed_angle_is_halved() {
        let compass = CompassTechnology::new("COMPASS", 60.0);
        assert_eq!(compass.allowed_delta(), 30.0);
    }

    #[test]
    fn test_reference_bearings() {
        let compass = CompassTechnology::new("COMPASS", 60.0);
        compass.set_bearing(50.0);
        assert!(!compass.is_excluded(&position("a", 80.0)));
        assert!(compass.is_excluded(&position("b", 81.0)));
        assert!(!compass.is_excluded(&position("c", 20.0)));
        assert!(compass.is_excluded(&position("d", 19.0)));
    }

    #[test]
    fn test_match_keeps_in_range_and_unrecorded() {
        let compass = CompassTechnology::new("COMPASS", 60.0);
        compass.set_bearing(50.0);
        let positions = vec![
            position("in", 80.0),
            position("out", 81.0),
            PositionInformation::new("unrecorded", Fingerprint::new()),
        ];
        let scores = compass.match_positions(&positions).unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores.get("in"), Some(0.0));
        assert!(scores.contains("unrecorded"));
        assert!(!scores.contains("out"));
    }

    #[test]
    fn test_no_bearing_excludes_nothing() {
        let compass = CompassTechnology::new("COMPASS", 60.0);
        assert!(compass.signal_data().is_empty());
        assert!(!compass.is_excluded(&position("a", 200.0)));
    }
}
