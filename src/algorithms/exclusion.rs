/// 排除过滤器
///
/// 与匹配器不同，排除过滤器不打分，只对候选位置做接受/拒绝判断。

use crate::algorithms::Fingerprint;

/// 排除策略接口
pub trait ExclusionFilter: Send + Sync {
    /// 任一实时读数不在 `reference ± allowed_delta` 范围内时返回 true（排除）
    fn is_out_of_range(&self, readings: &Fingerprint, reference: f64, allowed_delta: f64) -> bool;
}

/// 角度排除过滤器（罗盘方位，定义域 [0, 360)）
///
/// 窗口跨越 0/360 边界时（min > max），读数满足 `>= min` 或 `<= max` 即在范围内。
///
/// 下界在 `min <= 0` 时按 `360 - min` 回绕；当 `min` 为负时结果会超出 360，
/// 此行为与历史参考数据保持一致，暂不修正。
#[derive(Clone, Copy, Debug, Default)]
pub struct AngularExclusion;

impl AngularExclusion {
    /// 计算回绕后的 (min, max) 窗口
    pub fn window(reference: f64, allowed_delta: f64) -> (f64, f64) {
        let mut min = reference - allowed_delta;
        let mut max = reference + allowed_delta;
        if max >= 360.0 {
            max -= 360.0;
        }
        if min <= 0.0 {
            min = 360.0 - min;
        }
        (min, max)
    }

    fn in_range(value: f64, min: f64, max: f64) -> bool {
        if min > max {
            value >= min || value <= max
        } else {
            value >= min && value <= max
        }
    }
}

impl ExclusionFilter for AngularExclusion {
    fn is_out_of_range(&self, readings: &Fingerprint, reference: f64, allowed_delta: f64) -> bool {
        let (min, max) = Self::window(reference, allowed_delta);
        readings
            .iter()
            .any(|(_, signal)| !Self::in_range(signal.strength, min, max))
    }
}
