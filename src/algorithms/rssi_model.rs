/// RSSI 到距离转换模型
///
/// 对数路径损耗模型：RSSI(d) = A + B * log10(d)，d 以米为单位

/// 路径损耗模型
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathLossModel {
    /// 截距 A (dBm) - 1 米处的参考功率
    pub a: f64,
    /// 斜率 B - 衰减速率（应为负数）
    pub b: f64,
}

impl PathLossModel {
    /// 自由空间模型（B = -20），以信标广播的校准功率为 A
    ///
    /// 反解即 d = 10^((txPower - RSSI) / 20)
    pub fn free_space(tx_power: i16) -> Self {
        PathLossModel {
            a: tx_power as f64,
            b: -20.0,
        }
    }

    /// 反解对数距离模型: d = 10^((RSSI - A) / B)
    pub fn rssi_to_distance(&self, rssi: i16) -> f64 {
        let exponent = (rssi as f64 - self.a) / self.b;
        10_f64.powf(exponent)
    }
}
