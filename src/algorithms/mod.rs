/// 指纹定位算法模块
///
/// 该模块提供室内指纹定位的核心算法：
/// - 指纹缓存与平滑（均衡平均、卡尔曼）
/// - 可插拔匹配策略（秩序匹配、欧氏距离匹配）
/// - 排除过滤（罗盘角度）与地理半径评分
/// - 蓝牙信标广播解析与距离估计

pub mod signal;
pub mod caching;
pub mod matcher;
pub mod exclusion;
pub mod geo;
pub mod rssi_model;
pub mod beacon;
pub mod results;

pub use signal::*;
pub use caching::*;
pub use matcher::*;
pub use exclusion::*;
pub use geo::*;
pub use rssi_model::*;
pub use beacon::*;
pub use results::*;
