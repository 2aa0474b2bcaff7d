//! 室内指纹定位核心
//!
//! 将异步、带噪声的原始信号读数（Wi-Fi、蓝牙信标、GPS、罗盘）平滑为指纹，
//! 再与参考位置库比对，输出候选位置的分数或过滤结果。
//!
//! - [`algorithms`]：指纹数据结构、缓存平滑、匹配与排除策略、信标解析
//! - [`technology`]：把信号来源与策略绑定的定位技术
//! - [`config`]：以 JSON 配置构建技术实例
//! - [`scanner`]：基于 btleplug 的蓝牙广播采集桥接

pub mod algorithms;
pub mod config;
pub mod error;
pub mod scanner;
pub mod technology;

pub use error::{Error, Result};
