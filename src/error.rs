//! 错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("广播数据格式错误: 长度 {len} 字节, 至少需要 {required} 字节")]
    MalformedAdvertisement { len: usize, required: usize },

    #[error("无效的信标标识: {0}")]
    InvalidIdentifier(String),

    #[error("无效的十六进制字段: {0}")]
    InvalidHex(String),

    #[error("无效的有效期: {0} 秒")]
    InvalidValidity(i64),

    #[error("配置解析失败: {0}")]
    Config(#[from] serde_json::Error),

    #[error("正则表达式编译失败: {0}")]
    Pattern(#[from] regex::Error),

    #[error("蓝牙错误: {0}")]
    Bluetooth(#[from] btleplug::Error),

    #[error("未找到蓝牙适配器")]
    NoAdapter,
}

pub type Result<T> = std::result::Result<T, Error>;
