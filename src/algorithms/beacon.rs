/// 蓝牙信标广播解析与距离估计
///
/// 广播数据按固定字节偏移提取（iBeacon 格式）：
/// - 5..=6   公司 ID
/// - 9..=24  16 字节 UUID
/// - 25..=26 major（大端）
/// - 27..=28 minor（大端）
/// - 29      校准发射功率（有符号）

use crate::algorithms::PathLossModel;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

const COMPANY_ID_OFFSET: usize = 5;
const UUID_RANGE: std::ops::RangeInclusive<usize> = 9..=24;
const MAJOR_OFFSET: usize = 25;
const MINOR_OFFSET: usize = 27;
const TX_POWER_OFFSET: usize = 29;

/// 广播数据的最小长度
pub const MIN_RECORD_LEN: usize = TX_POWER_OFFSET + 1;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\|(\d+)$").expect("valid identifier pattern"));

// ============================================================================
// 距离类别
// ============================================================================

/// 距离类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceCategory {
    Unknown,
    /// <= 0.5 米
    Immediate,
    /// <= 2 米
    Near,
    /// <= 30 米
    Far,
}

impl DistanceCategory {
    /// 按阈值分类（依次判断，首个满足的类别胜出）
    pub fn from_distance(distance: f64) -> Self {
        if distance <= 0.5 {
            DistanceCategory::Immediate
        } else if distance <= 2.0 {
            DistanceCategory::Near
        } else if distance <= 30.0 {
            DistanceCategory::Far
        } else {
            DistanceCategory::Unknown
        }
    }

    /// 类别的数值表示（作为指纹值使用）
    pub fn value(self) -> f64 {
        match self {
            DistanceCategory::Unknown => 0.0,
            DistanceCategory::Immediate => 1.0,
            DistanceCategory::Near => 2.0,
            DistanceCategory::Far => 3.0,
        }
    }
}

// ============================================================================
// 原始字段
// ============================================================================

/// 已解码的原始广播字段
#[derive(Clone, Debug, Default)]
pub struct BeaconFields {
    pub name: String,
    pub address: String,
    /// 十六进制文本，例如 "4c00"
    pub company_id: String,
    /// 十六进制文本（32 个字符）
    pub uuid: String,
    pub rssi: i16,
    pub major: u16,
    pub minor: u16,
    pub tx_power: i16,
    pub timestamp: DateTime<Utc>,
}

impl BeaconFields {
    /// 以十六进制文本设置 major、minor 和发射功率
    ///
    /// 发射功率按单个有符号字节解释（"b7" -> -73），与 [`BeaconAdvertisement::parse`]
    /// 从原始字节读取的结果一致；不按无符号值 183 处理。
    pub fn with_hex_values(mut self, major: &str, minor: &str, tx_power: &str) -> Result<Self> {
        self.major = u16::from_str_radix(major, 16).map_err(|_| Error::InvalidHex(major.to_string()))?;
        self.minor = u16::from_str_radix(minor, 16).map_err(|_| Error::InvalidHex(minor.to_string()))?;
        self.tx_power = u8::from_str_radix(tx_power, 16)
            .map_err(|_| Error::InvalidHex(tx_power.to_string()))? as i8 as i16;
        Ok(self)
    }
}

// ============================================================================
// 信标广播记录
// ============================================================================

/// 一条信标广播记录，构造后不可变
///
/// 距离与距离类别在构造时计算一次。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BeaconAdvertisement {
    name: String,
    address: String,
    company_id: String,
    uuid: String,
    uuid_text: Option<String>,
    rssi: i16,
    major: u16,
    minor: u16,
    tx_power: i16,
    timestamp: DateTime<Utc>,
    distance: f64,
    distance_category: DistanceCategory,
}

impl BeaconAdvertisement {
    /// 从已解码字段创建
    pub fn from_fields(fields: BeaconFields) -> Self {
        let distance = PathLossModel::free_space(fields.tx_power).rssi_to_distance(fields.rssi);
        BeaconAdvertisement {
            uuid_text: hex_to_ascii(&fields.uuid),
            name: fields.name,
            address: fields.address,
            company_id: fields.company_id,
            uuid: fields.uuid,
            rssi: fields.rssi,
            major: fields.major,
            minor: fields.minor,
            tx_power: fields.tx_power,
            timestamp: fields.timestamp,
            distance,
            distance_category: DistanceCategory::from_distance(distance),
        }
    }

    /// 按固定偏移解析原始广播数据
    ///
    /// 数据长度不足时返回 [`Error::MalformedAdvertisement`]
    pub fn parse(
        record: &[u8],
        rssi: i16,
        name: Option<&str>,
        address: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if record.len() < MIN_RECORD_LEN {
            return Err(Error::MalformedAdvertisement {
                len: record.len(),
                required: MIN_RECORD_LEN,
            });
        }

        let company_id = format!(
            "{:02x}{:02x}",
            record[COMPANY_ID_OFFSET],
            record[COMPANY_ID_OFFSET + 1]
        );
        let uuid: String = record[UUID_RANGE].iter().map(|b| format!("{:02x}", b)).collect();
        let major = u16::from_be_bytes([record[MAJOR_OFFSET], record[MAJOR_OFFSET + 1]]);
        let minor = u16::from_be_bytes([record[MINOR_OFFSET], record[MINOR_OFFSET + 1]]);
        let tx_power = record[TX_POWER_OFFSET] as i8 as i16;

        Ok(Self::from_fields(BeaconFields {
            name: name.unwrap_or_default().to_string(),
            address: address.unwrap_or_default().to_string(),
            company_id,
            uuid,
            rssi,
            major,
            minor,
            tx_power,
            timestamp,
        }))
    }

    /// 去重/查找用的标识："{major}|{minor}"
    pub fn identifier(&self) -> String {
        format!("{}|{}", self.major, self.minor)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// UUID 的 ASCII 文本（去除首尾空白）
    pub fn uuid_text(&self) -> Option<&str> {
        self.uuid_text.as_deref()
    }

    pub fn rssi(&self) -> i16 {
        self.rssi
    }

    pub fn major(&self) -> u16 {
        self.major
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }

    pub fn tx_power(&self) -> i16 {
        self.tx_power
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// 估计距离（米）
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn distance_category(&self) -> DistanceCategory {
        self.distance_category
    }

    /// 仅按 RSSI 比较（升序）
    pub fn cmp_rssi(&self, other: &Self) -> Ordering {
        self.rssi.cmp(&other.rssi)
    }
}

impl fmt::Display for BeaconAdvertisement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "信标 {} @ {} (RSSI: {} dBm, 距离: {:.2} m, {:?})",
            self.identifier(),
            self.address,
            self.rssi,
            self.distance,
            self.distance_category
        )
    }
}

// ============================================================================
// 标识转换
// ============================================================================

/// 解析 "major|minor" 标识
pub fn parse_identifier(id: &str) -> Result<(u16, u16)> {
    let captures = IDENTIFIER_PATTERN
        .captures(id)
        .ok_or_else(|| Error::InvalidIdentifier(id.to_string()))?;
    let major = captures[1]
        .parse()
        .map_err(|_| Error::InvalidIdentifier(id.to_string()))?;
    let minor = captures[2]
        .parse()
        .map_err(|_| Error::InvalidIdentifier(id.to_string()))?;
    Ok((major, minor))
}

/// 将 major、minor 合并为一个易读的编号
///
/// 二进制拼接：major（至少 3 位）后接 minor（至少 6 位）
pub fn major_minor_to_number(major: u16, minor: u16) -> u32 {
    let minor_bits = (u16::BITS - minor.leading_zeros()).max(6);
    ((major as u32) << minor_bits) | minor as u32
}

/// 将 "major|minor" 标识转换为编号
pub fn id_to_number(id: &str) -> Result<u32> {
    let (major, minor) = parse_identifier(id)?;
    Ok(major_minor_to_number(major, minor))
}

fn hex_to_ascii(hex: &str) -> Option<String> {
    if hex.is_empty() {
        return None;
    }
    let text: String = hex
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .filter_map(|pair| u8::from_str_radix(pair, 16).ok())
        .map(char::from)
        .collect();
    Some(text.trim_matches(|c: char| c <= ' ').to_string())
}
