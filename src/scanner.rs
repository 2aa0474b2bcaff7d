//! 蓝牙广播采集桥接
//!
//! 通过 btleplug 扫描周边设备，把厂商数据还原为原始广播格式后送入
//! [`BleTechnology`]。格式错误的记录直接丢弃，扫描继续进行。
//!
//! btleplug 在设备停止广播后仍保留其最后一次的属性，轮询时只有厂商数据或
//! RSSI 与上一次不同才视为新的观测，否则离开范围的信标会被不断刷新时间戳。

use crate::error::{Error, Result};
use crate::technology::BleTechnology;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::Manager as PlatformManager;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// 扫描参数
#[derive(Clone, Copy, Debug)]
pub struct ScanOptions {
    /// 运行持续时间
    pub duration: Duration,
    /// 轮询外设的间隔
    pub poll_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            duration: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// 扫描统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub received: usize,
    pub admitted: usize,
    pub malformed: usize,
    /// 与上一次轮询相同或缺少 RSSI 而未送入的记录
    pub stale: usize,
}

/// 单个外设一次上报的处理结果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ingest {
    Admitted,
    Rejected,
    Malformed,
    Stale,
}

/// 每个外设最近一次送入的厂商数据与 RSSI
#[derive(Debug, Default)]
pub struct SeenAdvertisements {
    last: HashMap<String, (HashMap<u16, Vec<u8>>, i16)>,
}

impl SeenAdvertisements {
    pub fn new() -> Self {
        Self::default()
    }

    /// 与上一次相同时返回 false；否则记录本次数据并返回 true
    fn observe(&mut self, address: &str, manufacturer_data: &HashMap<u16, Vec<u8>>, rssi: i16) -> bool {
        if let Some((data, last_rssi)) = self.last.get(address) {
            if *last_rssi == rssi && data == manufacturer_data {
                return false;
            }
        }
        self.last
            .insert(address.to_string(), (manufacturer_data.clone(), rssi));
        true
    }

    pub fn forget(&mut self, address: &str) {
        self.last.remove(address);
    }
}

/// 将厂商数据还原为完整的广播记录
///
/// 前缀为 Flags 结构（02 01 06），随后是长度、类型 0xFF、小端公司 ID 与厂商数据，
/// 使得公司 ID 位于偏移 5..=6、iBeacon 负载从偏移 7 开始。
pub fn scan_record_from_manufacturer_data(company_id: u16, data: &[u8]) -> Vec<u8> {
    let [lo, hi] = company_id.to_le_bytes();
    let mut record = Vec::with_capacity(data.len() + 7);
    record.extend_from_slice(&[0x02, 0x01, 0x06]);
    record.push((data.len() + 3).min(u8::MAX as usize) as u8);
    record.push(0xff);
    record.extend_from_slice(&[lo, hi]);
    record.extend_from_slice(data);
    record
}

/// 处理一个外设的厂商数据；每个公司 ID 的数据各作为一条广播
///
/// 缺少 RSSI 或与 `seen` 中记录的上一次数据相同时不送入，结果均为 [`Ingest::Stale`]。
pub fn ingest_manufacturer_data(
    technology: &BleTechnology,
    seen: &mut SeenAdvertisements,
    manufacturer_data: &HashMap<u16, Vec<u8>>,
    rssi: Option<i16>,
    name: Option<&str>,
    address: &str,
) -> Vec<Ingest> {
    let rssi = match rssi {
        Some(rssi) if seen.observe(address, manufacturer_data, rssi) => rssi,
        _ => return vec![Ingest::Stale; manufacturer_data.len()],
    };
    manufacturer_data
        .iter()
        .map(|(company_id, data)| {
            let record = scan_record_from_manufacturer_data(*company_id, data);
            match technology.on_scan_record(&record, rssi, name, Some(address)) {
                Ok(true) => Ingest::Admitted,
                Ok(false) => Ingest::Rejected,
                Err(e) => {
                    tracing::debug!(address, error = %e, "discarding advertisement");
                    Ingest::Malformed
                }
            }
        })
        .collect()
}

/// 扫描蓝牙广播并送入技术实例，直到达到持续时间
pub async fn scan_beacons(technology: Arc<BleTechnology>, options: ScanOptions) -> Result<ScanSummary> {
    let manager = PlatformManager::new().await?;
    let adapters = manager.adapters().await?;
    let adapter = adapters.into_iter().next().ok_or(Error::NoAdapter)?;

    tracing::info!(duration = ?options.duration, "starting beacon scan");
    adapter.start_scan(ScanFilter::default()).await?;

    let start_time = Instant::now();
    let mut summary = ScanSummary::default();
    let mut seen = SeenAdvertisements::new();

    while start_time.elapsed() < options.duration {
        for peripheral in adapter.peripherals().await? {
            let address = peripheral.address().to_string();
            let Ok(Some(properties)) = peripheral.properties().await else {
                seen.forget(&address);
                continue;
            };
            let outcomes = ingest_manufacturer_data(
                &technology,
                &mut seen,
                &properties.manufacturer_data,
                properties.rssi,
                properties.local_name.as_deref(),
                &address,
            );
            for outcome in outcomes {
                summary.received += 1;
                match outcome {
                    Ingest::Admitted => summary.admitted += 1,
                    Ingest::Malformed => summary.malformed += 1,
                    Ingest::Stale => summary.stale += 1,
                    Ingest::Rejected => {}
                }
            }
        }

        sleep(options.poll_interval).await;
    }

    adapter.stop_scan().await?;
    tracing::info!(
        received = summary.received,
        admitted = summary.admitted,
        stale = summary.stale,
        "beacon scan finished"
    );
    Ok(summary)
}
