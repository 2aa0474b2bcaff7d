/// 信标"最近一次观测"存储（线程安全）
///
/// 以信标标识 "major|minor" 为键，读取时剔除超出有效期的条目。

use crate::algorithms::BeaconAdvertisement;
use crate::technology::lock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 信标存储；克隆得到的实例共享同一份数据
#[derive(Clone, Debug)]
pub struct BeaconStore {
    /// 信标标识 -> 最近一次广播
    devices: Arc<Mutex<HashMap<String, BeaconAdvertisement>>>,
    /// 有效期
    validity: Duration,
}

impl BeaconStore {
    /// 创建新的存储
    pub fn new(validity: Duration) -> Self {
        BeaconStore {
            devices: Arc::new(Mutex::new(HashMap::new())),
            validity,
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// 插入或更新信标
    pub fn insert(&self, beacon: BeaconAdvertisement) {
        let mut devices = lock(&self.devices);
        devices.insert(beacon.identifier(), beacon);
    }

    /// 获取在 `now` 时刻仍有效的所有信标（按 RSSI 从强到弱）
    ///
    /// `timestamp + validity < now` 的条目被清理，不会出现在结果中。
    /// 截止时间超出可表示范围时视为永不过期。
    pub fn valid_at(&self, now: DateTime<Utc>) -> Vec<BeaconAdvertisement> {
        let mut devices = lock(&self.devices);

        devices.retain(|_, beacon| {
            beacon
                .timestamp()
                .checked_add_signed(self.validity)
                .is_none_or(|expires| expires >= now)
        });

        let mut beacons: Vec<_> = devices.values().cloned().collect();
        beacons.sort_by(|a, b| b.cmp_rssi(a).then_with(|| a.identifier().cmp(&b.identifier())));
        beacons
    }

    /// 获取特定标识的信标
    pub fn get(&self, identifier: &str) -> Option<BeaconAdvertisement> {
        lock(&self.devices).get(identifier).cloned()
    }

    /// 存储中的信标总数（含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        lock(&self.devices).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.devices).is_empty()
    }

    /// 清空存储
    pub fn clear(&self) {
        lock(&self.devices).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::BeaconFields;

    fn beacon(minor: u16, rssi: i16, timestamp: DateTime<Utc>) -> BeaconAdvertisement {
        BeaconAdvertisement::from_fields(BeaconFields {
            major: 1,
            minor,
            rssi,
            tx_power: -59,
            timestamp,
            ..Default::default()
        })
    }

    #[test]
    fn test_insert_replaces_same_identifier() {
        let store = BeaconStore::new(Duration::seconds(5));
        let now = Utc::now();
        store.insert(beacon(1, -70, now));
        store.insert(beacon(1, -60, now));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1|1").map(|b| b.rssi()), Some(-60));
    }

    #[test]
    fn test_validity_window_boundary() {
        let store = BeaconStore::new(Duration::seconds(5));
        let now = Utc::now();
        store.insert(beacon(1, -70, now - Duration::seconds(5)));
        store.insert(beacon(2, -60, now - Duration::seconds(6)));

        let valid = store.valid_at(now);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].identifier(), "1|1");
        // 过期条目已被清理
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_huge_validity_never_expires() {
        let store = BeaconStore::new(Duration::seconds(9_000_000_000_000_000));
        let now = Utc::now();
        store.insert(beacon(1, -70, now));
        store.insert(beacon(2, -60, DateTime::<Utc>::MIN_UTC));

        let valid = store.valid_at(now);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0].identifier(), "1|2");
    }

    #[test]
    fn test_sorted_strongest_first_and_shared_clone() {
        let store = BeaconStore::new(Duration::seconds(5));
        let shared = store.clone();
        let now = Utc::now();
        shared.insert(beacon(1, -80, now));
        shared.insert(beacon(2, -55, now));
        shared.insert(beacon(3, -65, now));

        let ids: Vec<String> = store.valid_at(now).iter().map(|b| b.identifier()).collect();
        assert_eq!(ids, vec!["1|2", "1|3", "1|1"]);

        store.clear();
        assert!(shared.is_empty());
    }
}
