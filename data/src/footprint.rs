use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::StoreConfig;

/// One (time bucket, price level) cell of aggregated volume.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct FootprintBin {
    /// time bucket key, unix seconds
    pub t: u64,
    /// discrete price level, one price unit apart
    pub price: i64,
    pub buy_volume: f32,
    pub sell_volume: f32,
    #[serde(default)]
    pub high_volume: bool,
}

impl FootprintBin {
    pub fn new(t: u64, price: i64, buy_volume: f32, sell_volume: f32) -> Self {
        Self {
            t,
            price,
            buy_volume,
            sell_volume,
            high_volume: false,
        }
    }

    pub fn total(&self) -> f32 {
        self.buy_volume + self.sell_volume
    }

    pub fn delta(&self) -> f32 {
        self.buy_volume - self.sell_volume
    }

    pub fn is_finite(&self) -> bool {
        self.buy_volume.is_finite() && self.sell_volume.is_finite()
    }
}

/// All bins sharing one time bucket, with the aggregates a column is drawn from.
#[derive(Debug, Clone, Default)]
pub struct Column<'a> {
    pub bins: Vec<&'a FootprintBin>,
    pub buy: f32,
    pub sell: f32,
    pub total: f32,
    /// largest `buy + sell` of a single bin, used to normalize this column only
    pub max_bin_volume: f32,
}

impl<'a> Column<'a> {
    fn push(&mut self, bin: &'a FootprintBin) {
        let volume = bin.total();
        self.buy += bin.buy_volume;
        self.sell += bin.sell_volume;
        self.total += volume;
        if volume > self.max_bin_volume {
            self.max_bin_volume = volume;
        }
        self.bins.push(bin);
    }

    pub fn delta(&self) -> f32 {
        self.buy - self.sell
    }

    /// Bin volume relative to this column's heaviest bin, in `0..=1`.
    pub fn volume_ratio(&self, bin: &FootprintBin) -> f32 {
        if self.max_bin_volume > 0.0 {
            bin.total() / self.max_bin_volume
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Imbalance {
    pub buy_winner: bool,
    pub sell_winner: bool,
}

impl Imbalance {
    pub fn any(&self) -> bool {
        self.buy_winner || self.sell_winner
    }
}

/// Bins grouped per time bucket plus a `(t, price)` index for diagonal lookups.
pub struct Columns<'a> {
    pub columns: BTreeMap<u64, Column<'a>>,
    index: FxHashMap<(u64, i64), &'a FootprintBin>,
}

impl<'a> Columns<'a> {
    /// Non-finite bins are left out so one bad sample cannot poison a column.
    pub fn group(bins: &'a [FootprintBin]) -> Self {
        let mut columns: BTreeMap<u64, Column<'a>> = BTreeMap::new();
        let mut index = FxHashMap::default();

        for bin in bins.iter().filter(|bin| bin.is_finite()) {
            index.insert((bin.t, bin.price), bin);
            columns.entry(bin.t).or_default().push(bin);
        }

        Self { columns, index }
    }

    pub fn get(&self, t: u64, price: i64) -> Option<&'a FootprintBin> {
        self.index.get(&(t, price)).copied()
    }

    /// Diagonal comparison: buyers at a level against sellers one level above,
    /// sellers at a level against buyers one level below. A missing neighbor
    /// never produces a winner.
    pub fn imbalance(&self, bin: &FootprintBin, ratio: f32) -> Imbalance {
        let above = self.get(bin.t, bin.price + 1);
        let below = self.get(bin.t, bin.price - 1);

        Imbalance {
            buy_winner: above.is_some_and(|above| bin.buy_volume > above.sell_volume * ratio),
            sell_winner: below.is_some_and(|below| bin.sell_volume > below.buy_volume * ratio),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Volume {
    buy: f32,
    sell: f32,
}

/// Streaming-fed store of footprint volume, keyed by bucket then price level.
///
/// Only whole buckets ever leave the store, oldest first, once more than
/// `retention` buckets are held.
#[derive(Debug, Clone)]
pub struct BinStore {
    buckets: BTreeMap<u64, BTreeMap<i64, Volume>>,
    retention: usize,
    high_volume: f32,
}

impl Default for BinStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl BinStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            buckets: BTreeMap::new(),
            retention: config.retention.max(1),
            high_volume: config.high_volume,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn latest_bucket(&self) -> Option<u64> {
        self.buckets.keys().next_back().copied()
    }

    /// Adds `buy`/`sell` to the bin at `(t, price)`.
    pub fn apply(&mut self, t: u64, price: i64, buy: f32, sell: f32) {
        let volume = self.buckets.entry(t).or_default().entry(price).or_default();
        volume.buy += buy;
        volume.sell += sell;

        self.evict();
    }

    /// Replaces the whole store, keeping only the newest `retention` buckets.
    pub fn replace(&mut self, bins: impl IntoIterator<Item = FootprintBin>) {
        self.buckets.clear();
        for bin in bins {
            let volume = self
                .buckets
                .entry(bin.t)
                .or_default()
                .entry(bin.price)
                .or_default();
            volume.buy += bin.buy_volume;
            volume.sell += bin.sell_volume;
        }
        self.evict();

        log::debug!("bin store replaced: {} buckets", self.buckets.len());
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    fn evict(&mut self) {
        while self.buckets.len() > self.retention {
            if let Some((t, _)) = self.buckets.pop_first() {
                log::debug!("bin store evicted bucket {t}");
            }
        }
    }

    pub fn get(&self, t: u64, price: i64) -> Option<FootprintBin> {
        self.buckets
            .get(&t)
            .and_then(|levels| levels.get(&price))
            .map(|volume| self.to_bin(t, price, *volume))
    }

    fn to_bin(&self, t: u64, price: i64, volume: Volume) -> FootprintBin {
        FootprintBin {
            t,
            price,
            buy_volume: volume.buy,
            sell_volume: volume.sell,
            high_volume: volume.buy + volume.sell > self.high_volume,
        }
    }

    /// Flattened snapshot, ordered by bucket then price level.
    pub fn bins(&self) -> Vec<FootprintBin> {
        self.buckets
            .iter()
            .flat_map(|(t, levels)| {
                levels
                    .iter()
                    .map(move |(price, volume)| self.to_bin(*t, *price, *volume))
            })
            .collect()
    }
}

/// Total volume per price level inside a price band, as shown next to a
/// selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneProfile {
    pub levels: BTreeMap<i64, ProfileVolume>,
    pub max_total: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileVolume {
    pub buy: f32,
    pub sell: f32,
}

impl ProfileVolume {
    pub fn total(&self) -> f32 {
        self.buy + self.sell
    }
}

impl ZoneProfile {
    /// Sums every bin whose price level lies within `low..=high`, across all
    /// time buckets.
    pub fn from_bins(bins: &[FootprintBin], low: f64, high: f64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let mut levels: BTreeMap<i64, ProfileVolume> = BTreeMap::new();

        for bin in bins.iter().filter(|bin| bin.is_finite()) {
            let price = bin.price as f64;
            if price < low || price > high {
                continue;
            }
            let level = levels.entry(bin.price).or_default();
            level.buy += bin.buy_volume;
            level.sell += bin.sell_volume;
        }

        let max_total = levels
            .values()
            .map(ProfileVolume::total)
            .fold(0.0_f32, f32::max);

        Self { levels, max_total }
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_imbalance() {
        let bins = [
            FootprintBin::new(0, 10, 5.0, 2.0),
            FootprintBin::new(0, 11, 1.0, 10.0),
        ];
        let columns = Columns::group(&bins);

        let low = columns.imbalance(&bins[0], 1.5);
        assert!(!low.buy_winner);
        assert!(!low.sell_winner);

        let high = columns.imbalance(&bins[1], 1.5);
        assert!(high.sell_winner);
        assert!(!high.buy_winner);
    }

    #[test]
    fn ratio_is_configurable() {
        let bins = [
            FootprintBin::new(0, 10, 5.0, 2.0),
            FootprintBin::new(0, 11, 1.0, 10.0),
        ];
        let columns = Columns::group(&bins);

        assert!(!columns.imbalance(&bins[1], 3.0).sell_winner);
    }

    #[test]
    fn neighbors_are_looked_up_within_bucket() {
        let bins = [
            FootprintBin::new(0, 10, 50.0, 0.0),
            FootprintBin::new(60, 11, 0.0, 1.0),
        ];
        let columns = Columns::group(&bins);
        assert!(!columns.imbalance(&bins[0], 1.5).any());
    }

    #[test]
    fn groups_by_bucket() {
        let bins = [
            FootprintBin::new(60, 10, 5.0, 2.0),
            FootprintBin::new(0, 10, 1.0, 1.0),
            FootprintBin::new(60, 11, 1.0, 10.0),
            FootprintBin::new(60, 12, f32::NAN, 1.0),
        ];
        let columns = Columns::group(&bins);

        assert_eq!(columns.columns.len(), 2);
        let col = &columns.columns[&60];
        assert_eq!(col.bins.len(), 2);
        assert_eq!(col.buy, 6.0);
        assert_eq!(col.sell, 12.0);
        assert_eq!(col.total, 18.0);
        assert_eq!(col.max_bin_volume, 11.0);
        assert_eq!(col.delta(), -6.0);
        assert!((col.volume_ratio(&bins[0]) - 7.0 / 11.0).abs() < 1e-6);
    }

    #[test]
    fn store_merges_additively() {
        let mut store = BinStore::default();
        store.apply(60, 10, 1.0, 0.0);
        store.apply(60, 10, 2.0, 3.0);

        let bin = store.get(60, 10).unwrap();
        assert_eq!(bin.buy_volume, 3.0);
        assert_eq!(bin.sell_volume, 3.0);
    }

    #[test]
    fn store_evicts_oldest_buckets() {
        let mut store = BinStore::new(&StoreConfig {
            retention: 2,
            high_volume: 1000.0,
        });
        store.apply(0, 1, 1.0, 1.0);
        store.apply(60, 1, 1.0, 1.0);
        store.apply(120, 1, 1.0, 1.0);

        assert_eq!(store.bucket_count(), 2);
        assert!(store.get(0, 1).is_none());
        assert_eq!(store.latest_bucket(), Some(120));
    }

    #[test]
    fn replace_keeps_newest() {
        let mut store = BinStore::new(&StoreConfig {
            retention: 2,
            high_volume: 10.0,
        });
        store.apply(999, 1, 1.0, 1.0);
        store.replace([
            FootprintBin::new(0, 5, 1.0, 1.0),
            FootprintBin::new(60, 5, 8.0, 4.0),
            FootprintBin::new(120, 5, 1.0, 1.0),
        ]);

        let bins = store.bins();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].t, 60);
        assert!(bins[0].high_volume);
        assert!(!bins[1].high_volume);
        assert!(store.get(999, 1).is_none());
    }

    #[test]
    fn profile_sums_levels_in_band() {
        let bins = [
            FootprintBin::new(0, 10, 5.0, 2.0),
            FootprintBin::new(60, 10, 1.0, 1.0),
            FootprintBin::new(60, 11, 1.0, 10.0),
            FootprintBin::new(60, 14, 100.0, 100.0),
        ];
        let profile = ZoneProfile::from_bins(&bins, 11.5, 9.5);

        assert_eq!(profile.levels.len(), 2);
        assert_eq!(profile.levels[&10].total(), 9.0);
        assert_eq!(profile.max_total, 11.0);
    }
}
