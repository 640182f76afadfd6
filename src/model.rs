use std::collections::{HashMap, HashSet};

use crate::batch::BatchEvent;
use crate::inputs::ReferenceData;
use crate::types::{AreaPerilId, DamageBinId, EventId, IntensityBinId, VulnerabilityId};

/// Tolerance on a vulnerability curve's total probability.
const CURVE_TOTAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRow {
    pub event_id: EventId,
    pub areaperil_id: AreaPerilId,
    pub vulnerability_id: VulnerabilityId,
    pub bin_index: DamageBinId,
    /// Cumulative probability up to and including this bin.
    pub prob_to: f64,
    pub bin_mean: f64,
}

/// Rows dropped by each join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub events_without_footprint: usize,
    pub cells_without_items: usize,
    pub missing_curves: usize,
    pub missing_damage_bins: usize,
}

impl JoinStats {
    pub fn total(&self) -> usize {
        self.events_without_footprint + self.cells_without_items + self.missing_curves + self.missing_damage_bins
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelTable {
    /// Sorted by (batch order, areaperil, vulnerability, damage bin).
    pub rows: Vec<ModelRow>,
    pub stats: JoinStats,
}

impl ModelTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one (event, areaperil, vulnerability) distribution at a time.
    pub fn distributions(&self) -> impl Iterator<Item = &[ModelRow]> {
        self.rows.chunk_by(|a, b| {
            a.event_id == b.event_id
                && a.areaperil_id == b.areaperil_id
                && a.vulnerability_id == b.vulnerability_id
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct CurvePoint {
    damage_bin: DamageBinId,
    cum_prob: f64,
}

/// Join indices over the reference data, built once per batch.
///
/// ```text
/// events ⋈ footprint        on event_id
///        ⋈ items            on areaperil_id        (adds vulnerability_id)
///        ⋈ vulnerability    on (vulnerability_id, intensity_bin_id)
///        ⋈ damage_bin_dict  on damage_bin_id       (adds bin mean)
/// ```
///
/// Unmatched rows on either side contribute no loss and are dropped.
pub struct ModelBuilder {
    footprint: HashMap<EventId, Vec<(AreaPerilId, IntensityBinId)>>,
    vulnerabilities: HashMap<AreaPerilId, Vec<VulnerabilityId>>,
    curves: HashMap<(VulnerabilityId, IntensityBinId), Vec<CurvePoint>>,
    bin_means: HashMap<DamageBinId, f64>,
}

impl ModelBuilder {
    pub fn new(data: &ReferenceData) -> Self {
        let mut footprint: HashMap<EventId, Vec<(AreaPerilId, IntensityBinId)>> = HashMap::new();
        for entry in &data.footprint {
            footprint
                .entry(entry.event_id)
                .or_default()
                .push((entry.areaperil_id, entry.intensity_bin_id));
        }

        let mut vulnerabilities: HashMap<AreaPerilId, Vec<VulnerabilityId>> = HashMap::new();
        for item in &data.items {
            vulnerabilities
                .entry(item.areaperil_id)
                .or_default()
                .push(item.vulnerability_id);
        }
        for ids in vulnerabilities.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        let mut masses: HashMap<(VulnerabilityId, IntensityBinId), Vec<(DamageBinId, f64)>> =
            HashMap::new();
        for entry in &data.vulnerability {
            masses
                .entry((entry.vulnerability_id, entry.intensity_bin_id))
                .or_default()
                .push((entry.damage_bin_id, entry.probability));
        }
        let curves = masses
            .into_iter()
            .map(|(key, mut bins)| {
                bins.sort_by_key(|&(bin, _)| bin);
                let mut cum_prob = 0.0;
                let points: Vec<CurvePoint> = bins
                    .into_iter()
                    .map(|(damage_bin, probability)| {
                        cum_prob += probability;
                        CurvePoint { damage_bin, cum_prob }
                    })
                    .collect();
                if (cum_prob - 1.0).abs() > CURVE_TOTAL_TOLERANCE {
                    log::warn!(
                        "vulnerability {} intensity bin {} sums to {cum_prob}, not 1",
                        key.0.0,
                        key.1.0
                    );
                }
                (key, points)
            })
            .collect();

        let bin_means = data
            .damage_bins
            .iter()
            .map(|bin| (bin.bin_index, bin.interpolation))
            .collect();

        ModelBuilder { footprint, vulnerabilities, curves, bin_means }
    }

    pub fn build(&self, events: &[BatchEvent]) -> ModelTable {
        let mut stats = JoinStats::default();
        let mut keyed: Vec<(usize, ModelRow)> = Vec::new();

        for event in events {
            let Some(cells) = self.footprint.get(&event.event_id) else {
                stats.events_without_footprint += 1;
                continue;
            };
            let mut seen = HashSet::new();
            for &(areaperil_id, intensity_bin) in cells {
                let Some(vulnerability_ids) = self.vulnerabilities.get(&areaperil_id) else {
                    stats.cells_without_items += 1;
                    continue;
                };
                for &vulnerability_id in vulnerability_ids {
                    if !seen.insert((areaperil_id, intensity_bin, vulnerability_id)) {
                        continue;
                    }
                    let Some(curve) = self.curves.get(&(vulnerability_id, intensity_bin)) else {
                        stats.missing_curves += 1;
                        continue;
                    };
                    for point in curve {
                        let Some(&bin_mean) = self.bin_means.get(&point.damage_bin) else {
                            stats.missing_damage_bins += 1;
                            continue;
                        };
                        keyed.push((
                            event.order,
                            ModelRow {
                                event_id: event.event_id,
                                areaperil_id,
                                vulnerability_id,
                                bin_index: point.damage_bin,
                                prob_to: point.cum_prob,
                                bin_mean,
                            },
                        ));
                    }
                }
            }
        }

        keyed.sort_by_key(|(order, row)| (*order, row.areaperil_id, row.vulnerability_id, row.bin_index));

        if stats.total() > 0 {
            log::debug!("model joins dropped rows: {stats:?}");
        }
        log::info!("model table: {} rows for {} events", keyed.len(), events.len());

        ModelTable {
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::{Coverage, DamageBin, FootprintEntry, Item, VulnerabilityEntry};
    use crate::types::{CoverageId, GroupId, ItemId};

    fn batch(ids: &[i32]) -> Vec<BatchEvent> {
        ids.iter()
            .enumerate()
            .map(|(order, &id)| BatchEvent { event_id: EventId(id), order })
            .collect()
    }

    fn footprint(event: i32, areaperil: u32, intensity: i32) -> FootprintEntry {
        FootprintEntry {
            event_id: EventId(event),
            areaperil_id: AreaPerilId(areaperil),
            intensity_bin_id: IntensityBinId(intensity),
        }
    }

    fn item(id: i32, areaperil: u32, vulnerability: i32) -> Item {
        Item {
            item_id: ItemId(id),
            coverage_id: CoverageId(id),
            areaperil_id: AreaPerilId(areaperil),
            vulnerability_id: VulnerabilityId(vulnerability),
            group_id: GroupId(id),
        }
    }

    fn mass(vulnerability: i32, intensity: i32, bin: i32, probability: f64) -> VulnerabilityEntry {
        VulnerabilityEntry {
            vulnerability_id: VulnerabilityId(vulnerability),
            intensity_bin_id: IntensityBinId(intensity),
            damage_bin_id: DamageBinId(bin),
            probability,
        }
    }

    fn bin(index: i32, from: f64, to: f64) -> DamageBin {
        DamageBin {
            bin_index: DamageBinId(index),
            bin_from: from,
            bin_to: to,
            interpolation: (from + to) / 2.0,
            interval_type: None,
        }
    }

    fn data() -> ReferenceData {
        ReferenceData {
            events: vec![EventId(1), EventId(2), EventId(3)],
            items: vec![item(1, 10, 100), item(2, 10, 100), item(3, 10, 200), item(4, 20, 100)],
            coverages: (1..=4).map(|i| Coverage { coverage_id: CoverageId(i), tiv: 1_000.0 }).collect(),
            footprint: vec![footprint(1, 10, 1), footprint(1, 20, 2), footprint(2, 20, 1)],
            vulnerability: vec![
                // Listed out of bin order on purpose.
                mass(100, 1, 3, 0.5),
                mass(100, 1, 2, 0.3),
                mass(100, 1, 1, 0.2),
                mass(200, 1, 1, 1.0),
                mass(100, 2, 1, 0.6),
                mass(100, 2, 2, 0.4),
            ],
            damage_bins: vec![bin(1, 0.0, 0.0), bin(2, 0.0, 0.5), bin(3, 0.5, 1.0)],
        }
    }

    fn key(row: &ModelRow) -> (i32, u32, i32, i32) {
        (row.event_id.0, row.areaperil_id.0, row.vulnerability_id.0, row.bin_index.0)
    }

    #[test]
    fn cumulative_probability_follows_bin_order() {
        let table = ModelBuilder::new(&data()).build(&batch(&[1]));
        let curve: Vec<(i32, f64)> = table
            .rows
            .iter()
            .filter(|r| r.areaperil_id == AreaPerilId(10) && r.vulnerability_id == VulnerabilityId(100))
            .map(|r| (r.bin_index.0, r.prob_to))
            .collect();
        assert_eq!(curve.len(), 3);
        assert_eq!(curve[0], (1, 0.2));
        assert!((curve[1].1 - 0.5).abs() < 1e-12);
        assert!((curve[2].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn items_sharing_a_vulnerability_are_deduplicated() {
        // Items 1 and 2 share (areaperil 10, vulnerability 100).
        let table = ModelBuilder::new(&data()).build(&batch(&[1]));
        let count = table
            .rows
            .iter()
            .filter(|r| r.areaperil_id == AreaPerilId(10) && r.vulnerability_id == VulnerabilityId(100))
            .count();
        assert_eq!(count, 3);
    }

    #[test]
    fn rows_sorted_by_batch_order_then_keys() {
        // Event 2 comes first in the batch.
        let table = ModelBuilder::new(&data()).build(&batch(&[2, 1]));
        let keys: Vec<_> = table.rows.iter().map(key).collect();
        assert_eq!(
            keys,
            vec![
                (2, 20, 100, 1),
                (2, 20, 100, 2),
                (2, 20, 100, 3),
                (1, 10, 100, 1),
                (1, 10, 100, 2),
                (1, 10, 100, 3),
                (1, 10, 200, 1),
                (1, 20, 100, 1),
                (1, 20, 100, 2),
            ]
        );
        assert_eq!(table.distributions().count(), 4);
    }

    #[test]
    fn bin_mean_comes_from_the_dictionary() {
        let table = ModelBuilder::new(&data()).build(&batch(&[2]));
        let means: Vec<f64> = table.rows.iter().map(|r| r.bin_mean).collect();
        assert_eq!(means, vec![0.0, 0.25, 0.75]);
    }

    #[test]
    fn unmatched_rows_are_dropped_and_counted() {
        let mut data = data();
        data.footprint.push(footprint(3, 99, 1)); // no item at areaperil 99
        data.footprint.push(footprint(2, 10, 7)); // no curve for intensity 7
        data.damage_bins.retain(|b| b.bin_index != DamageBinId(3));

        let table = ModelBuilder::new(&data).build(&batch(&[2, 3, 4]));
        assert_eq!(table.stats.events_without_footprint, 1);
        assert_eq!(table.stats.cells_without_items, 1);
        assert_eq!(table.stats.missing_curves, 2);
        assert_eq!(table.stats.missing_damage_bins, 1);
        assert!(table.rows.iter().all(|r| r.bin_index != DamageBinId(3)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_batch_gives_empty_table() {
        let table = ModelBuilder::new(&data()).build(&[]);
        assert!(table.is_empty());
        assert_eq!(table.stats, JoinStats::default());
    }
}
