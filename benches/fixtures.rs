use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::Exp1;

use gulcalc::inputs::{Coverage, DamageBin, FootprintEntry, Item, ReferenceData, VulnerabilityEntry};
use gulcalc::types::{
    AreaPerilId, CoverageId, DamageBinId, EventId, GroupId, IntensityBinId, ItemId, VulnerabilityId,
};

pub struct Scenario {
    pub events: usize,
    pub areaperils: usize,
    pub cells_per_event: usize,
    pub items: usize,
    pub vulnerabilities: usize,
    pub intensity_bins: usize,
    pub damage_bins: usize,
}

pub const SMALL: Scenario = Scenario {
    events: 100,
    areaperils: 200,
    cells_per_event: 20,
    items: 500,
    vulnerabilities: 5,
    intensity_bins: 10,
    damage_bins: 10,
};

pub const MEDIUM: Scenario = Scenario {
    events: 1_000,
    areaperils: 2_000,
    cells_per_event: 50,
    items: 5_000,
    vulnerabilities: 20,
    intensity_bins: 20,
    damage_bins: 20,
};

pub const LARGE: Scenario = Scenario {
    events: 5_000,
    areaperils: 10_000,
    cells_per_event: 100,
    items: 20_000,
    vulnerabilities: 50,
    intensity_bins: 30,
    damage_bins: 30,
};

/// Damage masses drawn from a flat Dirichlet: normalised unit exponentials.
fn masses(rng: &mut ChaCha20Rng, n: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| rng.sample(Exp1)).collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|m| m / total).collect()
}

/// Synthetic reference data. Two items share each coverage and every fifth
/// item shares a correlation group with its neighbour.
pub fn reference_data(scenario: &Scenario, seed: u64) -> ReferenceData {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);

    let events: Vec<EventId> = (1..=scenario.events as i32).map(EventId).collect();

    let mut footprint = Vec::with_capacity(scenario.events * scenario.cells_per_event);
    for &event_id in &events {
        for _ in 0..scenario.cells_per_event {
            footprint.push(FootprintEntry {
                event_id,
                areaperil_id: AreaPerilId(rng.random_range(1..=scenario.areaperils as u32)),
                intensity_bin_id: IntensityBinId(rng.random_range(1..=scenario.intensity_bins as i32)),
            });
        }
    }
    footprint.sort_by_key(|f| (f.event_id, f.areaperil_id));
    footprint.dedup_by_key(|f| (f.event_id, f.areaperil_id));

    let items: Vec<Item> = (1..=scenario.items as i32)
        .map(|i| Item {
            item_id: ItemId(i),
            coverage_id: CoverageId((i + 1) / 2),
            areaperil_id: AreaPerilId(rng.random_range(1..=scenario.areaperils as u32)),
            vulnerability_id: VulnerabilityId(rng.random_range(1..=scenario.vulnerabilities as i32)),
            group_id: GroupId(if i % 5 == 0 { i - 1 } else { i }),
        })
        .collect();

    let coverages = (1..=scenario.items.div_ceil(2) as i32)
        .map(|c| Coverage { coverage_id: CoverageId(c), tiv: rng.random_range(50_000.0..2_000_000.0) })
        .collect();

    let mut vulnerability = Vec::new();
    for v in 1..=scenario.vulnerabilities as i32 {
        for b in 1..=scenario.intensity_bins as i32 {
            for (d, probability) in masses(&mut rng, scenario.damage_bins).into_iter().enumerate() {
                vulnerability.push(VulnerabilityEntry {
                    vulnerability_id: VulnerabilityId(v),
                    intensity_bin_id: IntensityBinId(b),
                    damage_bin_id: DamageBinId(d as i32 + 1),
                    probability,
                });
            }
        }
    }

    let width = 1.0 / scenario.damage_bins as f64;
    let damage_bins = (0..scenario.damage_bins)
        .map(|d| {
            let bin_from = d as f64 * width;
            DamageBin {
                bin_index: DamageBinId(d as i32 + 1),
                bin_from,
                bin_to: bin_from + width,
                interpolation: bin_from + width / 2.0,
                interval_type: None,
            }
        })
        .collect();

    ReferenceData { events, items, coverages, footprint, vulnerability, damage_bins }
}
