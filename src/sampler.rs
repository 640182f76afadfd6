use std::collections::HashMap;

use crate::inputs::ReferenceData;
use crate::model::{ModelRow, ModelTable};
use crate::rng::SampleGenerator;
use crate::types::{
    AreaPerilId, CoverageId, DamageBinId, EventId, GroupId, ItemId, SampleIndex, VulnerabilityId,
};

/// One damage bin of an item's cumulative distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CdfBin {
    pub prob_from: f64,
    pub prob_to: f64,
    pub bin_mean: f64,
    pub bin_from: f64,
    pub bin_to: f64,
}

impl CdfBin {
    pub fn height(&self) -> f64 {
        self.prob_to - self.prob_from
    }
}

/// Damage-ratio distribution of one (event, item) pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DamageCdf {
    bins: Vec<CdfBin>,
}

impl DamageCdf {
    /// Bins as `(prob_to, bin_mean, bin_from, bin_to)` in damage bin order.
    /// `prob_from` of each bin is the previous bin's `prob_to`.
    pub fn from_bins(bins: impl IntoIterator<Item = (f64, f64, f64, f64)>) -> Self {
        let mut prob_from = 0.0;
        let bins = bins
            .into_iter()
            .map(|(prob_to, bin_mean, bin_from, bin_to)| {
                let bin = CdfBin { prob_from, prob_to, bin_mean, bin_from, bin_to };
                prob_from = prob_to;
                bin
            })
            .collect();
        DamageCdf { bins }
    }

    pub fn bins(&self) -> &[CdfBin] {
        &self.bins
    }

    /// Analytic (mean, standard deviation) of loss against `tiv`.
    pub fn moments(&self, tiv: f64) -> (f64, f64) {
        let (mean, second) = self.bins.iter().fold((0.0, 0.0), |(mean, second), bin| {
            let mean_1 = bin.height() * bin.bin_mean * tiv;
            (mean + mean_1, second + mean_1 * bin.bin_mean * tiv)
        });
        // Cancellation can leave a tiny negative variance.
        let variance = (second - mean * mean).max(0.0);
        (mean, variance.sqrt())
    }

    /// The bin with `prob_from <= r < prob_to`, or the last bin when `r`
    /// lies above the final cumulative probability.
    pub fn locate(&self, r: f64) -> Option<&CdfBin> {
        self.bins
            .iter()
            .find(|bin| bin.prob_from <= r && r < bin.prob_to)
            .or(self.bins.last())
    }

    /// Damage ratio for the uniform draw `r`, linear within its bin.
    pub fn damage_ratio(&self, r: f64) -> f64 {
        let Some(bin) = self.locate(r) else {
            return 0.0;
        };
        let height = bin.height();
        if bin.bin_from == bin.bin_to || height <= 0.0 {
            return bin.bin_to;
        }
        let fraction = ((r - bin.prob_from) / height).clamp(0.0, 1.0);
        bin.bin_from + fraction * (bin.bin_to - bin.bin_from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleLoss {
    pub sidx: SampleIndex,
    pub loss: f64,
}

/// All sample losses of one (event, item) pair, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemLoss {
    pub event_id: EventId,
    pub item_id: ItemId,
    pub coverage_id: CoverageId,
    pub tiv: f64,
    pub samples: Vec<SampleLoss>,
}

impl ItemLoss {
    pub fn loss(&self, sidx: SampleIndex) -> Option<f64> {
        self.samples.iter().find(|s| s.sidx == sidx).map(|s| s.loss)
    }
}

#[derive(Debug, Clone, Copy)]
struct ExposedItem {
    item_id: ItemId,
    coverage_id: CoverageId,
    group_id: GroupId,
    tiv: f64,
}

/// Draws losses from the model table for every exposed item.
pub struct LossSampler {
    items: HashMap<(AreaPerilId, VulnerabilityId), Vec<ExposedItem>>,
    damage_bins: HashMap<DamageBinId, (f64, f64)>,
    generator: SampleGenerator,
}

impl LossSampler {
    pub fn new(data: &ReferenceData, number_of_samples: u32) -> Self {
        let tivs: HashMap<CoverageId, f64> = data
            .coverages
            .iter()
            .map(|c| (c.coverage_id, c.tiv))
            .collect();

        let mut items: HashMap<(AreaPerilId, VulnerabilityId), Vec<ExposedItem>> = HashMap::new();
        let mut uncovered = 0usize;
        for item in &data.items {
            let Some(&tiv) = tivs.get(&item.coverage_id) else {
                uncovered += 1;
                continue;
            };
            items
                .entry((item.areaperil_id, item.vulnerability_id))
                .or_default()
                .push(ExposedItem {
                    item_id: item.item_id,
                    coverage_id: item.coverage_id,
                    group_id: item.group_id,
                    tiv,
                });
        }
        if uncovered > 0 {
            log::debug!("{uncovered} items reference no known coverage and are skipped");
        }

        let damage_bins = data
            .damage_bins
            .iter()
            .map(|bin| (bin.bin_index, (bin.bin_from, bin.bin_to)))
            .collect();

        LossSampler {
            items,
            damage_bins,
            generator: SampleGenerator::new(number_of_samples),
        }
    }

    fn cdf(&self, rows: &[ModelRow]) -> DamageCdf {
        DamageCdf::from_bins(rows.iter().filter_map(|row| {
            self.damage_bins
                .get(&row.bin_index)
                .map(|&(bin_from, bin_to)| (row.prob_to, row.bin_mean, bin_from, bin_to))
        }))
    }

    /// Sample losses for every (event, item) pair reachable from `model`.
    ///
    /// Output is ordered by event (batch order), then item id; each item's
    /// samples run -3, -2, -1, 1..=n.
    pub fn sample(&self, model: &ModelTable) -> Vec<ItemLoss> {
        let mut out = Vec::new();
        for event_rows in model.rows.chunk_by(|a, b| a.event_id == b.event_id) {
            self.sample_event(event_rows, &mut out);
        }
        log::info!("sampled {} (event, item) pairs", out.len());
        out
    }

    fn sample_event(&self, rows: &[ModelRow], out: &mut Vec<ItemLoss>) {
        let mut exposed: Vec<(ExposedItem, DamageCdf)> = Vec::new();
        for distribution in rows.chunk_by(|a, b| {
            a.areaperil_id == b.areaperil_id && a.vulnerability_id == b.vulnerability_id
        }) {
            let head = &distribution[0];
            let Some(items) = self.items.get(&(head.areaperil_id, head.vulnerability_id)) else {
                continue;
            };
            let cdf = self.cdf(distribution);
            if cdf.bins().is_empty() {
                continue;
            }
            exposed.extend(items.iter().map(|item| (*item, cdf.clone())));
        }
        exposed.sort_by_key(|(item, _)| item.item_id);

        let event_id = rows[0].event_id;
        let mut items_per_coverage: HashMap<CoverageId, usize> = HashMap::new();
        for (item, _) in &exposed {
            *items_per_coverage.entry(item.coverage_id).or_insert(0) += 1;
        }
        let mut draws: HashMap<GroupId, Vec<f64>> = HashMap::new();

        for (item, cdf) in exposed {
            let item_count = items_per_coverage[&item.coverage_id];
            let uniforms = draws
                .entry(item.group_id)
                .or_insert_with(|| self.generator.draws(event_id, item.group_id));
            let (mean, std_dev) = cdf.moments(item.tiv);

            let mut samples = Vec::with_capacity(uniforms.len() + 3);
            samples.push(SampleLoss { sidx: SampleIndex::EvenSplit, loss: item.tiv / item_count as f64 });
            samples.push(SampleLoss { sidx: SampleIndex::StdDev, loss: std_dev });
            samples.push(SampleLoss { sidx: SampleIndex::Mean, loss: mean });
            samples.extend(uniforms.iter().zip(1u32..).map(|(&r, k)| SampleLoss {
                sidx: SampleIndex::Draw(k),
                loss: cdf.damage_ratio(r) * item.tiv,
            }));

            out.push(ItemLoss {
                event_id,
                item_id: item.item_id,
                coverage_id: item.coverage_id,
                tiv: item.tiv,
                samples,
            });
        }
    }
}
