use std::collections::HashMap;

use crate::sampler::ItemLoss;
use crate::types::{CoverageId, EventId};

/// Allocation rule 1: cap the summed item loss of each (event, coverage,
/// sidx) at the coverage TIV.
///
/// When the total exceeds the TIV every item loss in the group is scaled by
/// `tiv / total`, which keeps the items' relative shares. Groups at or
/// below the TIV are untouched. The special sample indices are capped like
/// the draws.
///
/// Returns the number of (event, coverage, sidx) groups that were rescaled.
pub fn allocate(losses: &mut [ItemLoss]) -> usize {
    let mut totals: HashMap<(EventId, CoverageId), (f64, Vec<f64>)> = HashMap::new();
    for item in losses.iter() {
        let (_, sums) = totals
            .entry((item.event_id, item.coverage_id))
            .or_insert_with(|| (item.tiv, vec![0.0; item.samples.len()]));
        if sums.len() < item.samples.len() {
            sums.resize(item.samples.len(), 0.0);
        }
        for (sum, sample) in sums.iter_mut().zip(&item.samples) {
            *sum += sample.loss;
        }
    }

    let mut rescaled = 0;
    for (tiv, sums) in totals.values() {
        rescaled += sums.iter().filter(|&&total| total > *tiv).count();
    }
    if rescaled == 0 {
        return 0;
    }

    for item in losses.iter_mut() {
        let (tiv, sums) = &totals[&(item.event_id, item.coverage_id)];
        for (sample, &total) in item.samples.iter_mut().zip(sums) {
            if total > *tiv {
                sample.loss *= tiv / total;
            }
        }
    }
    log::debug!("allocation rule 1 rescaled {rescaled} (event, coverage, sidx) groups");
    rescaled
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sampler::SampleLoss;
    use crate::types::{ItemId, SampleIndex};

    fn item(event: i32, item: i32, coverage: i32, tiv: f64, draws: &[f64]) -> ItemLoss {
        ItemLoss {
            event_id: EventId(event),
            item_id: ItemId(item),
            coverage_id: CoverageId(coverage),
            tiv,
            samples: draws
                .iter()
                .zip(1u32..)
                .map(|(&loss, k)| SampleLoss { sidx: SampleIndex::Draw(k), loss })
                .collect(),
        }
    }

    #[test]
    fn excess_is_rescaled_proportionally() {
        let mut losses = vec![item(1, 1, 1, 100.0, &[80.0]), item(1, 2, 1, 100.0, &[60.0])];
        assert_eq!(allocate(&mut losses), 1);
        let a = losses[0].samples[0].loss;
        let b = losses[1].samples[0].loss;
        assert!((a - 80.0 * 100.0 / 140.0).abs() < 1e-9, "{a}");
        assert!((b - 60.0 * 100.0 / 140.0).abs() < 1e-9, "{b}");
        assert!((a - 57.142857).abs() < 1e-4);
        assert!((b - 42.857143).abs() < 1e-4);
        assert!((a + b - 100.0).abs() < 1e-9);
    }

    #[test]
    fn totals_within_tiv_are_untouched() {
        let mut losses = vec![item(1, 1, 1, 100.0, &[40.0, 70.0]), item(1, 2, 1, 100.0, &[60.0, 10.0])];
        assert_eq!(allocate(&mut losses), 0);
        assert_eq!(losses[0].samples[0].loss, 40.0);
        assert_eq!(losses[1].samples[1].loss, 10.0);
    }

    #[test]
    fn each_sample_index_is_capped_separately() {
        let mut losses = vec![item(1, 1, 1, 100.0, &[90.0, 20.0]), item(1, 2, 1, 100.0, &[30.0, 20.0])];
        assert_eq!(allocate(&mut losses), 1);
        assert!((losses[0].samples[0].loss - 75.0).abs() < 1e-9);
        assert!((losses[1].samples[0].loss - 25.0).abs() < 1e-9);
        assert_eq!(losses[0].samples[1].loss, 20.0);
    }

    #[test]
    fn coverages_and_events_are_independent() {
        let mut losses = vec![
            item(1, 1, 1, 100.0, &[150.0]),
            item(1, 2, 2, 100.0, &[50.0]),
            item(2, 1, 1, 100.0, &[50.0]),
        ];
        assert_eq!(allocate(&mut losses), 1);
        assert!((losses[0].samples[0].loss - 100.0).abs() < 1e-9);
        assert_eq!(losses[1].samples[0].loss, 50.0);
        assert_eq!(losses[2].samples[0].loss, 50.0);
    }

    #[test]
    fn zero_tiv_zeroes_positive_losses() {
        let mut losses = vec![item(1, 1, 1, 0.0, &[5.0])];
        allocate(&mut losses);
        assert_eq!(losses[0].samples[0].loss, 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn capped_totals_never_exceed_tiv(
            draws in prop::collection::vec(prop::collection::vec(0.0f64..1_000.0, 3), 1..8),
            tiv in 0.0f64..2_000.0,
        ) {
            let mut losses: Vec<ItemLoss> = draws
                .iter()
                .enumerate()
                .map(|(i, d)| item(1, i as i32, 1, tiv, d))
                .collect();
            let before: Vec<Vec<f64>> = losses.iter().map(|l| l.samples.iter().map(|s| s.loss).collect()).collect();
            allocate(&mut losses);
            for k in 0..3 {
                let total: f64 = losses.iter().map(|l| l.samples[k].loss).sum();
                prop_assert!(total <= tiv + 1e-6 * tiv.max(1.0), "total {} > tiv {}", total, tiv);
            }
            for (item, old) in losses.iter().zip(&before) {
                for (sample, &loss) in item.samples.iter().zip(old) {
                    prop_assert!(sample.loss <= loss + 1e-12);
                }
            }
        }
    }
}
