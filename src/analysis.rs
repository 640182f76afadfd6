use std::collections::HashMap;

use crate::model::ModelTable;
use crate::sampler::ItemLoss;
use crate::types::{CoverageId, EventId, SampleIndex};

/// Tolerance on a distribution's final cumulative probability.
const CDF_TOTAL_TOLERANCE: f64 = 1e-6;

/// Relative slack allowed on a capped coverage total.
const TIV_RELATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityViolation {
    // Model table
    CdfDecreasing { event_id: i32, areaperil_id: u32, vulnerability_id: i32, bin_index: i32, prob_to: f64, previous: f64 },
    CdfIncomplete { event_id: i32, areaperil_id: u32, vulnerability_id: i32, total: f64 },
    // Losses
    NegativeLoss { event_id: i32, item_id: i32, sidx: i32, loss: f64 },
    LossExceedsTiv { event_id: i32, coverage_id: i32, sidx: i32, total: f64, tiv: f64 },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CdfDecreasing { event_id, areaperil_id, vulnerability_id, bin_index, prob_to, previous } => {
                write!(
                    f,
                    "CdfDecreasing event={event_id} areaperil={areaperil_id} vulnerability={vulnerability_id} bin={bin_index}: prob_to={prob_to} previous={previous}"
                )
            }
            Self::CdfIncomplete { event_id, areaperil_id, vulnerability_id, total } => {
                write!(
                    f,
                    "CdfIncomplete event={event_id} areaperil={areaperil_id} vulnerability={vulnerability_id}: total={total}"
                )
            }
            Self::NegativeLoss { event_id, item_id, sidx, loss } => {
                write!(f, "NegativeLoss event={event_id} item={item_id} sidx={sidx}: loss={loss}")
            }
            Self::LossExceedsTiv { event_id, coverage_id, sidx, total, tiv } => {
                write!(f, "LossExceedsTiv event={event_id} coverage={coverage_id} sidx={sidx}: total={total} tiv={tiv}")
            }
        }
    }
}

/// Every distribution must be non-decreasing and end at 1.
pub fn verify_model(model: &ModelTable) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    for rows in model.distributions() {
        let head = &rows[0];
        let mut previous = 0.0;
        for row in rows {
            if row.prob_to < previous {
                violations.push(IntegrityViolation::CdfDecreasing {
                    event_id: row.event_id.0,
                    areaperil_id: row.areaperil_id.0,
                    vulnerability_id: row.vulnerability_id.0,
                    bin_index: row.bin_index.0,
                    prob_to: row.prob_to,
                    previous,
                });
            }
            previous = row.prob_to;
        }
        if (previous - 1.0).abs() > CDF_TOTAL_TOLERANCE {
            violations.push(IntegrityViolation::CdfIncomplete {
                event_id: head.event_id.0,
                areaperil_id: head.areaperil_id.0,
                vulnerability_id: head.vulnerability_id.0,
                total: previous,
            });
        }
    }
    violations
}

/// Sampled losses must be non-negative, and after allocation the item
/// losses of a coverage must not sum past its TIV at any sample index.
pub fn verify_losses(losses: &[ItemLoss]) -> Vec<IntegrityViolation> {
    let mut violations = Vec::new();
    let mut totals: HashMap<(EventId, CoverageId, SampleIndex), (f64, f64)> = HashMap::new();

    for item in losses {
        for sample in &item.samples {
            if sample.loss < 0.0 || sample.loss.is_nan() {
                violations.push(IntegrityViolation::NegativeLoss {
                    event_id: item.event_id.0,
                    item_id: item.item_id.0,
                    sidx: sample.sidx.to_wire(),
                    loss: sample.loss,
                });
            }
            let (total, _) = totals
                .entry((item.event_id, item.coverage_id, sample.sidx))
                .or_insert((0.0, item.tiv));
            *total += sample.loss;
        }
    }

    let mut exceeded: Vec<_> = totals
        .into_iter()
        .filter(|(_, (total, tiv))| *total > tiv + TIV_RELATIVE_TOLERANCE * tiv.max(1.0))
        .collect();
    exceeded.sort_by_key(|((event, coverage, sidx), _)| (event.0, coverage.0, sidx.to_wire()));
    violations.extend(exceeded.into_iter().map(|((event, coverage, sidx), (total, tiv))| {
        IntegrityViolation::LossExceedsTiv {
            event_id: event.0,
            coverage_id: coverage.0,
            sidx: sidx.to_wire(),
            total,
            tiv,
        }
    }));
    violations
}
