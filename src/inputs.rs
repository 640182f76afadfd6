use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::InputFiles;
use crate::error::{GulError, GulResult};
use crate::types::{
    AreaPerilId, CoverageId, DamageBinId, EventId, GroupId, IntensityBinId, ItemId, VulnerabilityId,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
struct EventRow {
    event_id: EventId,
}

/// One hazard cell hit by an event. The probability column, when present,
/// is ignored: every footprint entry carries full probability mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FootprintEntry {
    pub event_id: EventId,
    pub areaperil_id: AreaPerilId,
    pub intensity_bin_id: IntensityBinId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub coverage_id: CoverageId,
    #[serde(alias = "area_peril_id")]
    pub areaperil_id: AreaPerilId,
    pub vulnerability_id: VulnerabilityId,
    pub group_id: GroupId,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coverage {
    pub coverage_id: CoverageId,
    pub tiv: f64,
}

/// Probability mass of one damage bin for a (vulnerability, intensity) pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VulnerabilityEntry {
    pub vulnerability_id: VulnerabilityId,
    pub intensity_bin_id: IntensityBinId,
    pub damage_bin_id: DamageBinId,
    pub probability: f64,
}

/// Damage-ratio interval. `interpolation` is the bin mean.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DamageBin {
    pub bin_index: DamageBinId,
    pub bin_from: f64,
    pub bin_to: f64,
    pub interpolation: f64,
    #[serde(default)]
    pub interval_type: Option<i32>,
}

/// All reference data for one invocation. Loaded once, read-only.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub events: Vec<EventId>,
    pub items: Vec<Item>,
    pub coverages: Vec<Coverage>,
    pub footprint: Vec<FootprintEntry>,
    pub vulnerability: Vec<VulnerabilityEntry>,
    pub damage_bins: Vec<DamageBin>,
}

impl ReferenceData {
    pub fn load(files: &InputFiles) -> GulResult<Self> {
        files.check_exists()?;

        let events: Vec<EventRow> = read_table(&files.events)?;
        let data = ReferenceData {
            events: events.into_iter().map(|row| row.event_id).collect(),
            items: read_table(&files.items)?,
            coverages: read_table(&files.coverages)?,
            footprint: read_table(&files.footprint)?,
            vulnerability: read_table(&files.vulnerability)?,
            damage_bins: read_table(&files.damage_bin_dict)?,
        };

        log::info!(
            "loaded {} events, {} items, {} coverages, {} footprint rows, {} vulnerability rows, {} damage bins",
            data.events.len(),
            data.items.len(),
            data.coverages.len(),
            data.footprint.len(),
            data.vulnerability.len(),
            data.damage_bins.len(),
        );
        Ok(data)
    }
}

/// Headers and fields are trimmed and columns are matched by name, so column
/// order and extra columns do not matter.
fn read_table<T: DeserializeOwned>(path: &Path) -> GulResult<Vec<T>> {
    let csv_error = |source: csv::Error| GulError::Csv { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;
    reader
        .deserialize()
        .map(|row| row.map_err(csv_error))
        .collect()
}
