use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::batch::EventBatch;
use crate::error::{GulError, GulResult};

/// Seed of the event permutation. Shared by every batch of a run so that
/// independently launched batch processes see disjoint partitions.
pub const EVENT_SHUFFLE_SEED: u32 = 1234;

/// Loss stream type (2 = ground-up item stream) in the top byte, version 1.
pub const LOSS_STREAM_ID: i32 = (2 << 24) | 1;

pub const STATIC_DIR: &str = "static";
pub const EVENTS_FILE: &str = "events.csv";
pub const ITEMS_FILE: &str = "items.csv";
pub const COVERAGES_FILE: &str = "coverages.csv";
pub const FOOTPRINT_FILE: &str = "footprint.csv";
pub const VULNERABILITY_FILE: &str = "vulnerability.csv";
pub const DAMAGE_BIN_DICT_FILE: &str = "damage_bin_dict.csv";

/// Settings read from the analysis settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub number_of_samples: u32,
}

impl AnalysisSettings {
    pub fn load(path: &Path) -> GulResult<Self> {
        if !path.exists() {
            return Err(GulError::MissingInput {
                description: "Analysis settings",
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| GulError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text, path)
    }

    /// `number_of_samples` is looked up under `analysis_settings` first and
    /// at the top level second. A key whose value is not an integer in
    /// `0..=i32::MAX` is skipped; if every present key is unusable the first
    /// one is reported.
    pub fn from_json(text: &str, path: &Path) -> GulResult<Self> {
        let doc: Value = serde_json::from_str(text).map_err(|source| GulError::Settings {
            path: path.to_path_buf(),
            source,
        })?;

        let candidates: Vec<&Value> = [
            doc.get("analysis_settings").and_then(|s| s.get("number_of_samples")),
            doc.get("number_of_samples"),
        ]
        .into_iter()
        .flatten()
        .collect();

        if let Some(number_of_samples) = candidates.iter().find_map(|value| sample_count(value)) {
            return Ok(AnalysisSettings { number_of_samples });
        }
        match candidates.first() {
            Some(value) => Err(GulError::InvalidSampleCount {
                path: path.to_path_buf(),
                value: value.to_string(),
            }),
            None => Err(GulError::MissingSampleCount { path: path.to_path_buf() }),
        }
    }
}

/// Sample indices and the stream header are i32 on the wire.
fn sample_count(value: &Value) -> Option<u32> {
    let n = i32::try_from(value.as_u64()?).ok()?;
    u32::try_from(n).ok()
}

/// `<run>/input` pairs with `<run>/static`.
fn default_static_dir(inputs_dir: &Path) -> PathBuf {
    inputs_dir.parent().unwrap_or(inputs_dir).join(STATIC_DIR)
}

/// Locations of the six reference tables.
#[derive(Debug, Clone)]
pub struct InputFiles {
    pub events: PathBuf,
    pub items: PathBuf,
    pub coverages: PathBuf,
    pub footprint: PathBuf,
    pub vulnerability: PathBuf,
    pub damage_bin_dict: PathBuf,
}

impl InputFiles {
    /// Events and items live in the inputs directory; the model files and
    /// coverages live in the static directory, by default the `static`
    /// sibling of the inputs directory.
    pub fn new(inputs_dir: &Path, static_dir: Option<&Path>, items_file: Option<&str>) -> Self {
        let static_dir = match static_dir {
            Some(dir) => dir.to_path_buf(),
            None => default_static_dir(inputs_dir),
        };
        InputFiles {
            events: inputs_dir.join(EVENTS_FILE),
            items: inputs_dir.join(items_file.unwrap_or(ITEMS_FILE)),
            coverages: static_dir.join(COVERAGES_FILE),
            footprint: static_dir.join(FOOTPRINT_FILE),
            vulnerability: static_dir.join(VULNERABILITY_FILE),
            damage_bin_dict: static_dir.join(DAMAGE_BIN_DICT_FILE),
        }
    }

    fn described(&self) -> [(&'static str, &Path); 6] {
        [
            ("Events", &self.events),
            ("Items", &self.items),
            ("Coverages", &self.coverages),
            ("Footprint", &self.footprint),
            ("Vulnerability", &self.vulnerability),
            ("Damage bin dictionary", &self.damage_bin_dict),
        ]
    }

    /// Fail on the first missing file, before any table is read.
    pub fn check_exists(&self) -> GulResult<()> {
        for (description, path) in self.described() {
            if !path.is_file() {
                return Err(GulError::MissingInput {
                    description,
                    path: path.to_path_buf(),
                });
            }
        }
        Ok(())
    }
}

/// Where the loss stream goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSink {
    Stdout,
    File(PathBuf),
}

impl From<&str> for OutputSink {
    /// `-` selects standard output.
    fn from(arg: &str) -> Self {
        if arg == "-" {
            OutputSink::Stdout
        } else {
            OutputSink::File(PathBuf::from(arg))
        }
    }
}

/// Everything one batch invocation needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub batch: EventBatch,
    pub settings: AnalysisSettings,
    pub inputs: InputFiles,
    pub output: OutputSink,
}
