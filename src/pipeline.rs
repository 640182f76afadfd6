use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::allocation::allocate;
use crate::analysis::{verify_losses, verify_model};
use crate::batch::EventBatch;
use crate::config::{OutputSink, RunConfig};
use crate::error::{GulError, GulResult};
use crate::inputs::ReferenceData;
use crate::model::ModelBuilder;
use crate::sampler::{ItemLoss, LossSampler};
use crate::stream::LossStreamWriter;

/// Counters for one batch run, logged at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub model_rows: usize,
    pub item_groups: usize,
    pub rescaled: usize,
}

/// Ground-up loss calculation over one set of reference data.
pub struct GulCalc {
    data: ReferenceData,
    number_of_samples: u32,
}

impl GulCalc {
    pub fn new(data: ReferenceData, number_of_samples: u32) -> Self {
        GulCalc { data, number_of_samples }
    }

    /// Loads the reference tables named by `config`.
    pub fn load(config: &RunConfig) -> GulResult<Self> {
        let data = ReferenceData::load(&config.inputs)?;
        Ok(GulCalc::new(data, config.settings.number_of_samples))
    }

    /// Allocated losses of every (event, item) pair in `batch`, in output
    /// order.
    pub fn losses(&self, batch: EventBatch) -> (Vec<ItemLoss>, RunSummary) {
        let events = batch.select(&self.data.events);
        log::info!(
            "batch {} of {}: {} of {} events",
            batch.index(),
            batch.count(),
            events.len(),
            self.data.events.len()
        );

        let model = ModelBuilder::new(&self.data).build(&events);
        for violation in verify_model(&model) {
            log::warn!("{violation}");
        }

        let mut losses = LossSampler::new(&self.data, self.number_of_samples).sample(&model);
        let rescaled = allocate(&mut losses);
        for violation in verify_losses(&losses) {
            log::warn!("{violation}");
        }

        let summary = RunSummary {
            events: events.len(),
            model_rows: model.len(),
            item_groups: losses.len(),
            rescaled,
        };
        (losses, summary)
    }

    /// Runs `batch` and writes its loss stream to `sink`.
    ///
    /// The header is written even when the batch holds no events.
    pub fn run<W: Write>(&self, batch: EventBatch, sink: W) -> GulResult<(W, RunSummary)> {
        let (losses, summary) = self.losses(batch);
        let mut writer = LossStreamWriter::new(sink, self.number_of_samples)?;
        for item in &losses {
            writer.write_item(item)?;
        }
        log::info!("wrote {} (event, item) groups", writer.groups_written());
        Ok((writer.finish()?, summary))
    }
}

/// Loads the inputs, computes the batch and streams it to the configured
/// output.
pub fn run(config: &RunConfig) -> GulResult<RunSummary> {
    let calc = GulCalc::load(config)?;
    let summary = match &config.output {
        OutputSink::Stdout => {
            let stdout = io::stdout();
            let (_, summary) = calc.run(config.batch, BufWriter::new(stdout.lock()))?;
            summary
        }
        OutputSink::File(path) => {
            let file = File::create(path).map_err(|source| GulError::Io {
                path: path.clone(),
                source,
            })?;
            let (_, summary) = calc.run(config.batch, BufWriter::new(file))?;
            summary
        }
    };
    log::info!("{summary:?}");
    Ok(summary)
}
