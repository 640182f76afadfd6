//! gulcalc: ground-up loss for one event batch.
//!
//! Usage:
//!   gulcalc -e 1 4 -a analysis_settings.json -p input -i gul.bin
//!   gulcalc -e 2 4 -a analysis_settings.json -p input -s model/static -f complex_items.csv > gul.bin

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use gulcalc::batch::EventBatch;
use gulcalc::config::{AnalysisSettings, InputFiles, OutputSink, RunConfig};
use gulcalc::pipeline;

#[derive(Debug, Parser)]
#[command(name = "gulcalc", version, about = "Ground-up loss sampling for one event batch")]
struct Cli {
    /// Batch index (1-based) and total number of batches.
    #[arg(short = 'e', long, num_args = 2, value_names = ["INDEX", "COUNT"], required = true)]
    event_batch: Vec<u32>,

    /// Analysis settings JSON holding number_of_samples.
    #[arg(short = 'a', long)]
    analysis_settings_file: PathBuf,

    /// Directory holding events.csv and the items file.
    #[arg(short = 'p', long)]
    inputs_directory: PathBuf,

    /// Directory holding the model files and coverages. Defaults to `static` next to the inputs directory.
    #[arg(short = 's', long)]
    static_directory: Option<PathBuf>,

    /// Items file name inside the inputs directory.
    #[arg(short = 'f', long)]
    items_filename: Option<String>,

    /// Loss stream destination, `-` for standard output.
    #[arg(short = 'i', long, default_value = "-")]
    loss_output_stream: String,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let batch = EventBatch::new(cli.event_batch[0], cli.event_batch[1])?;
    let settings = AnalysisSettings::load(&cli.analysis_settings_file)?;
    log::info!("number_of_samples = {}", settings.number_of_samples);

    let config = RunConfig {
        batch,
        settings,
        inputs: InputFiles::new(
            &cli.inputs_directory,
            cli.static_directory.as_deref(),
            cli.items_filename.as_deref(),
        ),
        output: OutputSink::from(cli.loss_output_stream.as_str()),
    };

    pipeline::run(&config)
        .with_context(|| format!("batch {} of {} failed", batch.index(), batch.count()))?;
    Ok(())
}
