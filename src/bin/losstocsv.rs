//! Decode a ground-up loss stream to CSV.
//!
//! Usage:
//!   gulcalc -e 1 1 -a settings.json -p input | losstocsv > gul.csv
//!   losstocsv gul.bin -o gul.csv

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use gulcalc::stream::{LossRecord, LossStreamReader};

#[derive(Debug, Parser)]
#[command(name = "losstocsv", version, about = "Decode a ground-up loss stream to CSV")]
struct Cli {
    /// Loss stream file. Reads standard input when omitted.
    input: Option<PathBuf>,

    /// CSV destination. Writes standard output when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Leave out the -3, -2 and -1 statistic rows.
    #[arg(long)]
    samples_only: bool,
}

#[derive(Serialize)]
struct Row {
    event_id: i32,
    item_id: i32,
    sidx: i32,
    loss: f32,
}

impl From<&LossRecord> for Row {
    fn from(record: &LossRecord) -> Self {
        Row {
            event_id: record.event_id.0,
            item_id: record.item_id.0,
            sidx: record.sidx.to_wire(),
            loss: record.loss,
        }
    }
}

fn convert(source: impl Read, sink: impl Write, samples_only: bool) -> Result<usize> {
    let mut reader = LossStreamReader::new(source).context("reading stream header")?;
    log::info!("number_of_samples = {}", reader.header().number_of_samples);

    let mut writer = csv::Writer::from_writer(sink);
    let mut rows = 0;
    while let Some(group) = reader.next_group()? {
        for record in &group {
            if samples_only && record.sidx.to_wire() < 0 {
                continue;
            }
            writer.serialize(Row::from(record))?;
            rows += 1;
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let source: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };
    let sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let rows = convert(source, sink, cli.samples_only)?;
    log::info!("wrote {rows} rows");
    Ok(())
}
