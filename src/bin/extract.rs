use anyhow::Result;
use clap::Parser;
use lumafinder::capture::{DEFAULT_CAPTURE, DEFAULT_OUTPUT};
use lumafinder::{debug, extractor, utils};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Extract flat event records from a capture file")]
struct Args {
    /// Capture file written by luma-capture
    #[clap(long, default_value = DEFAULT_CAPTURE)]
    capture: PathBuf,

    /// Extracted events JSON file
    #[clap(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write the extracted events as CSV
    #[clap(long)]
    csv: Option<PathBuf>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    debug::set_debug(args.debug);

    let (num_caps, events) = extractor::parse_capture_to_events(&args.capture)?;
    utils::save_events_to_json(&events, &args.output)?;

    if let Some(csv_path) = &args.csv {
        utils::save_events_to_csv(&events, csv_path)?;
        println!("Wrote CSV to {}", csv_path.display());
    }

    println!(
        "Extracted {} event records across {} captures -> {}",
        events.len(),
        num_caps,
        args.output.display()
    );

    Ok(())
}
