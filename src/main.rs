use anyhow::Result;
use clap::Parser;
use lumafinder::capture::{self, CaptureOptions, DEFAULT_CAPTURE, DEFAULT_OUTPUT, DEFAULT_URL};
use lumafinder::tui::CaptureTUI;
use lumafinder::{debug, extractor, status_println, utils};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Capture Luma calendar responses and extract event fields")]
struct Args {
    /// Calendar page to open
    #[clap(long, default_value = DEFAULT_URL)]
    url: String,

    /// Temporary capture file path
    #[clap(long, default_value = DEFAULT_CAPTURE)]
    capture: PathBuf,

    /// Final extracted events JSON file
    #[clap(long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Also write the extracted events as CSV
    #[clap(long)]
    csv: Option<PathBuf>,

    /// Seconds of idle time to stop scrolling
    #[clap(long, default_value = "30")]
    timeout: u64,

    /// Upper bound in seconds for the whole scroll loop (unbounded if not set)
    #[clap(long)]
    max_wait: Option<u64>,

    /// Show the browser window (the browser runs headless unless this is given)
    #[clap(long)]
    headless: bool,

    /// Keep the intermediate capture file
    #[clap(long)]
    keep_capture: bool,

    /// Path to a Chrome/Chromium executable
    #[clap(long, env = "CHROME_EXECUTABLE")]
    browser: Option<PathBuf>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,

    /// Only print errors and the final summary
    #[clap(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    debug::set_debug(args.debug);
    debug::set_quiet(args.quiet);

    let options = CaptureOptions {
        url: args.url.clone(),
        capture_file: args.capture.clone(),
        idle_timeout: Duration::from_secs(args.timeout),
        max_wait: args.max_wait.map(Duration::from_secs),
        headless: !args.headless,
        browser_executable: args.browser.clone(),
        ..Default::default()
    };

    // Step 1: capture
    status_println!(
        "Starting browser capture of {} -> {} (idle timeout {}s)",
        options.url,
        options.capture_file.display(),
        args.timeout
    );

    let mut tui = CaptureTUI::new(options.idle_timeout);
    let tui = if args.quiet { None } else { Some(&mut tui) };

    let num_captures = match capture::capture_to_file(&options, tui).await {
        Ok(count) => count,
        Err(e) => match capture::exit_code_for(&e) {
            Some(code) => {
                eprintln!("{}", e);
                return Ok(ExitCode::from(code));
            }
            None => return Err(e),
        },
    };
    status_println!("Captured {} responses to {}", num_captures, options.capture_file.display());

    // Step 2: parse capture and write final output
    let (num_caps, events) = extractor::parse_capture_to_events(&args.capture)?;
    utils::save_events_to_json(&events, &args.output)?;
    if let Some(csv_path) = &args.csv {
        utils::save_events_to_csv(&events, csv_path)?;
        status_println!("Wrote CSV to {}", csv_path.display());
    }

    println!(
        "Extracted {} event records across {} captures -> {}",
        events.len(),
        num_caps,
        args.output.display()
    );

    if !args.keep_capture {
        utils::remove_capture_file(&args.capture);
    }

    Ok(ExitCode::SUCCESS)
}
