use anyhow::Result;
use clap::Parser;
use lumafinder::capture::{self, CaptureOptions, DEFAULT_CAPTURE, DEFAULT_URL};
use lumafinder::debug;
use lumafinder::tui::CaptureTUI;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Capture Luma calendar API responses to a file")]
struct Args {
    /// Calendar page to open
    #[clap(long, default_value = DEFAULT_URL)]
    url: String,

    /// Capture file path
    #[clap(long, default_value = DEFAULT_CAPTURE)]
    capture: PathBuf,

    /// Seconds of idle time to stop scrolling
    #[clap(long, default_value = "30")]
    timeout: u64,

    /// Upper bound in seconds for the whole scroll loop
    #[clap(long)]
    max_wait: Option<u64>,

    /// Show the browser window
    #[clap(long)]
    headless: bool,

    /// Path to a Chrome/Chromium executable
    #[clap(long, env = "CHROME_EXECUTABLE")]
    browser: Option<PathBuf>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    debug::set_debug(args.debug);

    let options = CaptureOptions {
        url: args.url,
        capture_file: args.capture,
        idle_timeout: Duration::from_secs(args.timeout),
        max_wait: args.max_wait.map(Duration::from_secs),
        headless: !args.headless,
        browser_executable: args.browser,
        ..Default::default()
    };

    let mut tui = CaptureTUI::new(options.idle_timeout);
    match capture::capture_to_file(&options, Some(&mut tui)).await {
        Ok(count) => {
            println!("Captured {} responses to {}", count, options.capture_file.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => match capture::exit_code_for(&e) {
            Some(code) => {
                eprintln!("{}", e);
                Ok(ExitCode::from(code))
            }
            None => Err(e),
        },
    }
}
