use crate::browser::{self, BrowserSession};
use crate::models::CapturedResponse;
use crate::tui::CaptureTUI;
use crate::{debug_eprintln, debug_println, utils};
use anyhow::Result;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};
use tokio::time::{sleep, Instant};

/// Responses whose URL contains this marker are captured.
pub const API_URL_PART: &str = "api2.luma.com/calendar/get";
pub const DEFAULT_URL: &str = "https://luma.com/devconnect";
pub const DEFAULT_CAPTURE: &str = "all_responses.json";
pub const DEFAULT_OUTPUT: &str = "events_all_extracted.json";

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub url: String,
    pub capture_file: PathBuf,
    /// Stop scrolling once no new response has arrived for this long.
    pub idle_timeout: Duration,
    pub scroll_interval: Duration,
    /// Optional hard cap on the whole scroll loop.
    pub max_wait: Option<Duration>,
    pub headless: bool,
    pub browser_executable: Option<PathBuf>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            capture_file: PathBuf::from(DEFAULT_CAPTURE),
            idle_timeout: Duration::from_secs(30),
            scroll_interval: Duration::from_secs(1),
            max_wait: None,
            headless: true,
            browser_executable: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("browser automation unavailable: {reason}. Install Google Chrome or Chromium, or pass --browser <path> (or set CHROME_EXECUTABLE)")]
    BrowserUnavailable { reason: String },

    #[error("browser launch failed: {0}")]
    Launch(String),
}

/// Process exit code when no browser can be driven.
pub const EXIT_BROWSER_UNAVAILABLE: u8 = 3;

/// Exit code a binary should use for `err`, if it is one with a dedicated code.
pub fn exit_code_for(err: &anyhow::Error) -> Option<u8> {
    match err.downcast_ref::<CaptureError>() {
        Some(CaptureError::BrowserUnavailable { .. }) => Some(EXIT_BROWSER_UNAVAILABLE),
        _ => None,
    }
}

/// What the scroll loop needs from a page.
#[allow(async_fn_in_trait)]
pub trait CaptureSession {
    async fn scroll_to_bottom(&self) -> Result<()>;
}

/// Parse a response body as JSON, keeping unparseable text as `{"raw_text": ...}`.
pub fn parse_body(text: &str) -> Value {
    match utils::from_json_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug_println!("Response body is not JSON ({}), keeping raw text", e);
            json!({ "raw_text": text })
        }
    }
}

/// Scroll until no new response has been received for `idle_timeout`
/// (or `max_wait` has elapsed, if set, or the observer side of the channel
/// is gone). Returns captures in arrival order.
pub async fn run_scroll_loop<S: CaptureSession>(
    session: &S,
    receiver: &mut UnboundedReceiver<CapturedResponse>,
    options: &CaptureOptions,
    mut tui: Option<&mut CaptureTUI>,
) -> Result<Vec<CapturedResponse>> {
    let mut captured = Vec::new();
    let started = Instant::now();
    let mut idle_since = started;
    let mut last_count = 0;

    loop {
        session.scroll_to_bottom().await?;
        sleep(options.scroll_interval).await;

        let mut observer_closed = false;
        loop {
            match receiver.try_recv() {
                Ok(response) => captured.push(response),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    observer_closed = true;
                    break;
                }
            }
        }

        let now = Instant::now();
        if captured.len() > last_count {
            debug_println!("Captured {} new responses", captured.len() - last_count);
            last_count = captured.len();
            idle_since = now;
        }

        let idle = now.duration_since(idle_since);
        if let Some(tui) = tui.as_mut() {
            if let Err(e) = tui.update_progress(captured.len(), idle) {
                debug_eprintln!("Progress display failed: {}", e);
            }
        }

        if observer_closed {
            debug_println!("Response observer stopped, nothing more can arrive");
            break;
        }

        if idle > options.idle_timeout {
            debug_println!("No new responses for {:?}, stopping", idle);
            break;
        }

        if let Some(max_wait) = options.max_wait {
            if now.duration_since(started) >= max_wait {
                debug_println!("Reached maximum wait of {:?}, stopping", max_wait);
                break;
            }
        }
    }

    Ok(captured)
}

/// Open `options.url`, capture every calendar API response while scrolling and
/// write them to `options.capture_file`. Returns the number of captures.
///
/// Fails with [`CaptureError::BrowserUnavailable`] before anything is
/// launched or written when no browser executable can be found.
pub async fn capture_to_file(options: &CaptureOptions, mut tui: Option<&mut CaptureTUI>) -> Result<usize> {
    let executable = browser::find_browser_executable(options.browser_executable.as_deref())?;
    debug_println!("Using browser executable: {}", executable.display());

    let mut session = BrowserSession::launch(&executable, options.headless).await?;

    // The observer must be attached before navigation or the first page of
    // results is missed.
    let mut receiver = session.observe(API_URL_PART).await?;

    if let Some(tui) = tui.as_mut() {
        if let Err(e) = tui.start_capture(&options.url) {
            debug_eprintln!("Progress display failed: {}", e);
        }
    }
    session.goto(&options.url).await?;

    let result = run_scroll_loop(&session, &mut receiver, options, tui.as_deref_mut()).await;

    if let Err(e) = session.close().await {
        debug_eprintln!("Error closing browser: {}", e);
    }

    let captured = result?;
    if let Some(tui) = tui.as_mut() {
        if let Err(e) = tui.finish_capture(captured.len()) {
            debug_eprintln!("Progress display failed: {}", e);
        }
    }

    utils::save_captures(&captured, &options.capture_file)?;
    Ok(captured.len())
}
