use crate::capture::{parse_body, CaptureError, CaptureSession};
use crate::models::CapturedResponse;
use crate::{debug_eprintln, debug_println};
use anyhow::{Context, Result};
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::JoinHandle;

const SCROLL_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight)";

#[cfg(target_os = "linux")]
const BROWSER_CANDIDATES: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/brave-browser",
    "/snap/bin/chromium",
];

#[cfg(target_os = "macos")]
const BROWSER_CANDIDATES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
];

#[cfg(target_os = "windows")]
const BROWSER_CANDIDATES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const BROWSER_CANDIDATES: &[&str] = &[];

/// Locate a Chromium-based browser. An explicitly given path must exist;
/// otherwise the usual install locations are probed.
pub fn find_browser_executable(explicit: Option<&Path>) -> Result<PathBuf, CaptureError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(CaptureError::BrowserUnavailable {
            reason: format!("browser executable {} does not exist", path.display()),
        });
    }

    BROWSER_CANDIDATES
        .iter()
        .map(Path::new)
        .find(|candidate| candidate.exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| CaptureError::BrowserUnavailable {
            reason: "no Chrome, Chromium, Brave or Edge executable found".to_string(),
        })
}

struct PendingResponse {
    request_id: RequestId,
    url: String,
    status: i64,
}

pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    observer_task: Option<JoinHandle<()>>,
}

impl BrowserSession {
    pub async fn launch(executable: &Path, headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder().chrome_executable(executable).no_sandbox();
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(CaptureError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| CaptureError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug_eprintln!("Browser handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("Failed to open a browser page")?;

        Ok(Self {
            browser,
            page,
            handler_task,
            observer_task: None,
        })
    }

    /// Start forwarding every finished response whose URL contains `url_marker`.
    /// Must be called before [`BrowserSession::goto`].
    pub async fn observe(&mut self, url_marker: &str) -> Result<UnboundedReceiver<CapturedResponse>> {
        let mut received = self.page.event_listener::<EventResponseReceived>().await?;
        let mut finished = self.page.event_listener::<EventLoadingFinished>().await?;
        let mut failed = self.page.event_listener::<EventLoadingFailed>().await?;

        let (sender, receiver) = unbounded_channel();
        let page = self.page.clone();
        let marker = url_marker.to_string();

        let task = tokio::spawn(async move {
            // Bodies are only retrievable once loading has finished.
            let mut pending: HashMap<String, PendingResponse> = HashMap::new();

            loop {
                tokio::select! {
                    Some(event) = received.next() => {
                        if event.response.url.contains(&marker) {
                            debug_println!("Matched response {} ({})", event.response.url, event.response.status);
                            pending.insert(
                                event.request_id.inner().clone(),
                                PendingResponse {
                                    request_id: event.request_id.clone(),
                                    url: event.response.url.clone(),
                                    status: event.response.status,
                                },
                            );
                        }
                    }
                    Some(event) = finished.next() => {
                        let Some(response) = pending.remove(event.request_id.inner()) else {
                            continue;
                        };
                        let url = response.url.clone();
                        match fetch_captured(&page, response).await {
                            Ok(captured) => {
                                if sender.send(captured).is_err() {
                                    break;
                                }
                            }
                            Err(e) => eprintln!("Skipping response {}: {:#}", url, e),
                        }
                    }
                    Some(event) = failed.next() => {
                        if let Some(response) = pending.remove(event.request_id.inner()) {
                            debug_eprintln!("Response {} failed to load: {}", response.url, event.error_text);
                        }
                    }
                    else => break,
                }
            }
        });

        self.observer_task = Some(task);
        Ok(receiver)
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        self.page
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;
        Ok(())
    }

    pub async fn close(mut self) -> Result<()> {
        if let Some(task) = self.observer_task.take() {
            task.abort();
        }
        self.browser.close().await?;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        Ok(())
    }
}

impl CaptureSession for BrowserSession {
    async fn scroll_to_bottom(&self) -> Result<()> {
        self.page
            .evaluate(SCROLL_SCRIPT)
            .await
            .context("Failed to scroll page")?;
        Ok(())
    }
}

async fn fetch_captured(page: &Page, response: PendingResponse) -> Result<CapturedResponse> {
    let returns = page
        .execute(GetResponseBodyParams::new(response.request_id))
        .await?
        .result;

    let text = decode_body(returns.body, returns.base64_encoded)
        .with_context(|| format!("Undecodable body for {}", response.url))?;

    Ok(CapturedResponse {
        url: response.url,
        status: response.status,
        body: parse_body(&text),
    })
}

/// Body text as CDP hands it over. Invalid UTF-8 is replaced, not rejected.
pub fn decode_body(body: String, base64_encoded: bool) -> Result<String> {
    if !base64_encoded {
        return Ok(body);
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.as_bytes())
        .context("Response body is not valid base64")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_plain_body_passes_through() {
        let body = r#"{"entries": []}"#.to_string();
        assert_eq!(decode_body(body.clone(), false).unwrap(), body);
    }

    #[test]
    fn test_base64_json_body() {
        let encoded = encode(br#"{"entries": [{"event": {"name": "Buenos Aires Meetup"}}]}"#);

        let text = decode_body(encoded, true).unwrap();
        assert_eq!(
            parse_body(&text),
            json!({"entries": [{"event": {"name": "Buenos Aires Meetup"}}]})
        );
    }

    #[test]
    fn test_base64_non_json_body_becomes_raw_text() {
        let text = decode_body(encode(b"<html>Bad Gateway</html>"), true).unwrap();
        assert_eq!(parse_body(&text), json!({"raw_text": "<html>Bad Gateway</html>"}));
    }

    #[test]
    fn test_base64_invalid_utf8_is_replaced() {
        let text = decode_body(encode(&[b'o', b'k', 0xff]), true).unwrap();
        assert_eq!(text, "ok\u{fffd}");
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        assert!(decode_body("not base64 at all!".to_string(), true).is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_browser_executable(Some(&dir.path().join("chrome"))).unwrap_err();
        assert!(matches!(err, CaptureError::BrowserUnavailable { .. }));
        assert!(err.to_string().contains("--browser"));
    }

    #[test]
    fn test_explicit_existing_path_is_used() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let found = find_browser_executable(Some(file.path())).unwrap();
        assert_eq!(found, file.path());
    }
}
