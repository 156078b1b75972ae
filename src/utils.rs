use crate::debug_eprintln;
use crate::models::{CapturedResponse, ExtractedEvent};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `value` as indented UTF-8 JSON, replacing any existing file.
pub fn save_json_pretty<T: Serialize + ?Sized, P: AsRef<Path>>(value: &T, output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize JSON to {}", path.display()))?;
    writer.flush()?;

    Ok(())
}

/// Parse JSON without serde_json's nesting limit. Deep documents grow the
/// stack on demand instead of failing.
pub fn from_json_str<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let value = <T as Deserialize>::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(value)
}

pub fn save_captures<P: AsRef<Path>>(captures: &[CapturedResponse], output_path: P) -> Result<()> {
    save_json_pretty(captures, output_path)
}

pub fn load_captures<P: AsRef<Path>>(input_path: P) -> Result<Vec<CapturedResponse>> {
    let path = input_path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file: {}", path.display()))?;

    from_json_str(&content)
        .with_context(|| format!("Capture file is not a JSON array of responses: {}", path.display()))
}

pub fn save_events_to_json<P: AsRef<Path>>(events: &[ExtractedEvent], output_path: P) -> Result<()> {
    save_json_pretty(events, output_path)
}

pub fn save_events_to_csv<P: AsRef<Path>>(events: &[ExtractedEvent], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(ExtractedEvent::CSV_HEADERS)?;

    for event in events {
        writer.write_record(&event.to_csv_record())?;
    }

    writer.flush()?;
    Ok(())
}

/// Best effort: a capture file that is already gone is not an error.
pub fn remove_capture_file<P: AsRef<Path>>(capture_path: P) {
    let path = capture_path.as_ref();
    if let Err(e) = fs::remove_file(path) {
        debug_eprintln!("Could not remove capture file {}: {}", path.display(), e);
    }
}
