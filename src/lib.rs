pub mod browser;
pub mod capture;
pub mod debug;
pub mod extractor;
pub mod models;
pub mod tui;
pub mod utils;
