//! gymscore Library
//!
//! Extracts score tables from Olympic artistic gymnastics results PDFs and
//! writes them as flat CSV, one row per gymnast and apparatus.
//!
//! This library provides tools for:
//! - Reading positioned text out of PDF content streams
//! - Rebuilding visual lines and column bands from that text
//! - Parsing the apparatus final, team final and all-around final layouts
//! - Checking each total against its D and E scores
//! - Writing CSV atomically, scores kept exactly as printed

pub mod coerce;
pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod layout;
pub mod models;
pub mod parsers;
pub mod processor;
pub mod validate;
pub mod writer;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ApparatusStyle, CoercionPolicy, ParserConfig};
pub use error::{GymScoreError, Result};
pub use models::{Apparatus, ProcessingStats, ResultFormat, Score, ScoreCheck, ScoreRecord};
pub use processor::{ScoreProcessor, process_pdf};
