//! NeuroReport — structured health reports from EEG/PPG session metrics.
//!
//! The crate turns free-text LLM completions into structurally complete
//! report objects: candidate extraction, textual sanitization, validation,
//! structural repair, and fallback synthesis, driven by a bounded retry
//! runner. Finished reports are archived in a local SQLite store.

pub mod analysis;
pub mod config;
pub mod norms;
pub mod report;
