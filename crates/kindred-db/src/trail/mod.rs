//! JSONL mutation trail.
//!
//! One line per committed mutation, grouped into per-day files under the
//! configured trail directory.

pub mod writer;
