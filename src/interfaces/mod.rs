//! Batch surface: CSV in, JSON lines out.

pub mod csv;
pub mod jsonl;
