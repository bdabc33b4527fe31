//! Checkpointed catalog scraper.
//!
//! Walks a cursor-paginated music catalog, extracts a deduplicated artist
//! map and a deduplicated album map, persists each stage as a resumable
//! JSON checkpoint, and bulk-downloads one cover image per album with
//! per-item failure isolation.

pub mod app;
pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod cursor;
pub mod download;
pub mod error;
pub mod extract;
pub mod fs_util;
pub mod model;
pub mod output;
