//! Engine for per-order ("L4") exchange book feeds.
//!
//! Maintains the live order set from a snapshot-plus-diffs stream and
//! materializes two renderable views on a fixed cadence: price-aggregated
//! depth and a per-order heatmap with age-ranked brightness. Also supports a
//! one-shot offline build from a static snapshot payload.

pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod websocket;

pub use error::{LaminaError, Result};
