//! In-memory sample storage and aggregation.
//!
//! Each target owns one fixed-size ring of recent probe samples; summaries are
//! recomputed from a snapshot on every query.

mod models;
mod ring;
mod summary;

pub use models::*;
pub use ring::*;
pub use summary::*;
