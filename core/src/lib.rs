//! Donor & giving engagement analytics.
//!
//! Turns a donation ledger into retention metrics, giving-trend buckets,
//! donor tiers and engagement alerts. Everything is recomputed per call from
//! the ledger; nothing computed here is stored.

pub mod alerts;
pub mod clock;
pub mod cohort;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod period;
pub mod ratio;
pub mod rng;
pub mod segmentation;
pub mod store;
pub mod summary;
pub mod synthetic;
pub mod trend;
pub mod types;
