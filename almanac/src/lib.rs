//! # Almanac
//!
//! Contact aggregation and reconciliation on top of `gtype-bridge`.
//!
//! Almanac waits for the foreign contact aggregator to settle, extracts
//! every individual with a phone number, and merges the result into a
//! persisted per-number cache. Entries from other producers survive a pass;
//! local entries that disappeared from the aggregator are dropped.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use almanac::{ContactEngine, EngineEvent};
//!
//! let (mut engine, mut events) = ContactEngine::new(aggregator, runtime, &config);
//! engine.start()?;
//! engine.run().await?;
//!
//! for contact in engine.contacts() {
//!     println!("{}: {} numbers", contact.name, contact.numbers.len());
//! }
//! ```

pub mod aggregator;
pub mod avatar;
pub mod cache;
pub mod config;
pub mod contact;
pub mod engine;
pub mod error;
pub mod extract;
pub mod reconcile;

#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, Avatar, FieldDetails, Individual, QuiescentSignal};
pub use cache::ContactCache;
pub use config::{load_config, AlmanacConfig};
pub use contact::{CacheEntry, ContactBook, ContactRecord, Origin, PhoneNumber};
pub use engine::{ContactEngine, EngineEvent, EngineState};
pub use error::{AlmanacError, Result};
pub use extract::{Extractor, FieldDetail};
pub use reconcile::{reconcile, ReconcileReport};
