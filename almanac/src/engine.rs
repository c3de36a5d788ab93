//! Contact engine
//!
//! Drives the aggregator to quiescence, extracts contacts, reconciles them
//! into the persisted cache and reports each pass on an event channel.
//!
//! ```text
//! Initializing --start()--> Preparing --run()--> Quiescent
//!                                                    |
//!                          Idle <----------- Reconciling
//!                           |                        ^
//!                           +-------refresh()--------+
//! ```

use crate::aggregator::{Aggregator, QuiescentSignal};
use crate::avatar::AvatarStore;
use crate::cache::ContactCache;
use crate::config::AlmanacConfig;
use crate::contact::{CacheEntry, ContactBook, ContactRecord};
use crate::error::{AlmanacError, Result};
use crate::extract::Extractor;
use crate::reconcile::ReconcileReport;
use gtype_bridge::{ForeignRuntime, Marshaler};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Created, aggregator not yet asked to prepare
    Initializing,
    /// Waiting for the aggregator to settle
    Preparing,
    /// Aggregator settled; a pass is about to run
    Quiescent,
    /// Extracting and reconciling
    Reconciling,
    /// Pass finished; ready for a refresh
    Idle,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Initializing => "initializing",
            EngineState::Preparing => "preparing",
            EngineState::Quiescent => "quiescent",
            EngineState::Reconciling => "reconciling",
            EngineState::Idle => "idle",
        }
    }
}

/// Outcome of a pass
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Cache reconciled and written
    Completed(ReconcileReport),
    /// Nothing observed; cache left alone
    Skipped,
    /// The pass could not complete
    Failed(String),
}

pub struct ContactEngine<A: Aggregator> {
    aggregator: A,
    marshaler: Marshaler,
    cache: ContactCache,
    avatars: AvatarStore,
    state: EngineState,
    quiescent: Option<oneshot::Receiver<()>>,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl<A: Aggregator> ContactEngine<A> {
    /// Create an engine and load the cache named by `config`
    pub fn new(
        aggregator: A,
        runtime: Arc<dyn ForeignRuntime>,
        config: &AlmanacConfig,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (event_tx, event_rx) = mpsc::channel(config.engine.event_capacity.max(1));

        let engine = Self {
            aggregator,
            marshaler: Marshaler::new(runtime),
            cache: ContactCache::load(config.cache.cache_path()),
            avatars: AvatarStore::new(config.cache.avatar_dir()),
            state: EngineState::Initializing,
            quiescent: None,
            event_tx,
        };

        (engine, event_rx)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    pub fn cache(&self) -> &ContactCache {
        &self.cache
    }

    /// Merged contacts from the current cache
    pub fn contacts(&self) -> Vec<ContactRecord> {
        ContactBook::from_entries(self.cache.entries()).into_contacts()
    }

    /// Ask the aggregator to prepare. Returns immediately.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(EngineState::Initializing)?;

        let (tx, rx) = oneshot::channel();
        self.quiescent = Some(rx);
        self.state = EngineState::Preparing;

        if let Err(e) = self.aggregator.prepare(QuiescentSignal::new(tx)) {
            error!("Aggregator prepare failed: {}", e);
            self.quiescent = None;
            self.state = EngineState::Initializing;
            return Err(e);
        }

        info!("Waiting for aggregator to reach quiescence");
        Ok(())
    }

    /// Wait for quiescence, then run the first pass
    pub async fn run(&mut self) -> Result<ReconcileReport> {
        self.expect_state(EngineState::Preparing)?;

        let rx = self.quiescent.take().ok_or(AlmanacError::InvalidState {
            expected: EngineState::Preparing.as_str(),
            actual: "preparing without a pending signal",
        })?;

        if rx.await.is_err() {
            let err = AlmanacError::AggregatorUnavailable("quiescence signal dropped".into());
            error!("{}", err);
            self.state = EngineState::Initializing;
            self.emit(EngineEvent::Failed(err.to_string()));
            return Err(err);
        }

        info!("Aggregator quiescent");
        self.state = EngineState::Quiescent;
        self.pass()
    }

    /// Run another pass over the aggregator's current individuals
    pub fn refresh(&mut self) -> Result<ReconcileReport> {
        self.expect_state(EngineState::Idle)?;
        self.pass()
    }

    fn pass(&mut self) -> Result<ReconcileReport> {
        self.state = EngineState::Reconciling;
        let result = self.reconcile_observed();
        self.state = EngineState::Idle;

        match result {
            Ok(report) => {
                if report.skipped {
                    self.emit(EngineEvent::Skipped);
                } else {
                    info!(
                        "Contacts reconciled: {} updated, {} pruned, {} added",
                        report.updated, report.pruned, report.added
                    );
                    self.emit(EngineEvent::Completed(report));
                }
                Ok(report)
            }
            Err(e) => {
                if e.is_fatal() {
                    error!("Reconciliation failed: {}", e);
                } else {
                    warn!("Reconciliation failed: {}", e);
                }
                self.emit(EngineEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Extract, reconcile and persist. The cache is untouched on error.
    fn reconcile_observed(&mut self) -> Result<ReconcileReport> {
        let records = Extractor::new(&self.marshaler, &self.avatars).collect(&self.aggregator)?;
        let observed: Vec<CacheEntry> = records.iter().flat_map(ContactRecord::entries).collect();
        self.cache.apply(&observed)
    }

    fn expect_state(&self, expected: EngineState) -> Result<()> {
        if self.state != expected {
            return Err(AlmanacError::InvalidState {
                expected: expected.as_str(),
                actual: self.state.as_str(),
            });
        }
        Ok(())
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            debug!("Engine event not delivered: {}", e);
        }
    }
}
