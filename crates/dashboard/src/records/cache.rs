//! The optimistic record cache.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::Value;
use tracing::{Span, debug, info, instrument, warn};

use contactdeck_core::{DomainRecord, NewContactInput, RecordId, normalize};

use crate::bridge::{ActionBridge, BridgeError};

use super::{CacheView, ClassifiedError, Phase, ResourceBinding, SyncError, classify};

/// Last-known records for one resource, with optimistic creates.
///
/// The bridge is passed per call rather than stored, so a cache can outlive
/// the credentials used for any single request.
///
/// State sits behind a short-lived lock that is never held across an
/// `.await`; every suspension point is a bridge call.
#[derive(Debug)]
pub struct RecordCache {
    binding: ResourceBinding,
    state: Mutex<CacheState>,
}

#[derive(Debug)]
struct CacheState {
    records: Vec<DomainRecord>,
    phase: Phase,
    error: Option<ClassifiedError>,
    /// Bumped by every list request, optimistic insert and rollback. A list
    /// response is only applied if the generation it started with is still
    /// current.
    generation: u64,
    /// At least one list request has succeeded.
    settled: bool,
    pending: Option<PendingCreate>,
}

#[derive(Debug)]
struct PendingCreate {
    provisional: RecordId,
    snapshot: Vec<DomainRecord>,
}

impl CacheState {
    fn view(&self) -> CacheView {
        CacheView {
            records: self.records.clone(),
            is_loading: self.phase == Phase::Loading,
            error: self.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

impl RecordCache {
    /// Create an empty, idle cache.
    #[must_use]
    pub fn new(binding: ResourceBinding) -> Self {
        Self {
            binding,
            state: Mutex::new(CacheState {
                records: Vec::new(),
                phase: Phase::Idle,
                error: None,
                generation: 0,
                settled: false,
                pending: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Snapshot of what presentation shows right now.
    #[must_use]
    pub fn view(&self) -> CacheView {
        self.lock().view()
    }

    /// Replace the records with the remote list.
    ///
    /// Responses superseded by a newer list request, or issued or arriving
    /// while a create is pending, are dropped and the current view is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Remote`] when the list action fails. Records are
    /// left as they were and the view carries the error message. If no list
    /// has ever succeeded the cache goes back to [`Phase::Idle`].
    #[instrument(skip_all, fields(connection = %self.binding.connection, generation = tracing::field::Empty))]
    pub async fn fetch<B: ActionBridge>(&self, bridge: &B) -> Result<CacheView, SyncError> {
        let generation = self.begin_fetch();
        Span::current().record("generation", generation);

        let guard = FetchGuard {
            cache: self,
            generation,
            armed: true,
        };
        let result = bridge
            .run(&self.binding.connection, &self.binding.list_action, None)
            .await
            .and_then(|output| records_from_output(&output));
        guard.disarm();

        self.finish_fetch(generation, result)
    }

    /// Validate `input`, show it immediately, then create it remotely.
    ///
    /// On success the provisional record is dropped and the list is fetched
    /// again so only server-confirmed ids remain. A failing reconcile is
    /// logged and reflected in the view's error, but the create still
    /// succeeded. On failure the records are restored to exactly what they
    /// were before the call.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Validation`] if the input is invalid (no remote call)
    /// - [`SyncError::MutationInFlight`] if another create is outstanding
    /// - [`SyncError::NotReady`] if no list request has succeeded yet
    /// - [`SyncError::Remote`] if the create action fails
    #[instrument(skip_all, fields(connection = %self.binding.connection))]
    pub async fn create<B: ActionBridge>(
        &self,
        bridge: &B,
        input: NewContactInput,
    ) -> Result<CacheView, SyncError> {
        let contact = input.validate().map_err(SyncError::Validation)?;
        let provisional = contact.provisional_record(Utc::now());
        let provisional_id = provisional.id.clone();

        self.begin_create(provisional)?;
        let guard = RollbackGuard {
            cache: self,
            provisional: Some(provisional_id.clone()),
        };

        let payload = contact.to_action_input();
        let result = bridge
            .run(
                &self.binding.connection,
                &self.binding.create_action,
                Some(&payload),
            )
            .await;
        guard.disarm();

        match result {
            Ok(_) => {
                self.confirm(&provisional_id);
                info!("Contact created, reconciling");

                Ok(self.fetch(bridge).await.unwrap_or_else(|err| {
                    warn!(error = %err, "Reconciling list failed after create");
                    self.view()
                }))
            }
            Err(err) => {
                warn!(error = %err, "Create action failed, rolling back");
                let classified = classify(&err);
                self.roll_back(&provisional_id, Some(classified.clone()));
                Err(SyncError::Remote(classified))
            }
        }
    }

    fn begin_fetch(&self) -> u64 {
        let mut state = self.lock();
        state.generation += 1;
        if state.pending.is_none() {
            state.phase = Phase::Loading;
        }
        state.generation
    }

    fn finish_fetch(
        &self,
        generation: u64,
        result: Result<Vec<DomainRecord>, BridgeError>,
    ) -> Result<CacheView, SyncError> {
        let mut state = self.lock();

        if state.generation != generation || state.pending.is_some() {
            debug!(current = state.generation, "Discarding superseded list response");
            return Ok(state.view());
        }

        match result {
            Ok(records) => {
                debug!(count = records.len(), "List applied");
                state.records = records;
                state.error = None;
                state.settled = true;
                state.phase = Phase::Ready;
                Ok(state.view())
            }
            Err(err) => {
                warn!(error = %err, "List action failed");
                let classified = classify(&err);
                state.error = Some(classified.clone());
                // Without a successful list there is nothing to show or roll
                // back to, so the next read loads again.
                state.phase = if state.settled {
                    Phase::Ready
                } else {
                    Phase::Idle
                };
                Err(SyncError::Remote(classified))
            }
        }
    }

    /// Restore the phase a dropped list request left behind.
    fn abandon_fetch(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation == generation && state.phase == Phase::Loading {
            state.phase = if state.settled {
                Phase::Ready
            } else {
                Phase::Idle
            };
        }
    }

    fn begin_create(&self, provisional: DomainRecord) -> Result<(), SyncError> {
        let mut state = self.lock();

        if state.pending.is_some() {
            return Err(SyncError::MutationInFlight);
        }
        if !state.settled {
            return Err(SyncError::NotReady);
        }

        let snapshot = state.records.clone();
        state.pending = Some(PendingCreate {
            provisional: provisional.id.clone(),
            snapshot,
        });
        state.records.push(provisional);
        // Any list still in flight predates the insert.
        state.generation += 1;
        state.phase = Phase::OptimisticPending;
        Ok(())
    }

    fn confirm(&self, provisional: &RecordId) {
        let mut state = self.lock();
        if state.pending.as_ref().is_some_and(|p| &p.provisional == provisional) {
            state.pending = None;
            state.records.retain(|record| &record.id != provisional);
            state.phase = Phase::Ready;
        }
    }

    fn roll_back(&self, provisional: &RecordId, error: Option<ClassifiedError>) {
        let mut state = self.lock();
        if !state.pending.as_ref().is_some_and(|p| &p.provisional == provisional) {
            return;
        }
        if let Some(pending) = state.pending.take() {
            state.records = pending.snapshot;
        }
        // A list issued while the create was pending must not replace the
        // snapshot or clear the create's error.
        state.generation += 1;
        state.phase = Phase::Ready;
        if error.is_some() {
            state.error = error;
        }
    }
}

/// Rolls a create back if its future is dropped before the bridge answers.
struct RollbackGuard<'a> {
    cache: &'a RecordCache,
    provisional: Option<RecordId>,
}

impl RollbackGuard<'_> {
    fn disarm(mut self) {
        self.provisional = None;
    }
}

impl Drop for RollbackGuard<'_> {
    fn drop(&mut self) {
        if let Some(provisional) = self.provisional.take() {
            warn!("Create abandoned before completion, rolling back");
            self.cache.roll_back(&provisional, None);
        }
    }
}

/// Leaves the cache out of `Loading` if a list future is dropped.
struct FetchGuard<'a> {
    cache: &'a RecordCache,
    generation: u64,
    armed: bool,
}

impl FetchGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.abandon_fetch(self.generation);
        }
    }
}

/// Normalize a list action's `output.records`.
///
/// Records without an id cannot be addressed and are skipped; a repeated id
/// keeps its first occurrence.
fn records_from_output(output: &Value) -> Result<Vec<DomainRecord>, BridgeError> {
    let raw = output
        .get("records")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            BridgeError::UnexpectedResponse("list output has no records array".to_string())
        })?;

    let mut seen = HashSet::new();
    let records: Vec<DomainRecord> = raw
        .iter()
        .map(normalize)
        .filter(|record| !record.id.as_str().is_empty())
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    if records.len() != raw.len() {
        debug!(
            received = raw.len(),
            kept = records.len(),
            "Dropped records without a usable id"
        );
    }

    Ok(records)
}
