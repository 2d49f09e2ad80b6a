// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pending-call registry: the correlation table of one requester.
//!
//! Maps each outstanding [`SampleIdentity`] to how its reply should be
//! delivered:
//!
//! - `Idle` — request sent, nobody waiting yet; an arriving reply parks as
//!   `Ready` for a later `take`/`wait`
//! - `Waiting` — a blocked `receive_reply` call owns a rendezvous cell
//! - `Promised` — the async path owns a one-shot promise
//!
//! An entry is removed atomically with the delivery of its reply, so a reply
//! resolves its waiter exactly once. Replies for identities not in the table
//! (never sent, or already resolved) are protocol noise and are dropped with
//! a debug log.

use crate::error::{RpcError, RpcResult};
use crate::future::Promise;
use crate::types::{ReplyEnvelope, Sample, SampleIdentity};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

type ReplySample<TRep> = Sample<ReplyEnvelope<TRep>>;

/// Rendezvous slot for one blocking waiter.
struct WaitCell<TRep> {
    slot: Mutex<Option<RpcResult<ReplySample<TRep>>>>,
    cond: Condvar,
}

impl<TRep> WaitCell<TRep> {
    fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Fill the slot and wake the waiter. Called under the map entry lock
    /// so a timing-out waiter always observes either the entry or the value.
    fn fill(&self, result: RpcResult<ReplySample<TRep>>) {
        *self.slot.lock() = Some(result);
        self.cond.notify_one();
    }
}

enum Pending<TRep> {
    Idle,
    Ready(ReplySample<TRep>),
    Waiting(Arc<WaitCell<TRep>>),
    Promised(Promise<ReplySample<TRep>>),
}

/// Correlation table owned by one [`crate::requester::Requester`].
pub struct PendingCallRegistry<TRep: Send + 'static> {
    map: DashMap<SampleIdentity, Pending<TRep>>,
}

impl<TRep: Send + 'static> PendingCallRegistry<TRep> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    /// Number of live (unresolved) entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Track a freshly sent request on the synchronous path.
    pub(crate) fn register_idle(&self, id: SampleIdentity) {
        let prior = self.map.insert(id, Pending::Idle);
        debug_assert!(prior.is_none(), "identity reused while outstanding");
    }

    /// Track a freshly sent request on the async path. Must be installed
    /// before the request is published so the reply cannot race past it.
    pub(crate) fn register_promise(&self, id: SampleIdentity, promise: Promise<ReplySample<TRep>>) {
        let prior = self.map.insert(id, Pending::Promised(promise));
        debug_assert!(prior.is_none(), "identity reused while outstanding");
    }

    /// Forget an entry (send failure or abandoned call). The promise, if
    /// any, is dropped and fails its future. Returns `false` when nothing
    /// was outstanding under `id`.
    pub(crate) fn discard(&self, id: SampleIdentity) -> bool {
        self.map.remove(&id).is_some()
    }

    /// Deliver a reply to whoever is registered for `id`.
    pub(crate) fn route_reply(&self, id: SampleIdentity, sample: ReplySample<TRep>) {
        let promised = match self.map.entry(id) {
            Entry::Vacant(_) => {
                log::debug!(
                    "dropping reply for unknown or resolved request seq={}",
                    id.sequence_number
                );
                return;
            }
            Entry::Occupied(mut e) => match std::mem::replace(e.get_mut(), Pending::Idle) {
                Pending::Idle => {
                    *e.get_mut() = Pending::Ready(sample);
                    return;
                }
                Pending::Ready(first) => {
                    // Keep the first reply, drop the duplicate.
                    log::debug!(
                        "dropping duplicate reply for request seq={}",
                        id.sequence_number
                    );
                    *e.get_mut() = Pending::Ready(first);
                    return;
                }
                Pending::Waiting(cell) => {
                    cell.fill(Ok(sample));
                    e.remove();
                    return;
                }
                Pending::Promised(p) => {
                    e.remove();
                    p
                }
            },
        };
        // Run promise continuations outside the map lock.
        promised.complete(Ok(sample));
    }

    /// Fail the entry for `id` (async timeout, shutdown). Returns `false`
    /// if the entry was already resolved.
    pub(crate) fn fail(&self, id: SampleIdentity, err: RpcError) -> bool {
        let promised = match self.map.entry(id) {
            Entry::Vacant(_) => return false,
            Entry::Occupied(mut e) => match std::mem::replace(e.get_mut(), Pending::Idle) {
                Pending::Promised(p) => {
                    e.remove();
                    Some(p)
                }
                Pending::Waiting(cell) => {
                    cell.fill(Err(err.clone()));
                    e.remove();
                    None
                }
                Pending::Idle | Pending::Ready(_) => {
                    e.remove();
                    None
                }
            },
        };
        if let Some(p) = promised {
            p.complete(Err(err));
        }
        true
    }

    /// Fail every live entry (requester shutdown).
    pub(crate) fn fail_all(&self, err: &RpcError) {
        let ids: Vec<SampleIdentity> = self.map.iter().map(|e| *e.key()).collect();
        for id in ids {
            self.fail(id, err.clone());
        }
    }

    /// Non-blocking poll for a parked reply.
    pub(crate) fn take(&self, id: SampleIdentity) -> RpcResult<Option<ReplySample<TRep>>> {
        match self.map.entry(id) {
            Entry::Vacant(_) => Err(RpcError::UnknownRequest(id)),
            Entry::Occupied(mut e) => match std::mem::replace(e.get_mut(), Pending::Idle) {
                Pending::Ready(sample) => {
                    e.remove();
                    Ok(Some(sample))
                }
                Pending::Idle => Ok(None),
                other => {
                    *e.get_mut() = other;
                    Err(RpcError::Internal("reply already awaited".to_string()))
                }
            },
        }
    }

    /// Block up to `timeout` for the reply to `id`. `Ok(None)` on timeout;
    /// the entry reverts to `Idle` so the caller can retry.
    pub(crate) fn wait(
        &self,
        id: SampleIdentity,
        timeout: Duration,
    ) -> RpcResult<Option<ReplySample<TRep>>> {
        let cell = match self.map.entry(id) {
            Entry::Vacant(_) => return Err(RpcError::UnknownRequest(id)),
            Entry::Occupied(mut e) => match std::mem::replace(e.get_mut(), Pending::Idle) {
                Pending::Ready(sample) => {
                    e.remove();
                    return Ok(Some(sample));
                }
                Pending::Idle => {
                    if timeout.is_zero() {
                        return Ok(None);
                    }
                    let cell = Arc::new(WaitCell::new());
                    *e.get_mut() = Pending::Waiting(cell.clone());
                    cell
                }
                other => {
                    *e.get_mut() = other;
                    return Err(RpcError::Internal("reply already awaited".to_string()));
                }
            },
        };

        // Block outside the map lock.
        let deadline = Instant::now() + timeout;
        {
            let mut slot = cell.slot.lock();
            while slot.is_none() {
                if cell.cond.wait_until(&mut slot, deadline).timed_out() {
                    break;
                }
            }
            if let Some(result) = slot.take() {
                return result.map(Some);
            }
        }

        // Timed out: revert to Idle unless the reply pump won the race.
        match self.map.entry(id) {
            Entry::Occupied(mut e) => {
                if let Pending::Waiting(current) = e.get() {
                    if Arc::ptr_eq(current, &cell) {
                        *e.get_mut() = Pending::Idle;
                        return Ok(None);
                    }
                }
            }
            Entry::Vacant(_) => {}
        }
        // Entry gone: the pump filled the cell between timeout and relock.
        if let Some(result) = cell.slot.lock().take() {
            return result.map(Some);
        }
        Ok(None)
    }
}

impl<TRep: Send + 'static> Default for PendingCallRegistry<TRep> {
    fn default() -> Self {
        Self::new()
    }
}
