// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client-side half of one RPC channel.
//!
//! A [`Requester`] stamps every outgoing request with a fresh
//! [`SampleIdentity`] (per-requester GUID + monotonic sequence counter) and
//! correlates incoming replies back through its [`PendingCallRegistry`].
//! Two bounded background threads serve every outstanding call:
//!
//! - the *reply pump* drains the transport and routes each reply to its
//!   registry entry (blocking waiter, parked slot, or async promise)
//! - the *timeout thread* fails async promises whose reply budget expired
//!
//! No thread is spawned per call.

use crate::error::{RpcError, RpcResult};
use crate::future::{promise_pair, RpcFuture};
use crate::params::RequesterParams;
use crate::pending::PendingCallRegistry;
use crate::transport::RequestEndpoint;
use crate::types::{
    Guid, ReplyEnvelope, RequestEnvelope, RequestHeader, Sample, SampleIdentity,
};
use parking_lot::{Condvar, Mutex};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Deadline queue feeding the timeout thread.
struct TimeoutQueue {
    heap: Mutex<BinaryHeap<Reverse<(Instant, SampleIdentity)>>>,
    cond: Condvar,
}

impl TimeoutQueue {
    fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            cond: Condvar::new(),
        }
    }

    fn push(&self, deadline: Instant, id: SampleIdentity) {
        self.heap.lock().push(Reverse((deadline, id)));
        self.cond.notify_one();
    }

    fn notify(&self) {
        self.cond.notify_one();
    }
}

/// Client-side endpoint of one typed RPC channel.
///
/// `TReq`/`TRep` are the request and reply payload unions of one service
/// interface. The requester is `Sync`: any number of threads may issue
/// calls concurrently, each correlated independently.
pub struct Requester<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + Sync + 'static,
{
    service_name: String,
    instance_name: Mutex<Option<String>>,
    writer_guid: Guid,
    sequence: AtomicI64,
    endpoint: Arc<dyn RequestEndpoint<TReq, TRep>>,
    registry: Arc<PendingCallRegistry<TRep>>,
    timeouts: Arc<TimeoutQueue>,
    reply_timeout: Duration,
    suppress_flag: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
}

impl<TReq, TRep> Requester<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + Sync + 'static,
{
    /// Create a requester over `endpoint`, spawning its background threads.
    pub fn new(
        endpoint: impl RequestEndpoint<TReq, TRep>,
        params: RequesterParams,
    ) -> RpcResult<Self> {
        let endpoint: Arc<dyn RequestEndpoint<TReq, TRep>> = Arc::new(endpoint);
        let registry = Arc::new(PendingCallRegistry::new());
        let timeouts = Arc::new(TimeoutQueue::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let suppress_invalid = Arc::new(AtomicBool::new(true));

        let pump = {
            let endpoint = endpoint.clone();
            let registry = registry.clone();
            let shutdown = shutdown.clone();
            let suppress_invalid = suppress_invalid.clone();
            let poll = params.get_poll_interval();
            thread::Builder::new()
                .name("ddsrpc-reply-pump".to_string())
                .spawn(move || run_pump(&*endpoint, &registry, &shutdown, &suppress_invalid, poll))
                .map_err(|e| RpcError::Internal(format!("failed to spawn reply pump: {}", e)))?
        };

        let timer = {
            let registry = registry.clone();
            let timeouts = timeouts.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("ddsrpc-timeout".to_string())
                .spawn(move || run_timer(&timeouts, &registry, &shutdown))
                .map_err(|e| RpcError::Internal(format!("failed to spawn timeout thread: {}", e)))?
        };

        Ok(Self {
            service_name: params.get_service_name().to_string(),
            instance_name: Mutex::new(params.get_instance_name().map(str::to_string)),
            writer_guid: Guid::generate(),
            sequence: AtomicI64::new(0),
            endpoint,
            registry,
            timeouts,
            reply_timeout: params.get_reply_timeout(),
            suppress_flag: suppress_invalid,
            shutdown,
            pump: Some(pump),
            timer: Some(timer),
        })
    }

    /// Send one request. Returns the identity to correlate its reply.
    pub fn send_request(&self, payload: TReq) -> RpcResult<SampleIdentity> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(RpcError::Shutdown);
        }

        let id = self.next_identity();
        self.registry.register_idle(id);
        if let Err(e) = self.endpoint.publish_request(self.envelope(id, payload)) {
            self.registry.discard(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Block up to `timeout` for the reply to `id`.
    ///
    /// `Ok(None)` means the budget elapsed; the request stays outstanding
    /// and the call can be retried. Replies for other outstanding
    /// identities arriving meanwhile are left for their own waiters.
    pub fn receive_reply(
        &self,
        id: SampleIdentity,
        timeout: Duration,
    ) -> RpcResult<Option<Sample<ReplyEnvelope<TRep>>>> {
        self.registry.wait(id, timeout)
    }

    /// Non-blocking poll for a reply that already arrived.
    pub fn take_reply(&self, id: SampleIdentity) -> RpcResult<Option<Sample<ReplyEnvelope<TRep>>>> {
        self.registry.take(id)
    }

    /// Abandon an outstanding call: the registry entry is retired and a
    /// late reply for it will be dropped as stray. A pending future fails.
    /// Returns `false` if the call already resolved (or was never sent).
    pub fn cancel(&self, id: SampleIdentity) -> bool {
        self.registry.discard(id)
    }

    /// Send one request and return a future for its reply.
    ///
    /// The future resolves with the reply sample, or fails with
    /// [`RpcError::Timeout`] once the configured reply budget expires.
    pub fn send_request_async(
        &self,
        payload: TReq,
    ) -> RpcResult<RpcFuture<Sample<ReplyEnvelope<TRep>>>> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(RpcError::Shutdown);
        }

        let id = self.next_identity();
        let (promise, future) = promise_pair();
        // Install the promise before publishing so the reply cannot race
        // past the registry.
        self.registry.register_promise(id, promise);
        if let Err(e) = self.endpoint.publish_request(self.envelope(id, payload)) {
            self.registry.discard(id);
            return Err(e);
        }
        self.timeouts.push(Instant::now() + self.reply_timeout, id);
        Ok(future)
    }

    /// Route transport-internal (non-data) samples to waiters instead of
    /// suppressing them.
    pub fn enable_nondata_samples(&self) {
        self.suppress_flag.store(false, Ordering::Relaxed);
    }

    /// Address subsequent requests to a specific service instance.
    pub fn bind(&self, instance_name: impl Into<String>) {
        *self.instance_name.lock() = Some(instance_name.into());
    }

    /// Clear the bound instance.
    pub fn unbind(&self) {
        *self.instance_name.lock() = None;
    }

    pub fn is_bound(&self) -> bool {
        self.instance_name.lock().is_some()
    }

    pub fn bound_instance_name(&self) -> Option<String> {
        self.instance_name.lock().clone()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Number of requests currently outstanding (sent, reply not yet
    /// consumed).
    pub fn pending_calls(&self) -> usize {
        self.registry.len()
    }

    fn next_identity(&self) -> SampleIdentity {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        SampleIdentity::new(self.writer_guid, seq)
    }

    fn envelope(&self, id: SampleIdentity, payload: TReq) -> RequestEnvelope<TReq> {
        let mut header = RequestHeader::new(self.service_name.clone(), id);
        header.instance_name = self.instance_name.lock().clone();
        RequestEnvelope { header, payload }
    }
}

impl<TReq, TRep> Drop for Requester<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.timeouts.notify();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
        if let Some(timer) = self.timer.take() {
            let _ = timer.join();
        }
        self.registry.fail_all(&RpcError::Shutdown);
    }
}

/// Drain the transport and route each reply through the registry.
fn run_pump<TReq, TRep>(
    endpoint: &dyn RequestEndpoint<TReq, TRep>,
    registry: &PendingCallRegistry<TRep>,
    shutdown: &AtomicBool,
    suppress_invalid: &AtomicBool,
    poll: Duration,
) where
    TReq: Send + 'static,
    TRep: Send + 'static,
{
    while !shutdown.load(Ordering::Relaxed) {
        match endpoint.receive_reply(poll) {
            Ok(Some(sample)) => {
                if !sample.info.valid && suppress_invalid.load(Ordering::Relaxed) {
                    log::debug!("suppressing non-data reply sample");
                    continue;
                }
                let id = sample.data.header.related_request_id;
                registry.route_reply(id, sample);
            }
            Ok(None) => {}
            Err(e) => {
                log::debug!("reply pump stopping: {}", e);
                break;
            }
        }
    }
}

/// Fail async promises whose reply budget expired.
fn run_timer<TRep>(
    timeouts: &TimeoutQueue,
    registry: &PendingCallRegistry<TRep>,
    shutdown: &AtomicBool,
) where
    TRep: Send + 'static,
{
    const IDLE_WAIT: Duration = Duration::from_millis(200);

    while !shutdown.load(Ordering::Relaxed) {
        let due = {
            let mut heap = timeouts.heap.lock();
            match heap.peek().copied() {
                None => {
                    let _ = timeouts.cond.wait_for(&mut heap, IDLE_WAIT);
                    None
                }
                Some(Reverse((deadline, _))) => {
                    let now = Instant::now();
                    if deadline <= now {
                        heap.pop().map(|Reverse((_, id))| id)
                    } else {
                        let wait = (deadline - now).min(IDLE_WAIT);
                        let _ = timeouts.cond.wait_for(&mut heap, wait);
                        None
                    }
                }
            }
        };
        if let Some(id) = due {
            if registry.fail(id, RpcError::Timeout) {
                log::debug!(
                    "async request seq={} timed out waiting for reply",
                    id.sequence_number
                );
            }
        }
    }
}
