// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One-shot promise/future pair for asynchronous replies.
//!
//! A [`Promise`] is resolved exactly once — by the reply pump, the timeout
//! thread, or its own `Drop` — and the paired [`RpcFuture`] observes the
//! result either by blocking ([`RpcFuture::get`]) or through a continuation
//! ([`RpcFuture::then`]). Continuations run on whatever thread resolves the
//! promise. A continuation returning another future can be collapsed with
//! [`RpcFuture::flatten`], matching the unwrapping `then` of the DDS-RPC
//! reference API.

use crate::error::{RpcError, RpcResult};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

type Callback<T> = Box<dyn FnOnce(RpcResult<T>) + Send>;

enum State<T> {
    /// Not yet resolved; at most one continuation may be attached
    Pending(Option<Callback<T>>),
    /// Resolved, result not yet consumed
    Ready(RpcResult<T>),
    /// Result handed to `get()` or a continuation
    Done,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

/// Producer half: resolves the paired [`RpcFuture`] exactly once.
///
/// Dropping an unresolved promise fails the future instead of hanging it.
pub struct Promise<T> {
    inner: Arc<Inner<T>>,
    resolved: bool,
}

/// Consumer half of a one-shot asynchronous result.
pub struct RpcFuture<T> {
    inner: Arc<Inner<T>>,
}

/// Create a connected promise/future pair.
pub fn promise_pair<T: Send + 'static>() -> (Promise<T>, RpcFuture<T>) {
    let inner = Arc::new(Inner {
        state: Mutex::new(State::Pending(None)),
        cond: Condvar::new(),
    });
    (
        Promise {
            inner: inner.clone(),
            resolved: false,
        },
        RpcFuture { inner },
    )
}

impl<T: Send + 'static> Promise<T> {
    /// Resolve the future. Runs any attached continuation on the calling
    /// thread.
    pub fn complete(mut self, result: RpcResult<T>) {
        self.resolved = true;
        Self::resolve(&self.inner, result);
    }

    fn resolve(inner: &Arc<Inner<T>>, result: RpcResult<T>) {
        let callback = {
            let mut state = inner.state.lock();
            match std::mem::replace(&mut *state, State::Done) {
                State::Pending(Some(cb)) => Some(cb),
                State::Pending(None) => {
                    *state = State::Ready(result);
                    inner.cond.notify_all();
                    return;
                }
                // One-shot: a second resolution is unreachable through the
                // public API; keep the first result.
                other => {
                    *state = other;
                    return;
                }
            }
        };
        if let Some(cb) = callback {
            cb(result);
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.resolved {
            let callback = {
                let mut state = self.inner.state.lock();
                match std::mem::replace(&mut *state, State::Done) {
                    State::Pending(cb) => {
                        if cb.is_none() {
                            *state = State::Ready(Err(RpcError::Internal(
                                "promise dropped before completion".to_string(),
                            )));
                            self.inner.cond.notify_all();
                        }
                        cb
                    }
                    other => {
                        *state = other;
                        None
                    }
                }
            };
            if let Some(cb) = callback {
                cb(Err(RpcError::Internal(
                    "promise dropped before completion".to_string(),
                )));
            }
        }
    }
}

impl<T: Send + 'static> RpcFuture<T> {
    /// A future that is already resolved with `value`.
    pub fn ready(value: T) -> Self {
        let (promise, future) = promise_pair();
        promise.complete(Ok(value));
        future
    }

    /// A future that is already resolved with `err`.
    pub fn failed(err: RpcError) -> Self {
        let (promise, future) = promise_pair::<T>();
        promise.complete(Err(err));
        future
    }

    /// Block until resolved and consume the result.
    pub fn get(self) -> RpcResult<T> {
        let mut state = self.inner.state.lock();
        loop {
            match std::mem::replace(&mut *state, State::Done) {
                State::Ready(result) => return result,
                State::Pending(None) => {
                    *state = State::Pending(None);
                    self.inner.cond.wait(&mut state);
                }
                State::Pending(Some(_)) | State::Done => {
                    return Err(RpcError::Internal(
                        "future already consumed by a continuation".to_string(),
                    ))
                }
            }
        }
    }

    /// Block until resolved without consuming the result.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while matches!(*state, State::Pending(_)) {
            self.inner.cond.wait(&mut state);
        }
    }

    /// Block up to `timeout`; returns `true` if the future resolved.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while matches!(*state, State::Pending(_)) {
            if self.inner.cond.wait_until(&mut state, deadline).timed_out() {
                return !matches!(*state, State::Pending(_));
            }
        }
        true
    }

    /// Check whether the future has resolved.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.inner.state.lock(), State::Pending(_))
    }

    /// Attach a continuation, yielding a future for its result.
    ///
    /// Runs immediately on the current thread if this future is already
    /// resolved, otherwise on the thread that resolves it. A panicking
    /// continuation fails the returned future.
    pub fn then<U, F>(self, f: F) -> RpcFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(RpcResult<T>) -> U + Send + 'static,
    {
        let (promise, future) = promise_pair();
        self.on_complete(move |result| {
            match catch_unwind(AssertUnwindSafe(move || f(result))) {
                Ok(value) => promise.complete(Ok(value)),
                Err(_) => promise.complete(Err(RpcError::Internal(
                    "continuation panicked".to_string(),
                ))),
            }
        });
        future
    }

    /// Like [`RpcFuture::then`], but the continuation returns a result that
    /// feeds the downstream future's error channel directly.
    pub fn then_result<U, F>(self, f: F) -> RpcFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(RpcResult<T>) -> RpcResult<U> + Send + 'static,
    {
        let (promise, future) = promise_pair();
        self.on_complete(move |result| {
            match catch_unwind(AssertUnwindSafe(move || f(result))) {
                Ok(mapped) => promise.complete(mapped),
                Err(_) => promise.complete(Err(RpcError::Internal(
                    "continuation panicked".to_string(),
                ))),
            }
        });
        future
    }

    /// Internal: register `cb` to run with the result (now, if resolved).
    fn on_complete<F>(self, cb: F)
    where
        F: FnOnce(RpcResult<T>) + Send + 'static,
    {
        let ready = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, State::Done) {
                State::Ready(result) => Some(result),
                State::Pending(None) => {
                    *state = State::Pending(Some(Box::new(cb)));
                    return;
                }
                other => {
                    *state = other;
                    return;
                }
            }
        };
        if let Some(result) = ready {
            cb(result);
        }
    }
}

impl<T: Send + 'static> RpcFuture<RpcFuture<T>> {
    /// Collapse a nested future produced by a continuation that itself
    /// issued an asynchronous call.
    pub fn flatten(self) -> RpcFuture<T> {
        let (promise, future) = promise_pair();
        self.on_complete(move |outer| match outer {
            Ok(inner) => inner.on_complete(move |result| promise.complete(result)),
            Err(e) => promise.complete(Err(e)),
        });
        future
    }
}
