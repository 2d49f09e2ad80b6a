// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request demultiplexing: one handler per operation discriminant.
//!
//! A [`Dispatcher`] drives one cycle per call: wait for a request, select
//! the handler matching the request payload's [`OperationId`], run it
//! against the service implementation, and send the correlated reply. This
//! is the wire-level equivalent of a v-table keyed by an integer tag: one
//! request union fans out to N strongly typed service methods.
//!
//! Failure containment:
//! - an unmatched discriminant produces the payload's canned
//!   unknown-operation variant, never an error
//! - a panicking handler is caught and answered with the unknown-exception
//!   variant; the dispatch loop keeps serving
//! - declared domain exceptions are not failures at this layer: handlers
//!   encode them as typed reply variants themselves

use crate::error::RpcResult;
use crate::replier::Replier;
use crate::types::{OperationId, ReplyPayload, ReplyStatus, RequestPayload};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// Outcome of one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No request arrived within the budget
    TimedOut,
    /// A handler ran and the reply was sent
    Handled(OperationId),
    /// The discriminant matched no handler; an unknown-operation reply was
    /// sent
    UnknownOperation(OperationId),
}

/// Type-erased dispatcher driven by a [`crate::server::Server`].
pub trait ServiceDispatcher: Send {
    fn service_name(&self) -> &str;

    /// Run one wait/handle/reply cycle.
    fn dispatch(&mut self, timeout: Duration) -> RpcResult<DispatchOutcome>;
}

type Handler<S, TReq, TRep> = Box<dyn Fn(&mut S, &TReq) -> TRep + Send>;

/// Demultiplexer binding one service implementation to one [`Replier`].
pub struct Dispatcher<S, TReq, TRep>
where
    TReq: RequestPayload,
    TRep: ReplyPayload,
{
    service: S,
    replier: Replier<TReq, TRep>,
    handlers: HashMap<OperationId, Handler<S, TReq, TRep>>,
    requests_handled: u64,
}

impl<S, TReq, TRep> Dispatcher<S, TReq, TRep>
where
    S: Send,
    TReq: RequestPayload,
    TRep: ReplyPayload,
{
    pub fn new(service: S, replier: Replier<TReq, TRep>) -> Self {
        Self {
            service,
            replier,
            handlers: HashMap::new(),
            requests_handled: 0,
        }
    }

    /// Register the handler for one operation discriminant. Chainable at
    /// construction time; a later registration for the same discriminant
    /// replaces the earlier one.
    pub fn with_operation(
        mut self,
        operation: OperationId,
        handler: impl Fn(&mut S, &TReq) -> TRep + Send + 'static,
    ) -> Self {
        self.handlers.insert(operation, Box::new(handler));
        self
    }

    /// Number of requests answered by this dispatcher (including
    /// unknown-operation replies).
    pub fn requests_handled(&self) -> u64 {
        self.requests_handled
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn dispatch_one(&mut self, timeout: Duration) -> RpcResult<DispatchOutcome> {
        let sample = match self.replier.receive_request(timeout)? {
            Some(sample) => sample,
            None => return Ok(DispatchOutcome::TimedOut),
        };

        let request_id = sample.data.header.request_id;
        let operation = sample.data.payload.operation();

        let (reply, outcome) = match self.handlers.get(&operation) {
            Some(handler) => {
                let service = &mut self.service;
                let payload = &sample.data.payload;
                match catch_unwind(AssertUnwindSafe(|| handler(service, payload))) {
                    Ok(reply) => {
                        if reply.status() == ReplyStatus::DeclaredException {
                            log::debug!(
                                "operation {:#010x} raised declared exception {:?}",
                                operation.0,
                                reply.exception()
                            );
                        }
                        (reply, DispatchOutcome::Handled(operation))
                    }
                    Err(_) => {
                        log::warn!(
                            "handler for operation {:#010x} panicked; replying unknown-exception",
                            operation.0
                        );
                        (TRep::unknown_exception(), DispatchOutcome::Handled(operation))
                    }
                }
            }
            None => {
                log::debug!("no handler for operation {:#010x}", operation.0);
                (
                    TRep::unknown_operation(),
                    DispatchOutcome::UnknownOperation(operation),
                )
            }
        };

        self.replier.send_reply(reply, request_id)?;
        self.requests_handled += 1;
        Ok(outcome)
    }
}

impl<S, TReq, TRep> ServiceDispatcher for Dispatcher<S, TReq, TRep>
where
    S: Send,
    TReq: RequestPayload,
    TRep: ReplyPayload,
{
    fn service_name(&self) -> &str {
        self.replier.service_name()
    }

    fn dispatch(&mut self, timeout: Duration) -> RpcResult<DispatchOutcome> {
        self.dispatch_one(timeout)
    }
}
