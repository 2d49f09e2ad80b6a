// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client facade: a [`Requester`] plus call-shaped sugar.
//!
//! Generated per-interface stubs wrap a [`ClientEndpoint`] by composition
//! (no inheritance tower): the stub encodes typed arguments into the
//! request union, calls [`ClientEndpoint::call`] or
//! [`ClientEndpoint::call_async`], and decodes the reply union back into
//! typed results and declared exceptions.

use crate::error::{RpcError, RpcResult};
use crate::future::RpcFuture;
use crate::params::ClientParams;
use crate::requester::Requester;
use crate::transport::RequestEndpoint;
use crate::types::{ReplyEnvelope, Sample};
use std::time::Duration;

/// One client binding to a remote service.
pub struct ClientEndpoint<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + Sync + 'static,
{
    requester: Requester<TReq, TRep>,
    call_timeout: Duration,
}

impl<TReq, TRep> ClientEndpoint<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + Sync + 'static,
{
    pub fn new(
        endpoint: impl RequestEndpoint<TReq, TRep>,
        params: ClientParams,
    ) -> RpcResult<Self> {
        Ok(Self {
            requester: Requester::new(endpoint, params.requester_params())?,
            call_timeout: params.get_call_timeout(),
        })
    }

    /// Synchronous call: send the request and block for its reply.
    ///
    /// A non-success reply status is surfaced as [`RpcError::Remote`]; a
    /// `DeclaredException` status is *not* an error here — the typed
    /// exception variant is in the payload for the stub to decode.
    pub fn call(&self, payload: TReq) -> RpcResult<ReplyEnvelope<TRep>> {
        let id = self.requester.send_request(payload)?;
        match self.requester.receive_reply(id, self.call_timeout)? {
            Some(sample) => Self::decode(self.service_name(), sample),
            None => {
                // The facade owns the call end-to-end; nobody retries
                // this identity, so retire it.
                self.requester.cancel(id);
                Err(RpcError::Timeout)
            }
        }
    }

    /// Asynchronous call: the returned future resolves with the decoded
    /// reply envelope, and can be `.then()`-chained.
    pub fn call_async(&self, payload: TReq) -> RpcResult<RpcFuture<ReplyEnvelope<TRep>>> {
        let service = self.service_name().to_string();
        let future = self.requester.send_request_async(payload)?;
        Ok(future.then_result(move |result| {
            result.and_then(|sample| Self::decode(&service, sample))
        }))
    }

    fn decode(service: &str, sample: Sample<ReplyEnvelope<TRep>>) -> RpcResult<ReplyEnvelope<TRep>> {
        use crate::types::ReplyStatus;

        match sample.data.header.status {
            ReplyStatus::Success | ReplyStatus::DeclaredException => Ok(sample.data),
            status => Err(RpcError::remote_with_message(
                status,
                format!("service '{}'", service),
            )),
        }
    }

    /// Address subsequent calls to a specific service instance.
    pub fn bind(&self, instance_name: impl Into<String>) {
        self.requester.bind(instance_name);
    }

    pub fn unbind(&self) {
        self.requester.unbind();
    }

    pub fn is_bound(&self) -> bool {
        self.requester.is_bound()
    }

    pub fn bound_instance_name(&self) -> Option<String> {
        self.requester.bound_instance_name()
    }

    pub fn service_name(&self) -> &str {
        self.requester.service_name()
    }

    /// The underlying requester, for the polling/take API shapes.
    pub fn requester(&self) -> &Requester<TReq, TRep> {
        &self.requester
    }
}
