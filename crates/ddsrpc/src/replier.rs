// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server-side half of one RPC channel.
//!
//! A [`Replier`] receives requests addressed to its service and publishes
//! replies stamped with the originating correlation identity. Requests for
//! other services (or other instances) are out-of-band protocol noise and
//! are skipped, not errors.

use crate::error::RpcResult;
use crate::params::ReplierParams;
use crate::transport::ReplyEndpoint;
use crate::types::{
    ReplyEnvelope, ReplyHeader, ReplyPayload, RequestEnvelope, Sample, SampleIdentity,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Server-side endpoint of one typed RPC channel.
pub struct Replier<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + 'static,
{
    service_name: String,
    instance_name: Option<String>,
    endpoint: Arc<dyn ReplyEndpoint<TReq, TRep>>,
    suppress_invalid: AtomicBool,
}

impl<TReq, TRep> Replier<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: ReplyPayload,
{
    pub fn new(endpoint: impl ReplyEndpoint<TReq, TRep>, params: ReplierParams) -> Self {
        Self {
            service_name: params.get_service_name().to_string(),
            instance_name: params.get_instance_name().map(str::to_string),
            endpoint: Arc::new(endpoint),
            suppress_invalid: AtomicBool::new(true),
        }
    }

    /// Block up to `timeout` for the next request addressed to this
    /// replier's service (and instance, when one is configured).
    ///
    /// `Ok(None)` on timeout. Non-data samples and requests carrying a
    /// foreign service or instance name are skipped within the budget.
    pub fn receive_request(
        &self,
        timeout: Duration,
    ) -> RpcResult<Option<Sample<RequestEnvelope<TReq>>>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let sample = match self.endpoint.receive_request(remaining)? {
                Some(sample) => sample,
                None => return Ok(None),
            };

            if !sample.info.valid && self.suppress_invalid.load(Ordering::Relaxed) {
                log::debug!("suppressing non-data request sample");
            } else if sample.data.header.service_name != self.service_name {
                log::debug!(
                    "ignoring request for foreign service '{}'",
                    sample.data.header.service_name
                );
            } else if !self.instance_matches(&sample.data) {
                log::debug!(
                    "ignoring request for foreign instance {:?}",
                    sample.data.header.instance_name
                );
            } else {
                return Ok(Some(sample));
            }

            if remaining.is_zero() {
                return Ok(None);
            }
        }
    }

    /// Publish a reply correlated to `related_request_id`.
    ///
    /// The reply status is derived from the payload's discriminant. Must be
    /// called at most once per received request; a failed publish
    /// propagates to the caller and is not retried.
    pub fn send_reply(&self, payload: TRep, related_request_id: SampleIdentity) -> RpcResult<()> {
        let header = ReplyHeader::with_status(related_request_id, payload.status());
        self.endpoint.publish_reply(ReplyEnvelope { header, payload })
    }

    /// Deliver non-data samples from `receive_request` instead of
    /// suppressing them.
    pub fn enable_nondata_samples(&self) {
        self.suppress_invalid.store(false, Ordering::Relaxed);
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn instance_matches(&self, request: &RequestEnvelope<TReq>) -> bool {
        match (&self.instance_name, &request.header.instance_name) {
            // An unbound request reaches every instance of the service.
            (_, None) => true,
            (Some(mine), Some(theirs)) => mine == theirs,
            (None, Some(_)) => false,
        }
    }
}
