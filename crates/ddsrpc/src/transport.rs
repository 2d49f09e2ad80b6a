// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport collaborator interface.
//!
//! The RPC layer only needs two capabilities from the underlying pub/sub
//! middleware: publish one typed message, and receive typed messages within
//! a timeout. A vendor DDS binding implements [`RequestEndpoint`] /
//! [`ReplyEndpoint`] over its `rq/<service>` and `rr/<service>` topics; this
//! module also provides [`channel_link`], an in-process link over crossbeam
//! channels used by the tests and the examples.

use crate::error::{RpcError, RpcResult};
use crate::types::{ReplyEnvelope, RequestEnvelope, Sample};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Client-side half of one RPC channel pair: publishes requests, receives
/// replies.
pub trait RequestEndpoint<TReq, TRep>: Send + Sync + 'static {
    /// Publish one request. Ownership transfers to the transport.
    fn publish_request(&self, request: RequestEnvelope<TReq>) -> RpcResult<()>;

    /// Receive the next reply sample, waiting up to `timeout`.
    /// `Ok(None)` means no data arrived within the budget.
    fn receive_reply(&self, timeout: Duration) -> RpcResult<Option<Sample<ReplyEnvelope<TRep>>>>;
}

/// Server-side half: receives requests, publishes replies.
pub trait ReplyEndpoint<TReq, TRep>: Send + Sync + 'static {
    /// Receive the next request sample, waiting up to `timeout`.
    fn receive_request(&self, timeout: Duration)
        -> RpcResult<Option<Sample<RequestEnvelope<TReq>>>>;

    /// Publish one reply. Ownership transfers to the transport.
    fn publish_reply(&self, reply: ReplyEnvelope<TRep>) -> RpcResult<()>;
}

/// Requester end of an in-process link.
pub struct ChannelRequestEndpoint<TReq, TRep> {
    request_tx: Sender<Sample<RequestEnvelope<TReq>>>,
    reply_rx: Receiver<Sample<ReplyEnvelope<TRep>>>,
}

/// Replier end of an in-process link.
pub struct ChannelReplyEndpoint<TReq, TRep> {
    request_rx: Receiver<Sample<RequestEnvelope<TReq>>>,
    reply_tx: Sender<Sample<ReplyEnvelope<TRep>>>,
}

/// Create a connected requester/replier endpoint pair.
///
/// Delivery is ordered per direction but the two directions are
/// independent, like a pair of DDS topics.
pub fn channel_link<TReq, TRep>() -> (
    ChannelRequestEndpoint<TReq, TRep>,
    ChannelReplyEndpoint<TReq, TRep>,
) {
    let (request_tx, request_rx) = unbounded();
    let (reply_tx, reply_rx) = unbounded();
    (
        ChannelRequestEndpoint {
            request_tx,
            reply_rx,
        },
        ChannelReplyEndpoint {
            request_rx,
            reply_tx,
        },
    )
}

fn recv_with_timeout<T>(rx: &Receiver<T>, timeout: Duration) -> RpcResult<Option<T>> {
    match rx.recv_timeout(timeout) {
        Ok(sample) => Ok(Some(sample)),
        Err(RecvTimeoutError::Timeout) => Ok(None),
        Err(RecvTimeoutError::Disconnected) => Err(RpcError::Shutdown),
    }
}

impl<TReq, TRep> ChannelRequestEndpoint<TReq, TRep> {
    /// Deliver a raw request sample, including non-data samples.
    pub fn publish_request_sample(&self, sample: Sample<RequestEnvelope<TReq>>) -> RpcResult<()> {
        self.request_tx
            .send(sample)
            .map_err(|_| RpcError::SendFailed("request link disconnected".to_string()))
    }
}

impl<TReq, TRep> ChannelReplyEndpoint<TReq, TRep> {
    /// Deliver a raw reply sample, including non-data samples.
    pub fn publish_reply_sample(&self, sample: Sample<ReplyEnvelope<TRep>>) -> RpcResult<()> {
        self.reply_tx
            .send(sample)
            .map_err(|_| RpcError::SendFailed("reply link disconnected".to_string()))
    }
}

impl<TReq, TRep> RequestEndpoint<TReq, TRep> for ChannelRequestEndpoint<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + 'static,
{
    fn publish_request(&self, request: RequestEnvelope<TReq>) -> RpcResult<()> {
        self.publish_request_sample(Sample::new(request))
    }

    fn receive_reply(&self, timeout: Duration) -> RpcResult<Option<Sample<ReplyEnvelope<TRep>>>> {
        recv_with_timeout(&self.reply_rx, timeout)
    }
}

impl<TReq, TRep> ReplyEndpoint<TReq, TRep> for ChannelReplyEndpoint<TReq, TRep>
where
    TReq: Send + 'static,
    TRep: Send + 'static,
{
    fn receive_request(
        &self,
        timeout: Duration,
    ) -> RpcResult<Option<Sample<RequestEnvelope<TReq>>>> {
        recv_with_timeout(&self.request_rx, timeout)
    }

    fn publish_reply(&self, reply: ReplyEnvelope<TRep>) -> RpcResult<()> {
        self.publish_reply_sample(Sample::new(reply))
    }
}
