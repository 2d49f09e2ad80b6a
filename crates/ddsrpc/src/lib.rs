// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDSRPC - Request/Reply Binding over DDS-style Pub/Sub
//!
//! An implementation of the OMG DDS-RPC request/reply pattern
//! (formal/17-04-01): typed requesters and repliers, operation dispatch,
//! a multi-service server loop, and a small future/continuation engine
//! for asynchronous calls.
//!
//! # Overview
//!
//! - **Requesters** stamp each request with a unique [`SampleIdentity`]
//!   and match replies back to the call that made them.
//! - **Repliers** receive requests and publish replies carrying the
//!   related request identity.
//! - **Dispatchers** route decoded requests to per-operation handlers
//!   over shared service state; a [`Server`] drives many dispatchers
//!   from one loop.
//! - **Futures** ([`RpcFuture`]) let callers chain continuations with
//!   [`RpcFuture::then`] instead of blocking.
//!
//! # Topic Naming
//!
//! For a service named "RobotControl":
//! - Request topic: `rq/RobotControl`
//! - Reply topic: `rr/RobotControl`
//!
//! # Correlation
//!
//! Each request header carries a [`SampleIdentity`] (writer GUID +
//! monotonically increasing sequence number). Each reply header carries
//! the identity of the request it answers; the requester routes replies
//! by that identity alone, so interleaved and out-of-order replies
//! always reach the right caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use ddsrpc::{channel_link, ClientParams, ClientEndpoint, Replier, ServiceParams};
//!
//! let (request_endpoint, reply_endpoint) = channel_link::<MyRequest, MyReply>();
//! let client = ClientEndpoint::new(
//!     request_endpoint,
//!     ClientParams::new().service_name("RobotControl"),
//! )?;
//! let reply = client.call(MyRequest::GetSpeed)?;
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod future;
pub mod params;
pub mod pending;
pub mod replier;
pub mod requester;
pub mod server;
pub mod transport;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::ClientEndpoint;
pub use dispatch::{DispatchOutcome, Dispatcher, ServiceDispatcher};
pub use error::{RpcError, RpcResult};
pub use future::{promise_pair, Promise, RpcFuture};
pub use params::{
    ClientParams, ReplierParams, RequesterParams, ServiceParams, DEFAULT_CALL_TIMEOUT,
    DEFAULT_POLL_INTERVAL, DEFAULT_REPLY_TIMEOUT,
};
pub use pending::PendingCallRegistry;
pub use replier::Replier;
pub use requester::Requester;
pub use server::Server;
pub use transport::{channel_link, ReplyEndpoint, RequestEndpoint};
pub use types::{
    ExceptionId, Guid, OperationId, ReplyEnvelope, ReplyHeader, ReplyPayload, ReplyStatus,
    RequestEnvelope, RequestHeader, RequestPayload, Sample, SampleIdentity, SampleInfo,
};
