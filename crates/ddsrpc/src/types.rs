// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Core types for the DDS-RPC protocol.
//!
//! These types follow the OMG DDS-RPC specification for request/reply
//! correlation: every request carries a [`SampleIdentity`], and the matching
//! reply carries it back as `related_request_id`.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

/// Opaque 16-byte writer identifier.
///
/// Stands in for the DDS writer GUID; only equality, ordering and hashing
/// matter at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Guid(pub [u8; 16]);

static GUID_COUNTER: AtomicU32 = AtomicU32::new(1);

impl Guid {
    /// The all-zero GUID
    pub const fn zero() -> Self {
        Self([0u8; 16])
    }

    /// Generate a session-unique GUID from timestamp, a process-wide
    /// counter and a thread-id hash.
    pub fn generate() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&(now.as_nanos() as u64).to_le_bytes());

        let counter = GUID_COUNTER.fetch_add(1, Ordering::Relaxed);
        bytes[8..12].copy_from_slice(&counter.to_le_bytes());

        let tid_hash = {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::thread::current().id().hash(&mut hasher);
            hasher.finish() as u32
        };
        bytes[12..16].copy_from_slice(&tid_hash.to_le_bytes());

        Self(bytes)
    }
}

/// Unique identifier for a sample, used for request/reply correlation.
///
/// Combines the writer's GUID with a per-writer sequence number to create a
/// globally unique identifier for each request. Ordering exists only so the
/// identity can key ordered containers; it carries no protocol meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SampleIdentity {
    /// GUID of the writer that sent the sample
    pub writer_guid: Guid,
    /// Sequence number assigned by the writer
    pub sequence_number: i64,
}

impl SampleIdentity {
    /// Create a new SampleIdentity
    pub fn new(writer_guid: Guid, sequence_number: i64) -> Self {
        Self {
            writer_guid,
            sequence_number,
        }
    }

    /// Create a zero/null identity
    pub const fn zero() -> Self {
        Self {
            writer_guid: Guid::zero(),
            sequence_number: 0,
        }
    }
}

/// Discriminant identifying one RPC operation of a service interface.
///
/// The value is a stable FNV-1a hash of the operation name, playing the role
/// of the codegen-time operation hash in generated request/reply unions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u32);

/// Discriminant identifying one declared exception type of an operation.
///
/// Computed the same deterministic way as [`OperationId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionId(pub u32);

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const fn fnv1a(name: &str) -> u32 {
    let bytes = name.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

impl OperationId {
    /// Stable discriminant for an operation name (usable in `const` items)
    pub const fn of(name: &str) -> Self {
        Self(fnv1a(name))
    }
}

impl ExceptionId {
    /// Stable discriminant for a declared exception type name
    pub const fn of(name: &str) -> Self {
        Self(fnv1a(name))
    }
}

/// Status of a request as reported in the reply header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i32)]
pub enum ReplyStatus {
    /// Request processed successfully
    #[default]
    Success = 0,
    /// Request discriminant not recognized by the service
    UnknownOperation = 1,
    /// Handler failed with an undeclared error; type information is lost
    UnknownException = 2,
    /// Handler signalled a declared domain exception; the reply payload
    /// carries the typed exception variant
    DeclaredException = 3,
}

impl ReplyStatus {
    /// Convert from i32 (unknown codes map to `UnknownException`)
    pub fn from_code(value: i32) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::UnknownOperation,
            3 => Self::DeclaredException,
            _ => Self::UnknownException,
        }
    }

    /// Convert to i32
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Header prepended to request messages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestHeader {
    /// Name of the target service
    pub service_name: String,
    /// Optional instance name for multi-instance services
    pub instance_name: Option<String>,
    /// Identity of this request (for reply correlation)
    pub request_id: SampleIdentity,
}

impl RequestHeader {
    /// Create a header addressed to `service_name`
    pub fn new(service_name: impl Into<String>, request_id: SampleIdentity) -> Self {
        Self {
            service_name: service_name.into(),
            instance_name: None,
            request_id,
        }
    }

    /// Set the target instance name
    pub fn with_instance(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = Some(instance_name.into());
        self
    }
}

/// Header prepended to reply messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyHeader {
    /// Identity of the original request (for correlation)
    pub related_request_id: SampleIdentity,
    /// Outcome of the request processing
    pub status: ReplyStatus,
}

impl ReplyHeader {
    /// Create a successful reply header
    pub fn success(related_request_id: SampleIdentity) -> Self {
        Self {
            related_request_id,
            status: ReplyStatus::Success,
        }
    }

    /// Create a reply header with an explicit status
    pub fn with_status(related_request_id: SampleIdentity, status: ReplyStatus) -> Self {
        Self {
            related_request_id,
            status,
        }
    }

    /// Check if this reply indicates success
    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }
}

/// A request payload wrapped with its protocol header.
///
/// Created once per call by the requester and never mutated after send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope<T> {
    pub header: RequestHeader,
    pub payload: T,
}

/// A reply payload wrapped with its correlation header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope<T> {
    pub header: ReplyHeader,
    pub payload: T,
}

/// Delivery metadata attached to every received sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInfo {
    /// `false` for transport-internal (non-data) samples
    pub valid: bool,
}

impl SampleInfo {
    pub const fn valid() -> Self {
        Self { valid: true }
    }

    pub const fn invalid() -> Self {
        Self { valid: false }
    }
}

/// A received message plus its delivery metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample<T> {
    pub data: T,
    pub info: SampleInfo,
}

impl<T> Sample<T> {
    /// Wrap `data` as a valid (data-carrying) sample
    pub fn new(data: T) -> Self {
        Self {
            data,
            info: SampleInfo::valid(),
        }
    }
}

/// Request payload of a service contract: a tagged union with one variant
/// per operation, reporting which operation it carries.
pub trait RequestPayload: Send + 'static {
    /// Discriminant of the operation this payload invokes
    fn operation(&self) -> OperationId;
}

/// Reply payload of a service contract: per-operation results, declared
/// exception variants, and the protocol catch-alls.
pub trait ReplyPayload: Send + 'static {
    /// Status consistent with this payload's discriminant (a success
    /// variant must report [`ReplyStatus::Success`])
    fn status(&self) -> ReplyStatus;

    /// Discriminant of the declared exception this payload carries, when
    /// its status is [`ReplyStatus::DeclaredException`]
    fn exception(&self) -> Option<ExceptionId> {
        None
    }

    /// Canned reply for an unrecognized request discriminant
    fn unknown_operation() -> Self;

    /// Canned reply for an undeclared handler failure
    fn unknown_exception() -> Self;
}
