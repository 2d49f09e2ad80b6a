// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for DDS-RPC operations.

use crate::types::{ReplyStatus, SampleIdentity};
use std::fmt;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Errors that can occur during RPC operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// Failed to publish a request or reply
    SendFailed(String),

    /// Request timed out waiting for reply
    Timeout,

    /// The identity is not known to this requester (never sent, or
    /// already resolved)
    UnknownRequest(SampleIdentity),

    /// Remote side reported a non-success status
    Remote {
        status: ReplyStatus,
        message: Option<String>,
    },

    /// Endpoint was shut down
    Shutdown,

    /// Internal error (promise dropped, poisoned continuation, ...)
    Internal(String),
}

impl RpcError {
    /// Create a remote-status error with a message
    pub fn remote_with_message(status: ReplyStatus, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: Some(message.into()),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed(msg) => write!(f, "RPC send failed: {}", msg),
            Self::Timeout => write!(f, "RPC request timed out"),
            Self::UnknownRequest(id) => write!(
                f,
                "unknown request identity (seq={})",
                id.sequence_number
            ),
            Self::Remote { status, message } => {
                write!(f, "remote exception: {:?}", status)?;
                if let Some(msg) = message {
                    write!(f, " - {}", msg)?;
                }
                Ok(())
            }
            Self::Shutdown => write!(f, "RPC endpoint shut down"),
            Self::Internal(msg) => write!(f, "internal RPC error: {}", msg),
        }
    }
}

impl std::error::Error for RpcError {}
