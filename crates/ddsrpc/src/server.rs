// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server: owns registered dispatchers and drives their polling loop.
//!
//! Dispatchers are never auto-discovered; each service must be registered
//! explicitly before [`Server::run`] is first called. One `run` call drives
//! one dispatch cycle of *every* registered dispatcher, applying the
//! timeout per dispatcher, so multiple services share the loop fairly.

use crate::dispatch::{DispatchOutcome, ServiceDispatcher};
use crate::error::RpcResult;
use std::time::Duration;

/// Polling driver for a set of registered services.
#[derive(Default)]
pub struct Server {
    dispatchers: Vec<Box<dyn ServiceDispatcher>>,
}

impl Server {
    pub fn new() -> Self {
        Self {
            dispatchers: Vec::new(),
        }
    }

    /// Register a service dispatcher.
    pub fn register_service(&mut self, dispatcher: impl ServiceDispatcher + 'static) {
        log::info!("registering service '{}'", dispatcher.service_name());
        self.dispatchers.push(Box::new(dispatcher));
    }

    /// Number of registered services.
    pub fn service_count(&self) -> usize {
        self.dispatchers.len()
    }

    /// Drive one dispatch cycle of every registered dispatcher.
    ///
    /// Returns how many requests were answered this pass. A dispatch error
    /// on one service is logged and does not starve the others.
    pub fn run(&mut self, timeout: Duration) -> RpcResult<usize> {
        let mut handled = 0;
        for dispatcher in &mut self.dispatchers {
            match dispatcher.dispatch(timeout) {
                Ok(DispatchOutcome::TimedOut) => {}
                Ok(_) => handled += 1,
                Err(e) => {
                    log::warn!(
                        "dispatch failed for service '{}': {}",
                        dispatcher.service_name(),
                        e
                    );
                }
            }
        }
        Ok(handled)
    }
}
