// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builder-style configuration objects for requesters, repliers, clients
//! and services.
//!
//! There is no ambient default participant: every endpoint receives its
//! configuration explicitly at construction time.

use std::time::Duration;

/// Default budget for an asynchronous call before its future fails with a
/// timeout.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default blocking-call budget used by [`crate::client::ClientEndpoint`].
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the reply pump blocks on the transport per poll cycle.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration of a [`crate::requester::Requester`].
#[derive(Debug, Clone)]
pub struct RequesterParams {
    service_name: String,
    instance_name: Option<String>,
    reply_timeout: Duration,
    poll_interval: Duration,
}

impl RequesterParams {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            instance_name: None,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = Some(instance_name.into());
        self
    }

    /// Budget for async calls before their future fails with `Timeout`.
    pub fn reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn get_service_name(&self) -> &str {
        &self.service_name
    }

    pub fn get_instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    pub fn get_reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn get_poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Configuration of a [`crate::replier::Replier`].
#[derive(Debug, Clone)]
pub struct ReplierParams {
    service_name: String,
    instance_name: Option<String>,
}

impl ReplierParams {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            instance_name: None,
        }
    }

    pub fn instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = Some(instance_name.into());
        self
    }

    pub fn get_service_name(&self) -> &str {
        &self.service_name
    }

    pub fn get_instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }
}

/// Configuration of a [`crate::client::ClientEndpoint`].
#[derive(Debug, Clone)]
pub struct ClientParams {
    requester: RequesterParams,
    call_timeout: Duration,
}

impl ClientParams {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            requester: RequesterParams::new(service_name),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.requester = self.requester.instance_name(instance_name);
        self
    }

    /// Budget for synchronous `call` before it reports `Timeout`.
    pub fn call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.requester = self.requester.reply_timeout(reply_timeout);
        self
    }

    pub fn get_call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub fn requester_params(&self) -> RequesterParams {
        self.requester.clone()
    }
}

/// Configuration of a registered service (dispatcher + replier).
#[derive(Debug, Clone)]
pub struct ServiceParams {
    service_name: String,
    instance_name: Option<String>,
    request_topic: Option<String>,
    reply_topic: Option<String>,
}

impl ServiceParams {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            instance_name: None,
            request_topic: None,
            reply_topic: None,
        }
    }

    pub fn instance_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = Some(instance_name.into());
        self
    }

    pub fn request_topic_name(mut self, topic: impl Into<String>) -> Self {
        self.request_topic = Some(topic.into());
        self
    }

    pub fn reply_topic_name(mut self, topic: impl Into<String>) -> Self {
        self.reply_topic = Some(topic.into());
        self
    }

    pub fn get_service_name(&self) -> &str {
        &self.service_name
    }

    pub fn get_instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    /// Request topic, defaulting to `rq/<service>`.
    pub fn get_request_topic_name(&self) -> String {
        self.request_topic
            .clone()
            .unwrap_or_else(|| format!("rq/{}", self.service_name))
    }

    /// Reply topic, defaulting to `rr/<service>`.
    pub fn get_reply_topic_name(&self) -> String {
        self.reply_topic
            .clone()
            .unwrap_or_else(|| format!("rr/{}", self.service_name))
    }

    pub fn replier_params(&self) -> ReplierParams {
        let params = ReplierParams::new(self.service_name.clone());
        match &self.instance_name {
            Some(instance) => params.instance_name(instance.clone()),
            None => params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_names_default_to_rpc_convention() {
        let params = ServiceParams::new("RobotControl");
        assert_eq!(params.get_request_topic_name(), "rq/RobotControl");
        assert_eq!(params.get_reply_topic_name(), "rr/RobotControl");

        let params = params.request_topic_name("custom/req");
        assert_eq!(params.get_request_topic_name(), "custom/req");
    }

    #[test]
    fn client_params_carry_over_to_requester() {
        let params = ClientParams::new("RobotControl")
            .instance_name("left_arm")
            .reply_timeout(Duration::from_secs(5));
        let requester = params.requester_params();
        assert_eq!(requester.get_service_name(), "RobotControl");
        assert_eq!(requester.get_instance_name(), Some("left_arm"));
        assert_eq!(requester.get_reply_timeout(), Duration::from_secs(5));
    }
}
