// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end tests exercising the full request/reply stack against a
//! robot-control service.

use super::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const MAX_SPEED: i32 = 100;

const OP_COMMAND: OperationId = OperationId::of("command");
const OP_GET_SPEED: OperationId = OperationId::of("getSpeed");
const OP_SET_SPEED: OperationId = OperationId::of("setSpeed");
const OP_GET_STATUS: OperationId = OperationId::of("getStatus");

const EX_TOO_FAST: ExceptionId = ExceptionId::of("TooFast");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RobotCommand {
    Start,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
enum RobotRequest {
    Command(RobotCommand),
    GetSpeed,
    SetSpeed(i32),
    GetStatus,
}

#[derive(Debug, Clone, PartialEq)]
enum RobotReply {
    CommandAck,
    Speed(i32),
    SpeedSet(i32),
    Status(String),
    TooFast,
    UnknownOperation,
    UnknownException,
}

impl RequestPayload for RobotRequest {
    fn operation(&self) -> OperationId {
        match self {
            RobotRequest::Command(_) => OP_COMMAND,
            RobotRequest::GetSpeed => OP_GET_SPEED,
            RobotRequest::SetSpeed(_) => OP_SET_SPEED,
            RobotRequest::GetStatus => OP_GET_STATUS,
        }
    }
}

impl ReplyPayload for RobotReply {
    fn status(&self) -> ReplyStatus {
        match self {
            RobotReply::TooFast => ReplyStatus::DeclaredException,
            RobotReply::UnknownOperation => ReplyStatus::UnknownOperation,
            RobotReply::UnknownException => ReplyStatus::UnknownException,
            _ => ReplyStatus::Success,
        }
    }

    fn exception(&self) -> Option<ExceptionId> {
        match self {
            RobotReply::TooFast => Some(EX_TOO_FAST),
            _ => None,
        }
    }

    fn unknown_operation() -> Self {
        RobotReply::UnknownOperation
    }

    fn unknown_exception() -> Self {
        RobotReply::UnknownException
    }
}

struct RobotState {
    running: bool,
    speed: i32,
}

impl RobotState {
    fn new() -> Self {
        Self {
            running: false,
            speed: 0,
        }
    }
}

fn robot_dispatcher(
    replier: Replier<RobotRequest, RobotReply>,
) -> Dispatcher<RobotState, RobotRequest, RobotReply> {
    Dispatcher::new(RobotState::new(), replier)
        .with_operation(OP_COMMAND, |state: &mut RobotState, req: &RobotRequest| {
            if let RobotRequest::Command(cmd) = req {
                state.running = *cmd == RobotCommand::Start;
            }
            RobotReply::CommandAck
        })
        .with_operation(OP_GET_SPEED, |state: &mut RobotState, _: &RobotRequest| {
            RobotReply::Speed(state.speed)
        })
        .with_operation(OP_SET_SPEED, |state: &mut RobotState, req: &RobotRequest| {
            match req {
                RobotRequest::SetSpeed(speed) if *speed > MAX_SPEED => RobotReply::TooFast,
                RobotRequest::SetSpeed(speed) => {
                    let old = state.speed;
                    state.speed = *speed;
                    RobotReply::SpeedSet(old)
                }
                _ => RobotReply::UnknownException,
            }
        })
        .with_operation(OP_GET_STATUS, |state: &mut RobotState, _: &RobotRequest| {
            RobotReply::Status(if state.running { "running" } else { "idle" }.to_string())
        })
}

/// Drive `server` on a background thread until `stop` is raised.
fn spawn_server(mut server: Server, stop: Arc<AtomicBool>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("robot-server".to_string())
        .spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let _ = server.run(Duration::from_millis(10));
            }
        })
        .expect("spawn server thread")
}

fn robot_stack() -> (
    ClientEndpoint<RobotRequest, RobotReply>,
    Arc<AtomicBool>,
    thread::JoinHandle<()>,
) {
    let service = ServiceParams::new("RobotControl");
    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();

    let replier = Replier::new(reply_endpoint, service.replier_params());
    let mut server = Server::new();
    server.register_service(robot_dispatcher(replier));

    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_server(server, stop.clone());

    let client = ClientEndpoint::new(
        request_endpoint,
        ClientParams::new("RobotControl").call_timeout(Duration::from_secs(5)),
    )
    .expect("create client");

    (client, stop, handle)
}

#[test]
fn test_client_endpoint_is_shareable_across_threads() {
    fn assert_shareable<T: Send + Sync>() {}
    assert_shareable::<ClientEndpoint<RobotRequest, RobotReply>>();
}

#[test]
fn test_correlation_identities_unique_and_increasing() {
    let (request_endpoint, _reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let requester = Requester::new(request_endpoint, RequesterParams::new("RobotControl"))
        .expect("create requester");

    let a = requester.send_request(RobotRequest::GetSpeed).unwrap();
    let b = requester.send_request(RobotRequest::GetSpeed).unwrap();
    let c = requester.send_request(RobotRequest::GetSpeed).unwrap();

    assert_eq!(a.writer_guid, b.writer_guid);
    assert_eq!(b.writer_guid, c.writer_guid);
    assert!(a.sequence_number < b.sequence_number);
    assert!(b.sequence_number < c.sequence_number);
    assert_eq!(requester.pending_calls(), 3);
}

#[test]
fn test_sync_round_trip_set_and_get_speed() {
    let (client, stop, handle) = robot_stack();

    let reply = client.call(RobotRequest::SetSpeed(10)).unwrap();
    assert!(reply.header.is_success());
    assert_eq!(reply.payload, RobotReply::SpeedSet(0));

    let reply = client.call(RobotRequest::GetSpeed).unwrap();
    assert_eq!(reply.payload, RobotReply::Speed(10));

    let reply = client
        .call(RobotRequest::Command(RobotCommand::Start))
        .unwrap();
    assert_eq!(reply.payload, RobotReply::CommandAck);

    let reply = client.call(RobotRequest::GetStatus).unwrap();
    assert_eq!(reply.payload, RobotReply::Status("running".to_string()));

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_set_speed_beyond_limit_raises_declared_exception() {
    let (client, stop, handle) = robot_stack();

    client.call(RobotRequest::SetSpeed(42)).unwrap();

    let reply = client.call(RobotRequest::SetSpeed(150)).unwrap();
    assert_eq!(reply.header.status, ReplyStatus::DeclaredException);
    assert_eq!(reply.payload, RobotReply::TooFast);
    assert_eq!(reply.payload.exception(), Some(EX_TOO_FAST));

    // The rejection must not disturb service state.
    let reply = client.call(RobotRequest::GetSpeed).unwrap();
    assert_eq!(reply.payload, RobotReply::Speed(42));

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_unknown_operation_reported_and_server_survives() {
    let service = ServiceParams::new("RobotControl");
    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();

    // GetStatus deliberately unregistered.
    let replier = Replier::new(reply_endpoint, service.replier_params());
    let dispatcher = Dispatcher::new(RobotState::new(), replier).with_operation(
        OP_GET_SPEED,
        |state: &mut RobotState, _: &RobotRequest| RobotReply::Speed(state.speed),
    );

    let mut server = Server::new();
    server.register_service(dispatcher);
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_server(server, stop.clone());

    let client = ClientEndpoint::new(
        request_endpoint,
        ClientParams::new("RobotControl").call_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    match client.call(RobotRequest::GetStatus) {
        Err(RpcError::Remote { status, message }) => {
            assert_eq!(status, ReplyStatus::UnknownOperation);
            assert_eq!(message.as_deref(), Some("service 'RobotControl'"));
        }
        other => panic!("expected remote unknown-operation error, got {:?}", other),
    }

    // The server keeps serving known operations afterwards.
    let reply = client.call(RobotRequest::GetSpeed).unwrap();
    assert_eq!(reply.payload, RobotReply::Speed(0));

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_out_of_order_replies_reach_their_callers() {
    let service = ServiceParams::new("RobotControl");
    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let replier = Replier::new(reply_endpoint, service.replier_params());

    let requester = Requester::new(request_endpoint, RequesterParams::new("RobotControl"))
        .expect("create requester");

    let id_a = requester.send_request(RobotRequest::GetSpeed).unwrap();
    let id_b = requester.send_request(RobotRequest::GetSpeed).unwrap();

    let req_a = replier
        .receive_request(Duration::from_secs(1))
        .unwrap()
        .expect("first request");
    let req_b = replier
        .receive_request(Duration::from_secs(1))
        .unwrap()
        .expect("second request");
    assert_eq!(req_a.data.header.request_id, id_a);
    assert_eq!(req_b.data.header.request_id, id_b);

    // Answer the second call first.
    replier.send_reply(RobotReply::Speed(2), id_b).unwrap();
    replier.send_reply(RobotReply::Speed(1), id_a).unwrap();

    let reply_a = requester
        .receive_reply(id_a, Duration::from_secs(1))
        .unwrap()
        .expect("reply for first call");
    let reply_b = requester
        .receive_reply(id_b, Duration::from_secs(1))
        .unwrap()
        .expect("reply for second call");

    assert_eq!(reply_a.data.header.related_request_id, id_a);
    assert_eq!(reply_a.data.payload, RobotReply::Speed(1));
    assert_eq!(reply_b.data.header.related_request_id, id_b);
    assert_eq!(reply_b.data.payload, RobotReply::Speed(2));
    assert_eq!(requester.pending_calls(), 0);
}

#[test]
fn test_zero_timeout_receive_returns_immediately() {
    let (request_endpoint, _reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let requester = Requester::new(request_endpoint, RequesterParams::new("RobotControl"))
        .expect("create requester");

    let id = requester.send_request(RobotRequest::GetSpeed).unwrap();

    let start = Instant::now();
    let reply = requester.receive_reply(id, Duration::ZERO).unwrap();
    assert!(reply.is_none());
    assert!(start.elapsed() < Duration::from_millis(100));

    // The call stays outstanding for a later retry.
    assert_eq!(requester.pending_calls(), 1);
}

#[test]
fn test_take_reply_polls_parked_reply() {
    let service = ServiceParams::new("RobotControl");
    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let replier = Replier::new(reply_endpoint, service.replier_params());

    let requester = Requester::new(request_endpoint, RequesterParams::new("RobotControl"))
        .expect("create requester");

    let id = requester.send_request(RobotRequest::GetSpeed).unwrap();
    let request = replier
        .receive_request(Duration::from_secs(1))
        .unwrap()
        .expect("request");
    replier
        .send_reply(RobotReply::Speed(7), request.data.header.request_id)
        .unwrap();

    // The reply pump parks the reply; poll until it lands.
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if let Some(sample) = requester.take_reply(id).unwrap() {
            assert_eq!(sample.data.payload, RobotReply::Speed(7));
            break;
        }
        assert!(Instant::now() < deadline, "reply never routed");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(requester.pending_calls(), 0);
}

#[test]
fn test_hundred_concurrent_async_calls_resolve_once_and_drain() {
    let (client, stop, handle) = robot_stack();

    let resolved = Arc::new(AtomicUsize::new(0));
    let mut futures = Vec::with_capacity(100);
    for _ in 0..100 {
        let resolved = resolved.clone();
        let future = client
            .call_async(RobotRequest::GetStatus)
            .unwrap()
            .then_result(move |result| {
                resolved.fetch_add(1, Ordering::SeqCst);
                result
            });
        futures.push(future);
    }

    for future in futures {
        let envelope = future.get().expect("async call failed");
        assert!(matches!(envelope.payload, RobotReply::Status(_)));
    }
    assert_eq!(resolved.load(Ordering::SeqCst), 100);

    // Every completed call leaves the registry.
    let deadline = Instant::now() + Duration::from_secs(2);
    while client.requester().pending_calls() > 0 {
        assert!(Instant::now() < deadline, "registry never drained");
        thread::sleep(Duration::from_millis(5));
    }

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_async_call_times_out_without_replier() {
    let (request_endpoint, _reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let requester = Requester::new(
        request_endpoint,
        RequesterParams::new("RobotControl").reply_timeout(Duration::from_millis(50)),
    )
    .expect("create requester");

    let future = requester
        .send_request_async(RobotRequest::GetSpeed)
        .unwrap();
    match future.get() {
        Err(RpcError::Timeout) => {}
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(requester.pending_calls(), 0);
}

#[test]
fn test_timed_out_sync_calls_leave_no_registry_entries() {
    let (request_endpoint, _reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let client = ClientEndpoint::new(
        request_endpoint,
        ClientParams::new("RobotControl").call_timeout(Duration::from_millis(20)),
    )
    .unwrap();

    for _ in 0..5 {
        match client.call(RobotRequest::GetSpeed) {
            Err(RpcError::Timeout) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
    }
    assert_eq!(client.requester().pending_calls(), 0);
}

#[test]
fn test_continuation_chain_transforms_reply() {
    let (client, stop, handle) = robot_stack();

    client.call(RobotRequest::SetSpeed(33)).unwrap();

    let speed = client
        .call_async(RobotRequest::GetSpeed)
        .unwrap()
        .then_result(|result| {
            result.and_then(|envelope| match envelope.payload {
                RobotReply::Speed(speed) => Ok(speed),
                other => Err(RpcError::Internal(format!("unexpected reply {:?}", other))),
            })
        })
        .get()
        .unwrap();
    assert_eq!(speed, 33);

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}

#[test]
fn test_panicking_handler_yields_unknown_exception() {
    let service = ServiceParams::new("RobotControl");
    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();
    let replier = Replier::new(reply_endpoint, service.replier_params());

    let dispatcher = Dispatcher::new(RobotState::new(), replier)
        .with_operation(OP_GET_SPEED, |state: &mut RobotState, _: &RobotRequest| {
            RobotReply::Speed(state.speed)
        })
        .with_operation(
            OP_SET_SPEED,
            |_: &mut RobotState, _: &RobotRequest| -> RobotReply { panic!("handler bug") },
        );

    let mut server = Server::new();
    server.register_service(dispatcher);
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_server(server, stop.clone());

    let client = ClientEndpoint::new(
        request_endpoint,
        ClientParams::new("RobotControl").call_timeout(Duration::from_secs(5)),
    )
    .unwrap();

    match client.call(RobotRequest::SetSpeed(1)) {
        Err(RpcError::Remote { status, .. }) => {
            assert_eq!(status, ReplyStatus::UnknownException);
        }
        other => panic!("expected remote unknown-exception error, got {:?}", other),
    }

    // The dispatcher outlives the panic.
    let reply = client.call(RobotRequest::GetSpeed).unwrap();
    assert_eq!(reply.payload, RobotReply::Speed(0));

    stop.store(true, Ordering::Relaxed);
    handle.join().unwrap();
}
