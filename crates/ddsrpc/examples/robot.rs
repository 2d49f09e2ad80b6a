// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Example code readability over pedantic
#![allow(clippy::needless_pass_by_value)] // Example functions
#![allow(clippy::must_use_candidate)] // Example functions

/// Robot Control Example
///
/// Demonstrates:
/// - Defining a request/reply contract (operations plus a declared exception)
/// - Serving operations through a Dispatcher and Server loop
/// - Synchronous calls via ClientEndpoint::call
/// - A recursive future/continuation chain that accelerates the robot
///   until it hits the speed limit
use ddsrpc::{
    channel_link, ClientEndpoint, ClientParams, Dispatcher, OperationId, Replier, ReplyPayload,
    ReplyStatus, RequestPayload, RpcError, RpcFuture, Server, ServiceParams,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const MAX_SPEED: i32 = 100;
const INCREMENT: i32 = 10;

const OP_GET_SPEED: OperationId = OperationId::of("getSpeed");
const OP_SET_SPEED: OperationId = OperationId::of("setSpeed");

#[derive(Debug, Clone, PartialEq)]
enum RobotRequest {
    GetSpeed,
    SetSpeed(i32),
}

#[derive(Debug, Clone, PartialEq)]
enum RobotReply {
    Speed(i32),
    SpeedSet(i32),
    TooFast,
    UnknownOperation,
    UnknownException,
}

impl RequestPayload for RobotRequest {
    fn operation(&self) -> OperationId {
        match self {
            RobotRequest::GetSpeed => OP_GET_SPEED,
            RobotRequest::SetSpeed(_) => OP_SET_SPEED,
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

    fn unknown_operation() -> Self {
        RobotReply::UnknownOperation
    }

    fn unknown_exception() -> Self {
        RobotReply::UnknownException
    }
}

struct Robot {
    speed: i32,
}

type RobotClient = ClientEndpoint<RobotRequest, RobotReply>;

/// Read the current speed, then keep issuing setSpeed(+10) calls through
/// chained continuations until the next step would exceed the limit.
fn speedup_until_max_speed(client: Arc<RobotClient>) -> RpcFuture<i32> {
    let future = match client.call_async(RobotRequest::GetSpeed) {
        Ok(future) => future,
        Err(e) => return RpcFuture::failed(e),
    };

    future
        .then(move |result| {
            let speed = match result {
                Ok(envelope) => match envelope.payload {
                    RobotReply::Speed(speed) => speed,
                    other => {
                        return RpcFuture::failed(RpcError::Internal(format!(
                            "unexpected reply {:?}",
                            other
                        )))
                    }
                },
                Err(e) => return RpcFuture::failed(e),
            };

            if speed + INCREMENT > MAX_SPEED {
                return RpcFuture::ready(speed);
            }
            println!("speedup: new speed = {}", speed + INCREMENT);

            let set = match client.call_async(RobotRequest::SetSpeed(speed + INCREMENT)) {
                Ok(future) => future,
                Err(e) => return RpcFuture::failed(e),
            };
            let again = client.clone();
            set.then(move |_| speedup_until_max_speed(again)).flatten()
        })
        .flatten()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== DDSRPC Robot Control Example ===\n");

    let service = ServiceParams::new("RobotControl");
    println!(
        "Service topics: {} / {}",
        service.get_request_topic_name(),
        service.get_reply_topic_name()
    );

    let (request_endpoint, reply_endpoint) = channel_link::<RobotRequest, RobotReply>();

    let replier = Replier::new(reply_endpoint, service.replier_params());
    let dispatcher = Dispatcher::new(Robot { speed: 0 }, replier)
        .with_operation(OP_GET_SPEED, |robot: &mut Robot, _: &RobotRequest| {
            RobotReply::Speed(robot.speed)
        })
        .with_operation(
            OP_SET_SPEED,
            |robot: &mut Robot, req: &RobotRequest| match req {
                RobotRequest::SetSpeed(speed) if *speed > MAX_SPEED => RobotReply::TooFast,
                RobotRequest::SetSpeed(speed) => {
                    let old = robot.speed;
                    robot.speed = *speed;
                    RobotReply::SpeedSet(old)
                }
                _ => RobotReply::UnknownException,
            },
        );

    let mut server = Server::new();
    server.register_service(dispatcher);

    let stop = Arc::new(AtomicBool::new(false));
    let server_stop = stop.clone();
    let server_thread = thread::Builder::new()
        .name("robot-server".to_string())
        .spawn(move || {
            while !server_stop.load(Ordering::Relaxed) {
                let _ = server.run(Duration::from_millis(20));
            }
        })?;

    let client = Arc::new(RobotClient::new(
        request_endpoint,
        ClientParams::new("RobotControl").call_timeout(Duration::from_secs(5)),
    )?);

    // Synchronous calls.
    let reply = client.call(RobotRequest::SetSpeed(30))?;
    println!("setSpeed(30) -> {:?}", reply.payload);
    let reply = client.call(RobotRequest::GetSpeed)?;
    println!("getSpeed()   -> {:?}", reply.payload);

    // Exceeding the limit raises the declared exception instead of applying.
    let reply = client.call(RobotRequest::SetSpeed(150))?;
    println!("setSpeed(150) -> {:?}", reply.payload);

    // Asynchronous continuation chain.
    let final_speed = speedup_until_max_speed(client.clone()).get()?;
    println!("\nspeedup finished, final speed = {}", final_speed);

    stop.store(true, Ordering::Relaxed);
    server_thread.join().expect("server thread panicked");
    println!("\n[OK] Done");
    Ok(())
}
