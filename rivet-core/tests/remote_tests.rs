/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rivet_core::net::protocol::{read_frame, FRAME_HELLO, FRAME_REJECT, PROTOCOL_VERSION};
use rivet_core::net::wire::{Reject, RejectReason};
use rivet_core::prelude::*;
use rivet_test::rivet_test;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::setup::actors::{Counter, Recorder};
use crate::setup::initialize_tracing;
use crate::setup::messages::Readings;

mod setup;

const HOST: &str = "127.0.0.1";
const WAIT: Duration = Duration::from_secs(5);

#[rivet_test(timeout_ms = 20000)]
async fn resolving_preserves_actor_identity() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();
    assert_ne!(server.node(), client.node());

    let actor = server.new_actor::<Counter>().start().await;
    let first_port = server.publish(&actor, 0, Some(HOST)).await?;
    let second_port = server.publish(&actor, 0, None).await?;
    assert_ne!(first_port, second_port);

    let resolved = client.resolve(HOST, first_port).await?;
    assert!(resolved.is_remote());
    assert_eq!(resolved, actor, "a proxy equals the actor's own handle");
    assert!(!resolved.is_same(&actor));

    let again = client.resolve(HOST, first_port).await?;
    assert!(again.is_same(&resolved), "resolution is cached");

    let other_port = client.resolve(HOST, second_port).await?;
    assert_eq!(other_port.address().node(), server.node());
    assert!(other_port.is_same(&resolved), "one proxy per remote actor");

    let local = server.resolve(HOST, first_port).await?;
    assert!(!local.is_remote());
    assert!(local.is_same(&actor), "resolving a local endpoint yields the local handle");

    actor.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn ping_pong_threads_a_counter_across_nodes() -> anyhow::Result<()> {
    initialize_tracing();
    let pong_system = RivetApp::launch();
    let ping_system = RivetApp::launch();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut pong = pong_system.new_actor::<Recorder>();
    pong.model.seen = Arc::clone(&seen);
    pong.mutate_on::<i32>(|actor, ctx| {
        let value = *ctx.message();
        actor.model.seen.lock().push(value);
        let reply = ctx.reply_envelope();
        Reply::pending(async move {
            reply.send(value + 1).await;
        })
    });
    let pong = pong.start().await;
    let port = pong_system.publish(&pong, 0, Some(HOST)).await?;

    let mut ping = ping_system.new_actor::<Recorder>();
    ping.model.seen = Arc::clone(&seen);
    ping.mutate_on::<i32>(|actor, ctx| {
        let value = *ctx.message();
        actor.model.seen.lock().push(value);
        let reply = ctx.reply_envelope();
        if value >= 3 {
            actor.quit(ExitReason::Normal);
            Reply::pending(async move {
                reply.send_exit(ExitReason::Normal).await;
            })
        } else {
            Reply::pending(async move {
                reply.send(value + 1).await;
            })
        }
    });
    let ping = ping.start().await;

    let remote_pong = ping_system.resolve(HOST, port).await?;
    remote_pong.send_from(&ping, 0).await;

    ping.join().await;
    pong.join().await;
    assert_eq!(*seen.lock(), vec![0, 1, 2, 3]);

    ping_system.shutdown().await?;
    pong_system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn remote_actor_sorts_a_registered_list() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();
    server.type_registry().register_with_type_name::<Vec<i32>>();
    client.type_registry().register_with_type_name::<Vec<i32>>();

    let mut sorter = server.new_actor::<Counter>();
    sorter.mutate_on::<Vec<i32>>(|_actor, ctx| {
        let mut list = ctx.message_mut().take();
        list.sort_unstable();
        let reply = ctx.reply_envelope();
        Reply::pending(async move {
            reply.send(list).await;
        })
    });
    let sorter = sorter.start().await;
    let port = server.publish(&sorter, 0, Some(HOST)).await?;

    let remote = client.resolve(HOST, port).await?;
    let mut scoped = client.scoped_actor();
    scoped.send(&remote, vec![5, 4, 3, 2, 1]).await;
    let sorted = scoped.receive::<Vec<i32>>(WAIT).await?;
    assert_eq!(sorted, vec![1, 2, 3, 4, 5]);

    drop(scoped);
    sorter.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn user_messages_cross_the_wire_once_registered() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();
    for system in [&server, &client] {
        system.type_registry().register::<Readings>("readings");
    }

    let mut summer = server.new_actor::<Counter>();
    summer.mutate_on::<Readings>(|_actor, ctx| {
        let total: i64 = ctx.message().values.iter().sum();
        let reply = ctx.reply_envelope();
        Reply::pending(async move {
            reply.send(total).await;
        })
    });
    let summer = summer.start().await;
    let port = server.publish(&summer, 0, Some(HOST)).await?;

    let remote = client.resolve(HOST, port).await?;
    let mut scoped = client.scoped_actor();
    scoped
        .send(&remote, Readings { values: vec![4, 5, 6] })
        .await;
    assert_eq!(scoped.receive::<i64>(WAIT).await?, 15);

    drop(scoped);
    summer.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn publish_reports_distinct_failures() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let actor = system.new_actor::<Counter>().start().await;

    let port = system.publish(&actor, 0, Some(HOST)).await?;
    let taken = system.publish(&actor, port, Some(HOST)).await;
    assert_eq!(
        taken,
        Err(NetworkError::AddressInUse {
            host: HOST.to_string(),
            port
        })
    );

    system.unpublish(port).await?;
    assert_eq!(
        system.unpublish(port).await,
        Err(NetworkError::NotPublished { port })
    );

    actor.stop().await?;
    assert_eq!(
        system.publish(&actor, 0, Some(HOST)).await,
        Err(NetworkError::ActorExited)
    );

    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn failed_resolution_is_not_cached() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();

    let vacant = TcpListener::bind((HOST, 0)).await?;
    let port = vacant.local_addr()?.port();
    drop(vacant);

    let refused = client.resolve(HOST, port).await;
    assert_eq!(
        refused,
        Err(NetworkError::ConnectionRefused {
            host: HOST.to_string(),
            port
        })
    );

    let actor = server.new_actor::<Counter>().start().await;
    assert_eq!(server.publish(&actor, port, Some(HOST)).await?, port);
    let resolved = client.resolve(HOST, port).await?;
    assert_eq!(resolved, actor);

    actor.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn connection_loss_evicts_cached_endpoints() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();

    let actor = server.new_actor::<Counter>().start().await;
    let port = server.publish(&actor, 0, Some(HOST)).await?;
    let first = client.resolve(HOST, port).await?;
    assert_eq!(client.singletons().network_manager()?.connection_count(), 1);

    actor.stop().await?;
    server.shutdown().await?;
    first.join().await;
    assert!(first.is_closed());

    let again = client.resolve(HOST, port).await;
    assert_eq!(
        again,
        Err(NetworkError::ConnectionRefused {
            host: HOST.to_string(),
            port
        })
    );

    client.shutdown().await?;
    Ok(())
}

/// Forwards the n-th accepted connection to `routes[n]`, or holds it open without a word
/// for `None`. Cancelling `cut` drops every forwarded connection.
async fn relay(listener: TcpListener, routes: Vec<Option<u16>>, cut: CancellationToken) {
    for route in routes {
        let Ok((mut inbound, _)) = listener.accept().await else {
            return;
        };
        let cut = cut.clone();
        tokio::spawn(async move {
            match route {
                Some(port) => {
                    let Ok(mut outbound) = TcpStream::connect((HOST, port)).await else {
                        return;
                    };
                    tokio::select! {
                        () = cut.cancelled() => {}
                        _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound) => {}
                    }
                }
                None => cut.cancelled().await,
            }
        });
    }
}

async fn start_relay(routes: Vec<Option<u16>>) -> anyhow::Result<(u16, CancellationToken)> {
    let listener = TcpListener::bind((HOST, 0)).await?;
    let port = listener.local_addr()?.port();
    let cut = CancellationToken::new();
    tokio::spawn(relay(listener, routes, cut.clone()));
    Ok((port, cut))
}

#[rivet_test(timeout_ms = 20000)]
async fn proxy_closes_when_the_remote_actor_exits() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();

    let actor = server.new_actor::<Counter>().start().await;
    let port = server.publish(&actor, 0, Some(HOST)).await?;
    let proxy = client.resolve(HOST, port).await?;
    assert!(!proxy.is_closed());

    actor.stop().await?;
    tokio::time::timeout(WAIT, proxy.join()).await?;
    assert!(proxy.is_closed());
    assert_eq!(client.singletons().network_manager()?.connection_count(), 1);

    for _ in 0..2 {
        assert!(matches!(
            client.resolve(HOST, port).await,
            Err(NetworkError::HandshakeRejected(_))
        ));
    }

    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn rejected_and_timed_out_handshakes_are_not_cached() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let mut config = RivetConfig::default();
    config.timeouts.handshake_timeout_ms = 300;
    let client = RivetApp::launch_with_config(config);

    let gone = server.new_actor::<Counter>().start().await;
    let gone_port = server.publish(&gone, 0, Some(HOST)).await?;
    gone.stop().await?;
    let live = server.new_actor::<Counter>().start().await;
    let live_port = server.publish(&live, 0, Some(HOST)).await?;

    let (port, cut) = start_relay(vec![None, Some(gone_port), Some(live_port)]).await?;

    assert_eq!(
        client.resolve(HOST, port).await,
        Err(NetworkError::Timeout {
            host: HOST.to_string(),
            port
        })
    );
    assert!(matches!(
        client.resolve(HOST, port).await,
        Err(NetworkError::HandshakeRejected(_))
    ));
    let resolved = client.resolve(HOST, port).await?;
    assert_eq!(resolved, live);

    cut.cancel();
    live.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn dropped_connection_closes_proxies_of_live_actors() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let client = RivetApp::launch();

    let actor = server.new_actor::<Counter>().start().await;
    let port = server.publish(&actor, 0, Some(HOST)).await?;
    let (relay_port, cut) = start_relay(vec![Some(port)]).await?;

    let proxy = client.resolve(HOST, relay_port).await?;
    assert_eq!(proxy, actor);
    cut.cancel();
    tokio::time::timeout(WAIT, proxy.join()).await?;
    assert!(proxy.is_closed());
    assert_eq!(client.singletons().network_manager()?.connection_count(), 0);

    let direct = client.resolve(HOST, port).await?;
    assert_eq!(direct, actor);
    assert!(!direct.is_same(&proxy));

    actor.stop().await?;
    client.shutdown().await?;
    server.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 20000)]
async fn handshake_of_another_protocol_version_is_rejected() -> anyhow::Result<()> {
    initialize_tracing();
    let server = RivetApp::launch();
    let actor = server.new_actor::<Counter>().start().await;
    let port = server.publish(&actor, 0, Some(HOST)).await?;

    let mut stream = TcpStream::connect((HOST, port)).await?;
    let payload = br#"{"node":"node_elsewhere@1"}"#;
    let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
    frame.extend([PROTOCOL_VERSION + 1, FRAME_HELLO]);
    frame.extend_from_slice(payload);
    stream.write_all(&frame).await?;

    let (kind, reply) = read_frame(&mut stream, 1024).await?;
    assert_eq!(kind, FRAME_REJECT);
    let reject: Reject = serde_json::from_slice(&reply)?;
    assert_eq!(reject.reason, RejectReason::VersionMismatch);

    actor.stop().await?;
    server.shutdown().await?;
    Ok(())
}
