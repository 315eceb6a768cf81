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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rivet_core::prelude::*;
use rivet_test::rivet_test;
use tracing::info;

use crate::setup::actors::{Counter, Witness};
use crate::setup::initialize_tracing;
use crate::setup::messages::{Readings, Stop, Tick};

mod setup;

const WAIT: Duration = Duration::from_secs(5);

#[rivet_test(timeout_ms = 10000)]
async fn handlers_mutate_state_and_stop_runs_hooks() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let witness = Witness::default();
    let started = Arc::new(AtomicUsize::new(0));

    let mut counter = system.new_actor_with_name::<Counter>("counter")?;
    let on_start = Arc::clone(&started);
    let on_stop = Arc::clone(&witness.stopped);
    counter
        .mutate_on::<Tick>(|actor, _ctx| {
            actor.model.count += 1;
            Reply::ready()
        })
        .after_start(move |_actor| {
            on_start.fetch_add(1, Ordering::SeqCst);
            Reply::ready()
        })
        .after_stop(move |actor| {
            info!("Processed {} ticks", actor.model.count);
            on_stop.store(actor.model.count, Ordering::SeqCst);
            Reply::ready()
        });

    let handle = counter.start().await;
    assert_eq!(handle.name(), "counter");
    assert!(!handle.is_remote());
    for _ in 0..3 {
        handle.send(Tick).await;
    }
    // Terminate queues behind the ticks, so all three are processed before the hooks run.
    handle.stop().await?;

    assert_eq!(started.load(Ordering::SeqCst), 1);
    assert_eq!(witness.stopped.load(Ordering::SeqCst), 3);
    assert!(handle.is_closed());
    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn quit_inside_handler_drops_the_rest_of_the_queue() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let witness = Witness::default();

    let mut counter = system.new_actor::<Counter>();
    let on_stop = Arc::clone(&witness.stopped);
    counter
        .mutate_on::<Tick>(|actor, _ctx| {
            actor.model.count += 1;
            Reply::ready()
        })
        .mutate_on::<Stop>(|actor, _ctx| {
            actor.quit(ExitReason::Normal);
            Reply::ready()
        })
        .after_stop(move |actor| {
            assert_eq!(actor.exit_reason(), Some(ExitReason::Normal));
            on_stop.store(actor.model.count, Ordering::SeqCst);
            Reply::ready()
        });

    let handle = counter.start().await;
    handle.send(Tick).await;
    handle.send(Stop).await;
    handle.send(Tick).await;
    handle.join().await;

    assert_eq!(witness.stopped.load(Ordering::SeqCst), 1);
    assert_eq!(system.running_count(), 0);
    system.shutdown().await?;
    Ok(())
}

fn handed_over_by_value<M: HandlerArg<Arg = M>>() {}

fn handed_over_as_param<M: HandlerArg<Arg = Param<M>>>() {}

#[test]
fn fieldless_messages_skip_the_param_wrapper() {
    handed_over_by_value::<Tick>();
    handed_over_by_value::<Stop>();
    handed_over_as_param::<Readings>();
}

#[rivet_test(timeout_ms = 10000)]
async fn fieldless_message_reaches_the_handler_by_value() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let witness = Witness::default();

    let mut counter = system.new_actor::<Counter>();
    counter.mutate_on::<Tick>(|actor, ctx| {
        let _tick: &Tick = ctx.message();
        actor.model.count += 1;
        Reply::ready()
    });
    let on_stop = Arc::clone(&witness.stopped);
    counter.after_stop(move |actor| {
        on_stop.store(actor.model.count, Ordering::SeqCst);
        Reply::ready()
    });

    let handle = counter.start().await;
    let shared: Arc<Tick> = Arc::new(Tick);
    handle.send_arc(shared.clone()).await;
    handle.send(Tick).await;
    handle.stop().await?;

    assert_eq!(witness.stopped.load(Ordering::SeqCst), 2);
    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn handler_parameter_is_exclusive_unless_caller_keeps_the_payload() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let witness = Witness::default();

    let mut sorter = system.new_actor::<Counter>();
    let accesses = Arc::clone(&witness.accesses);
    let results = Arc::clone(&witness.results);
    sorter.mutate_on::<Vec<i32>>(move |_actor, ctx| {
        accesses.lock().push(ctx.message().access());
        ctx.message_mut().get_mut().sort_unstable();
        results.lock().push(ctx.message().get().clone());
        Reply::ready()
    });
    let handle = sorter.start().await;

    handle.send(vec![3, 1, 2]).await;

    let kept: Arc<Vec<i32>> = Arc::new(vec![9, 7, 8]);
    handle.send_arc(kept.clone()).await;
    handle.stop().await?;

    assert_eq!(*witness.accesses.lock(), vec![Access::Exclusive, Access::Shared]);
    assert_eq!(*witness.results.lock(), vec![vec![1, 2, 3], vec![7, 8, 9]]);
    assert_eq!(*kept, vec![9, 7, 8], "the sender's copy must not be mutated");
    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn replies_reach_a_scoped_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();

    let mut doubler = system.new_actor::<Counter>();
    doubler.mutate_on::<i32>(|actor, ctx| {
        actor.model.count += 1;
        let reply = ctx.reply_envelope();
        let doubled = *ctx.message() * 2;
        Reply::pending(async move {
            reply.send(doubled).await;
        })
    });
    let handle = doubler.start().await;

    let mut scoped = system.scoped_actor();
    scoped.send(&handle, 21).await;
    scoped.send(&handle, "ignored".to_string()).await;
    let (answer, from) = scoped.receive_from::<i32>(WAIT).await?;
    assert_eq!(answer, 42);
    assert_eq!(from.address(), handle.address());

    let nothing = scoped.receive::<String>(Duration::from_millis(50)).await;
    assert_eq!(nothing, Err(ReceiveError::Timeout));

    scoped.send_exit(&handle, ExitReason::UserShutdown).await;
    handle.join().await;
    assert!(handle.is_closed());

    scoped.quit(ExitReason::Normal)?;
    assert_eq!(scoped.quit(ExitReason::Normal), Err(ExitError::AlreadyExited));
    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn broadcast_gives_each_member_its_own_copy_on_write() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let witness = Witness::default();
    let group = system.group("workers");

    let mut handles = Vec::new();
    for marker in [10, 20, 30] {
        let mut worker = system.new_actor::<Counter>();
        let results = Arc::clone(&witness.results);
        worker.mutate_on::<Vec<i32>>(move |_actor, ctx| {
            ctx.message_mut().get_mut().push(marker);
            results.lock().push(ctx.message_mut().take());
            Reply::ready()
        });
        let handle = worker.start().await;
        assert!(group.join(&handle));
        handles.push(handle);
    }
    assert_eq!(group.len(), 3);
    assert!(!group.join(&handles[0]), "joining twice is a no-op");

    let scoped = system.scoped_actor();
    group.broadcast(scoped.handle(), vec![1, 2]).await;
    for handle in &handles {
        handle.stop().await?;
    }

    let mut results = witness.results.lock().clone();
    results.sort();
    assert_eq!(results, vec![vec![1, 2, 10], vec![1, 2, 20], vec![1, 2, 30]]);
    drop(scoped);
    system.shutdown().await?;
    Ok(())
}
