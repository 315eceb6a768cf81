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

use crate::setup::actors::{Counter, Witness};
use crate::setup::initialize_tracing;
use crate::setup::messages::Finish;

mod setup;

#[rivet_test(timeout_ms = 10000)]
async fn scheduler_and_network_manager_start_together_on_first_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    assert!(!system.is_initialized(SingletonKind::Scheduler));
    assert!(!system.is_initialized(SingletonKind::NetworkManager));

    let handle = system.new_actor::<Counter>().start().await;
    assert!(system.is_initialized(SingletonKind::Scheduler));
    assert!(system.is_initialized(SingletonKind::NetworkManager));
    assert!(system.is_initialized(SingletonKind::ActorRegistry));

    handle.stop().await?;
    system.shutdown().await?;
    for kind in SingletonKind::ALL {
        assert!(!system.is_initialized(kind), "{kind} survived shutdown");
    }
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn installing_a_scheduler_succeeds_once() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let config = system.config().scheduler.clone();

    assert!(system.install_scheduler(ThreadPoolScheduler::new(config.clone())));
    assert!(!system.install_scheduler(ThreadPoolScheduler::new(config)));
    assert!(system.is_initialized(SingletonKind::NetworkManager));

    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn shutdown_waits_for_every_running_actor() -> anyhow::Result<()> {
    initialize_tracing();
    const ACTORS: usize = 8;
    let system = RivetApp::launch();
    let witness = Witness::default();

    let mut handles = Vec::with_capacity(ACTORS);
    for _ in 0..ACTORS {
        let mut worker = system.new_actor::<Counter>();
        let stopped = Arc::clone(&witness.stopped);
        worker
            .mutate_on::<Finish>(|actor, _ctx| {
                actor.quit(ExitReason::Normal);
                Reply::pending(tokio::time::sleep(Duration::from_millis(50)))
            })
            .after_stop(move |_actor| {
                stopped.fetch_add(1, Ordering::SeqCst);
                Reply::ready()
            });
        handles.push(worker.start().await);
    }
    assert_eq!(system.running_count(), ACTORS);

    for handle in &handles {
        handle.send(Finish).await;
    }
    system.shutdown().await?;

    assert_eq!(witness.stopped.load(Ordering::SeqCst), ACTORS);
    assert!(handles.iter().all(ActorHandle::is_closed));
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn drain_timeout_leaves_the_system_usable() -> anyhow::Result<()> {
    initialize_tracing();
    let mut config = RivetConfig::default();
    config.timeouts.shutdown_drain_timeout_ms = 100;
    let system = RivetApp::launch_with_config(config);

    let lingering = system.new_actor::<Counter>().start().await;
    let result = system.shutdown().await;
    assert_eq!(result, Err(ShutdownError::DrainTimeout { running: 1 }));
    assert!(system.is_initialized(SingletonKind::Scheduler));
    assert!(system.is_initialized(SingletonKind::NetworkManager));

    lingering.stop().await?;
    system.shutdown().await?;
    assert!(!system.is_initialized(SingletonKind::Scheduler));
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn shutdown_quits_a_live_scoped_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let mut scoped = system.scoped_actor();
    assert_eq!(system.running_count(), 1);

    system.shutdown().await?;

    assert_eq!(
        scoped.receive::<i32>(Duration::from_millis(10)).await,
        Err(ReceiveError::Closed)
    );
    assert_eq!(scoped.quit(ExitReason::Normal), Err(ExitError::AlreadyExited));
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn shutdown_quits_every_live_scoped_actor() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let mut first = system.scoped_actor();
    let mut second = system.scoped_actor();
    assert_eq!(system.running_count(), 2);

    tokio::time::timeout(Duration::from_secs(3), system.shutdown()).await??;

    assert_eq!(first.quit(ExitReason::Normal), Err(ExitError::AlreadyExited));
    assert_eq!(second.quit(ExitReason::Normal), Err(ExitError::AlreadyExited));
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn an_older_scoped_actor_is_quit_after_a_newer_one_is_dropped() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let mut older = system.scoped_actor();
    drop(system.scoped_actor());
    assert_eq!(system.running_count(), 1);

    tokio::time::timeout(Duration::from_secs(3), system.shutdown()).await??;

    assert_eq!(
        older.receive::<i32>(Duration::from_millis(10)).await,
        Err(ReceiveError::Closed)
    );
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn subsystems_come_back_fresh_after_shutdown() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();
    let before = system.type_registry();
    let empty_before = system.empty_message();
    let types = before.len();
    before.register::<Vec<u8>>("bytes");
    assert_eq!(before.len(), types + 1);

    system.shutdown().await?;
    assert!(!system.is_initialized(SingletonKind::TypeRegistry));
    // Holders of the old instances keep them alive.
    assert!(before.is_registered("bytes"));
    assert_eq!(*empty_before, EmptyMessage);

    let after = system.type_registry();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(!after.is_registered("bytes"));
    assert_eq!(after.len(), types);

    let handle = system.new_actor::<Counter>().start().await;
    assert!(system.is_initialized(SingletonKind::Scheduler));
    handle.stop().await?;
    system.shutdown().await?;
    Ok(())
}

#[rivet_test(timeout_ms = 10000)]
async fn concurrent_first_use_creates_one_instance() -> anyhow::Result<()> {
    initialize_tracing();
    let system = RivetApp::launch();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let system = system.clone();
        tasks.push(tokio::spawn(async move { system.singletons().network_manager() }));
    }
    let mut managers = Vec::new();
    for task in tasks {
        managers.push(task.await??);
    }
    assert!(managers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));

    system.shutdown().await?;
    Ok(())
}
