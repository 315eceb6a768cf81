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

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};

use dashmap::{DashMap, DashSet};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::link::{PeerLink, ProxyEntry};
use super::protocol::{
    decode, encode, read_frame, write_frame, FRAME_HELLO, FRAME_REJECT, FRAME_WELCOME,
};
use super::wire::{Hello, Reject, RejectReason, Welcome};
use super::NetworkError;
use crate::common::config::RivetConfig;
use crate::common::{ActorAddress, ActorHandle, NodeId, SchedulerRef, Singletons};

/// A port this node accepts connections on, and the actor served there.
pub(super) struct Acceptor {
    pub(super) actor: ActorHandle,
    pub(super) cancellation_token: CancellationToken,
}

/// A resolved endpoint. `connection` is `None` for endpoints served by this node.
#[derive(Clone)]
pub(super) struct Endpoint {
    pub(super) handle: ActorHandle,
    pub(super) node: NodeId,
    pub(super) connection: Option<u64>,
}

/// Publishes local actors and resolves remote endpoints.
///
/// Resolution is cached per `(host, port)` for the lifetime of the actor system, and remote
/// actors are represented by at most one proxy each, so resolving an endpoint twice, or two
/// endpoints serving the same actor, yields the same handle. Connections are shared: one per
/// peer node, used in both directions. When a connection drops, everything learned through it
/// is forgotten and the next `resolve` reconnects. When a remote actor exits, its node sends a
/// down notice and the proxy and cached endpoints for that actor are dropped.
pub struct NetworkManager {
    pub(super) node: NodeId,
    pub(super) singletons: Weak<Singletons>,
    pub(super) scheduler: SchedulerRef,
    pub(super) config: RivetConfig,
    pub(super) acceptors: DashMap<u16, Acceptor>,
    pub(super) endpoints: DashMap<(String, u16), Endpoint>,
    pub(super) peers: DashMap<NodeId, PeerLink>,
    pub(super) proxies: DashMap<ActorAddress, ProxyEntry>,
    /// Local actors some peer node was told about, paired with that node.
    pub(super) watches: DashSet<(ActorAddress, NodeId)>,
    pub(super) next_connection: AtomicU64,
    pub(super) cancellation_token: CancellationToken,
}

impl NetworkManager {
    pub(crate) fn new(
        node: NodeId,
        singletons: Weak<Singletons>,
        scheduler: SchedulerRef,
        config: RivetConfig,
    ) -> Self {
        Self {
            node,
            singletons,
            scheduler,
            config,
            acceptors: DashMap::new(),
            endpoints: DashMap::new(),
            peers: DashMap::new(),
            proxies: DashMap::new(),
            watches: DashSet::new(),
            next_connection: AtomicU64::new(1),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub(crate) fn start(&self) {
        debug!(node = %self.node, "Network manager ready");
    }

    /// Closes every listener and connection. Their tasks end on the scheduler.
    pub(crate) fn stop(&self) {
        self.cancellation_token.cancel();
        self.acceptors.clear();
        self.proxies.clear();
        self.watches.clear();
        self.peers.clear();
        self.endpoints.clear();
        info!(node = %self.node, "Network manager stopped");
    }

    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    /// Ports currently published by this node.
    pub fn published_ports(&self) -> Vec<u16> {
        self.acceptors.iter().map(|entry| *entry.key()).collect()
    }

    /// Number of live connections to other nodes.
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Starts listening on `host:port` for resolvers of `actor`, returning the bound port.
    #[instrument(skip(self, actor), fields(actor = %actor.address()))]
    pub async fn publish(
        self: &Arc<Self>,
        actor: &ActorHandle,
        host: &str,
        port: u16,
    ) -> Result<u16, NetworkError> {
        if actor.is_remote() {
            return Err(NetworkError::Protocol(format!(
                "cannot publish proxy for remote actor {}",
                actor.address()
            )));
        }
        if actor.is_closed() {
            return Err(NetworkError::ActorExited);
        }

        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                NetworkError::AddressInUse {
                    host: host.to_string(),
                    port,
                }
            } else {
                NetworkError::from(e)
            }
        })?;
        let bound = listener.local_addr()?.port();

        let cancellation_token = self.cancellation_token.child_token();
        self.acceptors.insert(
            bound,
            Acceptor {
                actor: actor.clone(),
                cancellation_token: cancellation_token.clone(),
            },
        );
        let manager = Arc::clone(self);
        let accepting = self.scheduler.enqueue(Box::pin(async move {
            manager.accept_loop(listener, bound, cancellation_token).await;
        }));
        if let Err(e) = accepting {
            self.acceptors.remove(&bound);
            return Err(e.into());
        }

        info!(host, port = bound, "Published actor");
        Ok(bound)
    }

    /// Stops serving `port`. Connections already established stay up.
    pub fn unpublish(&self, port: u16) -> Result<(), NetworkError> {
        let (_, acceptor) = self
            .acceptors
            .remove(&port)
            .ok_or(NetworkError::NotPublished { port })?;
        acceptor.cancellation_token.cancel();
        info!(port, actor = %acceptor.actor.address(), "Unpublished actor");
        Ok(())
    }

    /// Returns the handle for the actor published at `host:port`.
    ///
    /// A cached endpoint is returned without network traffic. Otherwise the endpoint is
    /// contacted: an actor served by this node resolves to its local handle, anything else to
    /// a proxy. Failures are not cached.
    #[instrument(skip(self))]
    pub async fn resolve(
        self: &Arc<Self>,
        host: &str,
        port: u16,
    ) -> Result<ActorHandle, NetworkError> {
        let key = (host.to_string(), port);
        if let Some(endpoint) = self.endpoints.get(&key) {
            trace!(node = %endpoint.node, "Resolved from cache");
            return Ok(endpoint.handle.clone());
        }

        let mut stream = self.connect(host, port).await?;
        let welcome = tokio::time::timeout(
            self.config.handshake_timeout(),
            self.handshake(&mut stream, host, port),
        )
        .await
        .map_err(|_| NetworkError::Timeout {
            host: host.to_string(),
            port,
        })??;

        let (handle, connection) = if welcome.node == self.node {
            drop(stream);
            let singletons = self
                .singletons
                .upgrade()
                .ok_or(NetworkError::NoNetworkManager)?;
            let handle = singletons
                .actor_registry()
                .get(welcome.actor.id())
                .ok_or_else(|| NetworkError::NoSuchActor {
                    host: host.to_string(),
                    port,
                })?;
            trace!("Endpoint is served by this node; using the local handle");
            (handle, None)
        } else {
            let link = self.link_for(welcome.node.clone(), stream)?;
            let handle = self.proxy_for(&welcome.actor, &welcome.name, &link)?;
            (handle, Some(link.id))
        };

        let endpoint = self
            .endpoints
            .entry(key)
            .or_insert(Endpoint {
                handle,
                node: welcome.node,
                connection,
            })
            .value()
            .clone();
        debug!(actor = %endpoint.handle.address(), remote = endpoint.handle.is_remote(), "Resolved endpoint");
        Ok(endpoint.handle)
    }

    async fn connect(&self, host: &str, port: u16) -> Result<TcpStream, NetworkError> {
        let attempt = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect((host, port)),
        )
        .await;
        match attempt {
            Err(_) => Err(NetworkError::Timeout {
                host: host.to_string(),
                port,
            }),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                Err(NetworkError::ConnectionRefused {
                    host: host.to_string(),
                    port,
                })
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    warn!("Failed to set TCP_NODELAY: {}", e);
                }
                Ok(stream)
            }
        }
    }

    async fn handshake(
        &self,
        stream: &mut TcpStream,
        host: &str,
        port: u16,
    ) -> Result<Welcome, NetworkError> {
        let hello = Hello {
            node: self.node.clone(),
        };
        write_frame(stream, FRAME_HELLO, &encode(&hello)?).await?;

        let (kind, payload) = read_frame(stream, self.config.limits.max_frame_size).await?;
        match kind {
            FRAME_WELCOME => decode(&payload),
            FRAME_REJECT => {
                let reject: Reject = decode(&payload)?;
                Err(match reject.reason {
                    RejectReason::NoSuchActor => NetworkError::NoSuchActor {
                        host: host.to_string(),
                        port,
                    },
                    RejectReason::ActorExited => {
                        NetworkError::HandshakeRejected("published actor has exited".to_string())
                    }
                    RejectReason::VersionMismatch => {
                        NetworkError::HandshakeRejected("protocol version mismatch".to_string())
                    }
                })
            }
            other => Err(NetworkError::Protocol(format!(
                "Unexpected frame kind {other:#04x} during handshake"
            ))),
        }
    }
}

impl fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkManager")
            .field("node", &self.node)
            .field("published", &self.acceptors.len())
            .field("endpoints", &self.endpoints.len())
            .field("peers", &self.peers.len())
            .field("proxies", &self.proxies.len())
            .finish()
    }
}
