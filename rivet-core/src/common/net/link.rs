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

use std::sync::atomic::Ordering;
use std::sync::Arc;

use acton_ern::Ern;
use dashmap::mapref::entry::Entry;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::protocol::{
    decode, encode, read_frame, write_frame, FRAME_DELIVER, FRAME_DOWN, FRAME_EXIT,
};
use super::wire::{Deliver, DownNotice, ExitNotice, OutboundFrame};
use super::{NetworkError, NetworkManager};
use crate::common::{ActorAddress, ActorHandle, NodeId, Singletons};
use crate::message::{EmptyMessage, Envelope, ExitReason, SystemSignal, EMPTY_TYPE_NAME};
use crate::traits::RivetMessage;

/// One live connection to a peer node.
#[derive(Debug, Clone)]
pub(crate) struct PeerLink {
    pub(crate) id: u64,
    pub(crate) node: NodeId,
    pub(crate) writer: mpsc::Sender<OutboundFrame>,
    pub(crate) cancellation_token: CancellationToken,
}

/// The proxy standing in for one remote actor.
#[derive(Debug, Clone)]
pub(crate) struct ProxyEntry {
    pub(crate) handle: ActorHandle,
    pub(crate) connection: u64,
}

impl NetworkManager {
    /// Returns the live connection to `node`, adopting `stream` only when there is none.
    ///
    /// A duplicate stream from a concurrent resolve is closed; the peer discards its side
    /// when it sees the connection end.
    pub(super) fn link_for(
        self: &Arc<Self>,
        node: NodeId,
        stream: TcpStream,
    ) -> Result<PeerLink, NetworkError> {
        if let Some(existing) = self.live_peer(&node) {
            trace!(node = %node, "Reusing connection; dropping duplicate stream");
            return Ok(existing);
        }

        let link = self.attach(node.clone(), stream)?;
        match self.peers.entry(node) {
            Entry::Occupied(existing) if !existing.get().writer.is_closed() => {
                let winner = existing.get().clone();
                drop(existing);
                trace!(node = %winner.node, "Lost connection race; closing duplicate");
                link.cancellation_token.cancel();
                Ok(winner)
            }
            Entry::Occupied(mut stale) => {
                stale.insert(link.clone());
                Ok(link)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(link.clone());
                Ok(link)
            }
        }
    }

    pub(super) fn live_peer(&self, node: &NodeId) -> Option<PeerLink> {
        self.peers
            .get(node)
            .filter(|peer| !peer.writer.is_closed())
            .map(|peer| peer.clone())
    }

    /// Starts the reader and writer tasks for a handshaken connection.
    pub(super) fn attach(
        self: &Arc<Self>,
        node: NodeId,
        stream: TcpStream,
    ) -> Result<PeerLink, NetworkError> {
        let id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        let (reader, writer) = stream.into_split();
        let (frames, queue) = mpsc::channel(self.config.limits.connection_queue_capacity);
        let link = PeerLink {
            id,
            node,
            writer: frames,
            cancellation_token: self.cancellation_token.child_token(),
        };

        self.scheduler
            .enqueue(Box::pin(write_loop(writer, queue, link.cancellation_token.clone())))?;
        let manager = Arc::clone(self);
        let reading = link.clone();
        self.scheduler.enqueue(Box::pin(async move {
            manager.read_loop(reader, &reading).await;
            manager.disconnected(&reading);
        }))?;

        debug!(connection = id, node = %link.node, "Connection attached");
        Ok(link)
    }

    /// Returns the proxy for the remote actor at `address`, creating it on `link` if needed.
    ///
    /// A proxy closes when its connection is lost or the peer reports the actor down.
    pub(super) fn proxy_for(
        self: &Arc<Self>,
        address: &ActorAddress,
        name: &str,
        link: &PeerLink,
    ) -> Result<ActorHandle, NetworkError> {
        if let Some(existing) = self.live_proxy(address) {
            return Ok(existing);
        }

        let (outbox, inbox) = mpsc::channel(self.config.limits.proxy_inbox_capacity);
        let cancellation_token = link.cancellation_token.child_token();
        let handle = ActorHandle::remote(
            Ern::with_root(name).unwrap_or_default(),
            address.clone(),
            outbox,
            cancellation_token.clone(),
        );
        let manager = Arc::clone(self);
        let forwarding = link.clone();
        let target = address.clone();
        self.scheduler.enqueue(Box::pin(async move {
            manager
                .forward_loop(inbox, &forwarding, &target, cancellation_token)
                .await;
        }))?;

        let proxy = ProxyEntry {
            handle: handle.clone(),
            connection: link.id,
        };
        match self.proxies.entry(address.clone()) {
            Entry::Occupied(existing) if !existing.get().handle.is_closed() => {
                let winner = existing.get().handle.clone();
                drop(existing);
                handle.cancellation_token.cancel();
                Ok(winner)
            }
            Entry::Occupied(mut stale) => {
                stale.insert(proxy);
                trace!(actor = %address, connection = link.id, "Replaced closed proxy");
                Ok(handle)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(proxy);
                trace!(actor = %address, connection = link.id, "Created proxy");
                Ok(handle)
            }
        }
    }

    fn live_proxy(&self, address: &ActorAddress) -> Option<ActorHandle> {
        self.proxies
            .get(address)
            .filter(|proxy| !proxy.handle.is_closed())
            .map(|proxy| proxy.handle.clone())
    }

    /// Tells `peer` once `actor` exits, so its proxy for the actor closes.
    ///
    /// At most one watch runs per actor and peer node.
    pub(super) fn watch_local(self: &Arc<Self>, actor: &ActorHandle, peer: &NodeId) {
        if actor.is_remote() {
            return;
        }
        let key = (actor.address().clone(), peer.clone());
        if !self.watches.insert(key.clone()) {
            return;
        }

        let manager = Arc::clone(self);
        let exited = actor.cancellation_token.clone();
        let watching = self.scheduler.enqueue(Box::pin(async move {
            tokio::select! {
                biased;
                () = manager.cancellation_token.cancelled() => return,
                () = exited.cancelled() => {}
            }
            manager.watches.remove(&key);
            let (actor, peer) = key;
            if let Err(e) = manager.send_down(&actor, &peer).await {
                debug!(actor = %actor, node = %peer, "Down notice not sent: {}", e);
            }
        }));
        if let Err(e) = watching {
            warn!(actor = %actor.address(), "Cannot watch actor for peer: {}", e);
            self.watches
                .remove(&(actor.address().clone(), peer.clone()));
        }
    }

    async fn send_down(&self, actor: &ActorAddress, peer: &NodeId) -> Result<(), NetworkError> {
        let link = self.live_peer(peer).ok_or(NetworkError::ConnectionClosed)?;
        let notice = DownNotice {
            actor: actor.clone(),
        };
        let frame = OutboundFrame {
            kind: FRAME_DOWN,
            payload: encode(&notice)?,
        };
        link.writer
            .send(frame)
            .await
            .map_err(|_| NetworkError::ConnectionClosed)?;
        trace!(actor = %actor, node = %peer, "Sent down notice");
        Ok(())
    }

    /// Forgets a remote actor its node reported as exited, and closes its proxy.
    fn remote_down(&self, actor: &ActorAddress) {
        self.endpoints
            .retain(|_, endpoint| endpoint.handle.address() != actor);
        if let Some((_, proxy)) = self.proxies.remove(actor) {
            proxy.handle.cancellation_token.cancel();
            debug!(actor = %actor, "Remote actor is down; closed its proxy");
        }
    }

    /// Forgets everything learned through `link` once it has gone away.
    pub(super) fn disconnected(&self, link: &PeerLink) {
        self.peers.remove_if(&link.node, |_, peer| peer.id == link.id);
        self.proxies.retain(|_, proxy| proxy.connection != link.id);
        self.endpoints
            .retain(|_, endpoint| endpoint.connection != Some(link.id));
        // Forwarders end on cancellation, so a joined proxy is never still cached.
        link.cancellation_token.cancel();
        debug!(connection = link.id, node = %link.node, "Connection closed; evicted its proxies and endpoints");
    }

    async fn read_loop(self: &Arc<Self>, mut reader: OwnedReadHalf, link: &PeerLink) {
        let max = self.config.limits.max_frame_size;
        loop {
            let frame = tokio::select! {
                biased;
                () = link.cancellation_token.cancelled() => break,
                frame = read_frame(&mut reader, max) => frame,
            };
            match frame {
                Ok((kind, payload)) => {
                    if let Err(e) = self.dispatch(kind, &payload, link).await {
                        warn!(connection = link.id, "Dropping inbound frame: {}", e);
                    }
                }
                Err(NetworkError::ConnectionClosed) => {
                    trace!(connection = link.id, "Peer closed the connection");
                    break;
                }
                Err(e) => {
                    warn!(connection = link.id, "Connection failed: {}", e);
                    break;
                }
            }
        }
    }

    async fn dispatch(
        self: &Arc<Self>,
        kind: u8,
        payload: &[u8],
        link: &PeerLink,
    ) -> Result<(), NetworkError> {
        let singletons = self
            .singletons
            .upgrade()
            .ok_or(NetworkError::NoNetworkManager)?;
        match kind {
            FRAME_DELIVER => {
                let deliver: Deliver = decode(payload)?;
                let Some(target) = singletons.actor_registry().get(deliver.to) else {
                    debug!(actor = %deliver.to, "Delivery for unknown actor");
                    return Ok(());
                };
                let message: Arc<dyn RivetMessage> = if deliver.type_name == EMPTY_TYPE_NAME {
                    singletons.empty_message()
                } else {
                    singletons
                        .type_registry()
                        .deserialize(&deliver.type_name, deliver.payload)?
                };
                let sender =
                    self.sender_handle(&singletons, &deliver.from, &deliver.from_name, link)?;
                sender
                    .create_envelope(Some(target.reply_address()))
                    .send_arc(message)
                    .await;
            }
            FRAME_DOWN => {
                let down: DownNotice = decode(payload)?;
                self.remote_down(&down.actor);
            }
            FRAME_EXIT => {
                let notice: ExitNotice = decode(payload)?;
                let Some(target) = singletons.actor_registry().get(notice.to) else {
                    debug!(actor = %notice.to, "Exit request for unknown actor");
                    return Ok(());
                };
                let sender = self.sender_handle(&singletons, &notice.from, "", link)?;
                sender
                    .create_envelope(Some(target.reply_address()))
                    .send(SystemSignal::Exit(notice.reason))
                    .await;
            }
            other => {
                return Err(NetworkError::Protocol(format!(
                    "Unexpected frame kind {other:#04x} on an established connection"
                )))
            }
        }
        Ok(())
    }

    /// The handle replies to an inbound message go to.
    fn sender_handle(
        self: &Arc<Self>,
        singletons: &Singletons,
        from: &ActorAddress,
        name: &str,
        link: &PeerLink,
    ) -> Result<ActorHandle, NetworkError> {
        if from.node() == &self.node {
            return singletons
                .actor_registry()
                .get(from.id())
                .ok_or(NetworkError::ActorExited);
        }
        let link = self.live_peer(from.node()).unwrap_or_else(|| link.clone());
        self.proxy_for(from, name, &link)
    }

    async fn forward_loop(
        self: &Arc<Self>,
        mut inbox: mpsc::Receiver<Envelope>,
        link: &PeerLink,
        target: &ActorAddress,
        cancellation_token: CancellationToken,
    ) {
        loop {
            let envelope = tokio::select! {
                biased;
                () = cancellation_token.cancelled() => break,
                received = inbox.recv() => match received {
                    Some(envelope) => envelope,
                    None => break,
                },
            };
            match self.encode_envelope(&envelope, target) {
                Ok(frame) => {
                    if link.writer.send(frame).await.is_err() {
                        break;
                    }
                    self.watch_sender(&envelope, link);
                }
                Err(e) => warn!(actor = %target, "Cannot forward message: {}", e),
            }
        }
        inbox.close();
        trace!(actor = %target, "Proxy forwarder finished");
    }

    /// The receiving node holds a proxy for a local sender from now on.
    fn watch_sender(self: &Arc<Self>, envelope: &Envelope, link: &PeerLink) {
        let from = envelope.reply_to.address();
        if from.node() != &self.node {
            return;
        }
        let Some(singletons) = self.singletons.upgrade() else {
            return;
        };
        if let Some(sender) = singletons.actor_registry().get(from.id()) {
            self.watch_local(&sender, &link.node);
        }
    }

    fn encode_envelope(
        &self,
        envelope: &Envelope,
        target: &ActorAddress,
    ) -> Result<OutboundFrame, NetworkError> {
        let message: &dyn RivetMessage = &*envelope.message;
        let from = envelope.reply_to.address().clone();

        if let Some(signal) = message.as_any().downcast_ref::<SystemSignal>() {
            let reason = match signal {
                SystemSignal::Exit(reason) => *reason,
                _ => ExitReason::Normal,
            };
            let notice = ExitNotice {
                from,
                to: target.id(),
                reason,
            };
            return Ok(OutboundFrame {
                kind: FRAME_EXIT,
                payload: encode(&notice)?,
            });
        }

        let (type_name, payload) = if message.as_any().is::<EmptyMessage>() {
            (EMPTY_TYPE_NAME.to_string(), serde_json::Value::Null)
        } else {
            self.singletons
                .upgrade()
                .ok_or(NetworkError::NoNetworkManager)?
                .type_registry()
                .serialize(message)?
        };
        let deliver = Deliver {
            from,
            from_name: envelope.reply_to.name().to_string(),
            to: target.id(),
            type_name,
            payload,
        };
        Ok(OutboundFrame {
            kind: FRAME_DELIVER,
            payload: encode(&deliver)?,
        })
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::Receiver<OutboundFrame>,
    cancellation_token: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            biased;
            () = cancellation_token.cancelled() => break,
            frame = queue.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(e) = write_frame(&mut writer, frame.kind, &frame.payload).await {
            warn!("Failed to write frame: {}", e);
            break;
        }
    }
    cancellation_token.cancel();
}
