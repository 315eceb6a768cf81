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

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{
    decode, encode, read_raw_frame, write_frame, FRAME_HELLO, FRAME_REJECT, FRAME_WELCOME,
    PROTOCOL_VERSION,
};
use super::wire::{Hello, Reject, RejectReason, Welcome};
use super::{NetworkError, NetworkManager};

impl NetworkManager {
    pub(super) async fn accept_loop(
        self: Arc<Self>,
        listener: TcpListener,
        port: u16,
        cancellation_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                biased;

                () = cancellation_token.cancelled() => {
                    info!(port, "Listener received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer)) => {
                            trace!(port, %peer, "Accepted connection");
                            if let Err(e) = stream.set_nodelay(true) {
                                warn!("Failed to set TCP_NODELAY: {}", e);
                            }
                            let manager = Arc::clone(&self);
                            let handling = self.scheduler.enqueue(Box::pin(async move {
                                if let Err(e) = manager.handle_incoming(stream, port).await {
                                    debug!(port, "Incoming handshake failed: {}", e);
                                }
                            }));
                            if let Err(e) = handling {
                                error!(port, "Cannot schedule connection handler: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            error!(port, "Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    }

    /// Answers one HELLO on a published port and, for a remote peer, keeps the connection.
    async fn handle_incoming(
        self: Arc<Self>,
        mut stream: TcpStream,
        port: u16,
    ) -> Result<(), NetworkError> {
        let max = self.config.limits.max_frame_size;
        let opening = tokio::time::timeout(
            self.config.handshake_timeout(),
            read_raw_frame(&mut stream, max),
        )
        .await
        .map_err(|_| NetworkError::Protocol("handshake timed out".to_string()))??;

        if opening.version != PROTOCOL_VERSION {
            debug!(port, version = opening.version, "Peer speaks another protocol version");
            return reject(&mut stream, RejectReason::VersionMismatch).await;
        }
        if opening.kind != FRAME_HELLO {
            return Err(NetworkError::Protocol(format!(
                "Expected HELLO, got frame kind {:#04x}",
                opening.kind
            )));
        }
        let hello: Hello = decode(&opening.payload)?;
        let Some(actor) = self.acceptors.get(&port).map(|acceptor| acceptor.actor.clone()) else {
            return reject(&mut stream, RejectReason::NoSuchActor).await;
        };
        if actor.is_closed() {
            return reject(&mut stream, RejectReason::ActorExited).await;
        }

        let welcome = Welcome {
            node: self.node.clone(),
            actor: actor.address().clone(),
            name: actor.name().to_string(),
        };
        write_frame(&mut stream, FRAME_WELCOME, &encode(&welcome)?).await?;

        if hello.node == self.node {
            trace!(port, "Loopback handshake complete");
            return Ok(());
        }

        let link = self.attach(hello.node.clone(), stream)?;
        self.peers
            .entry(hello.node.clone())
            .and_modify(|existing| {
                if existing.writer.is_closed() {
                    *existing = link.clone();
                }
            })
            .or_insert(link);
        self.watch_local(&actor, &hello.node);
        Ok(())
    }
}

async fn reject(stream: &mut TcpStream, reason: RejectReason) -> Result<(), NetworkError> {
    debug!(?reason, "Rejecting handshake");
    write_frame(stream, FRAME_REJECT, &encode(&Reject { reason })?).await
}
