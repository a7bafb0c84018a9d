use crate::config::Config;
use crate::error::{Result, WaypointError};
use crate::logger::{log, LogSeverity};
use crate::protocol::{ids, Codec, Direction, Packet, PacketEncoder, PacketReader};
use crate::proxy::observe::is_observed;
use crate::proxy::DirectedPacket;
use futures::SinkExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio_util::codec::FramedWrite;

/// One relayed client/server connection pair.
///
/// The session owns both streams and is driven by [`ProxySession::run`].
/// Everything else talks to it through a [`SessionHandle`].
pub struct ProxySession<C, S> {
    client_reader: PacketReader<ReadHalf<C>>,
    client_writer: FramedWrite<WriteHalf<C>, PacketEncoder>,
    server_reader: PacketReader<ReadHalf<S>>,
    server_writer: FramedWrite<WriteHalf<S>, PacketEncoder>,
    injections: UnboundedReceiver<DirectedPacket>,
    world_tx: UnboundedSender<DirectedPacket>,
    command_tx: UnboundedSender<String>,
    command_prefix: String,
    track_terrain: bool,
    active: Arc<AtomicBool>,
    closed: watch::Sender<bool>,
}

/// Cloneable entry point into a running session.
#[derive(Clone)]
pub struct SessionHandle {
    injector: UnboundedSender<DirectedPacket>,
    active: Arc<AtomicBool>,
    closed: watch::Receiver<bool>,
}

impl<C, S> ProxySession<C, S>
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        config: &Config,
        codec: Codec,
        client: C,
        server: S,
        world_tx: UnboundedSender<DirectedPacket>,
        command_tx: UnboundedSender<String>,
    ) -> (Self, SessionHandle) {
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);
        let (injector, injections) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        let active = Arc::new(AtomicBool::new(true));

        let session = Self {
            client_reader: PacketReader::new(client_read, codec.clone(), config.window_capacity),
            client_writer: FramedWrite::new(client_write, PacketEncoder),
            server_reader: PacketReader::new(server_read, codec, config.window_capacity),
            server_writer: FramedWrite::new(server_write, PacketEncoder),
            injections,
            world_tx,
            command_tx,
            command_prefix: config.command_prefix.clone(),
            track_terrain: config.track_terrain,
            active: active.clone(),
            closed: closed_tx,
        };
        let handle = SessionHandle {
            injector,
            active,
            closed: closed_rx,
        };
        (session, handle)
    }

    /// Relays until either side fails or closes, then signals the handles.
    /// Always ends in an error; an orderly close is an `UnexpectedEof`.
    pub async fn run(mut self) -> Result<()> {
        let result = self.relay().await;
        self.active.store(false, Ordering::SeqCst);
        let _ = self.closed.send(true);
        result
    }

    async fn relay(&mut self) -> Result<()> {
        loop {
            // Queued injections go out before anything freshly read.
            while let Ok(injected) = self.injections.try_recv() {
                self.deliver(injected).await?;
            }

            tokio::select! {
                biased;
                Some(injected) = self.injections.recv() => self.deliver(injected).await?,
                packet = self.client_reader.decode_next() => {
                    let packet = packet.map_err(|err| err.in_direction(Direction::ToServer))?;
                    self.relay_from_client(packet).await?;
                }
                packet = self.server_reader.decode_next() => {
                    let packet = packet.map_err(|err| err.in_direction(Direction::ToClient))?;
                    self.send(Direction::ToClient, packet.clone()).await?;
                    self.observe(Direction::ToClient, packet);
                }
            }
        }
    }

    async fn relay_from_client(&mut self, packet: Packet) -> Result<()> {
        // Chat that does not decode cannot be a command; it is relayed as is.
        if let Some(text) = self.chat_text(&packet) {
            if let Some(command) = text.strip_prefix(&self.command_prefix) {
                log(format!("Diverting command: {}", command), LogSeverity::Debug);
                if self.command_tx.send(command.to_owned()).is_err() {
                    log(
                        "Command interpreter is gone, dropping command".to_owned(),
                        LogSeverity::Warning,
                    );
                }
                return Ok(());
            }
        }
        self.send(Direction::ToServer, packet.clone()).await?;
        self.observe(Direction::ToServer, packet);
        Ok(())
    }

    fn chat_text(&self, packet: &Packet) -> Option<String> {
        if packet.kind() != ids::CHAT {
            return None;
        }
        match packet.field_as_string(0) {
            Ok(text) => Some(text),
            Err(err) => {
                log(format!("Relaying undecodable chat: {}", err), LogSeverity::Warning);
                None
            }
        }
    }

    async fn deliver(&mut self, injected: DirectedPacket) -> Result<()> {
        log(
            format!(
                "Injecting {} ({})",
                injected.packet.name(),
                injected.direction
            ),
            LogSeverity::Debug,
        );
        self.send(injected.direction, injected.packet.clone()).await?;
        if !injected.internal {
            self.observe(injected.direction, injected.packet);
        }
        Ok(())
    }

    async fn send(&mut self, direction: Direction, packet: Packet) -> Result<()> {
        let sent = match direction {
            Direction::ToClient => self.client_writer.send(packet).await,
            Direction::ToServer => self.server_writer.send(packet).await,
        };
        sent.map_err(WaypointError::from)
    }

    fn observe(&self, direction: Direction, packet: Packet) {
        if !self.active.load(Ordering::SeqCst) || !is_observed(packet.kind(), self.track_terrain) {
            return;
        }
        // A stopped world worker has already reported why.
        let _ = self.world_tx.send(DirectedPacket::new(direction, packet));
    }
}

impl SessionHandle {
    fn push(&self, injected: DirectedPacket) -> Result<()> {
        if !self.is_active() {
            return Err(WaypointError::SessionClosed);
        }
        self.injector
            .send(injected)
            .map_err(|_| WaypointError::SessionClosed)
    }

    pub fn inject_to_client(&self, packet: Packet) -> Result<()> {
        self.push(DirectedPacket::new(Direction::ToClient, packet))
    }

    pub fn inject_to_server(&self, packet: Packet) -> Result<()> {
        self.push(DirectedPacket::new(Direction::ToServer, packet))
    }

    /// Sends to the client without feeding the world model, for packets the
    /// proxy itself originates such as command replies.
    pub fn inject_to_client_internal(&self, packet: Packet) -> Result<()> {
        self.push(DirectedPacket::internal(Direction::ToClient, packet))
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Resolves once the session has terminated.
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        // A dropped sender means the session is gone as well.
        let _ = closed.wait_for(|closed| *closed).await;
    }
}
