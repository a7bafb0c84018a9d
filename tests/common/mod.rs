#![allow(dead_code)]

use tokio::io::{AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use waypoint::protocol::{ids, Codec, PacketReader, Value};
use waypoint::proxy::DirectedPacket;
use waypoint::{Config, Packet, ProxySession, SessionHandle};

/// One end of a relayed connection, as seen by the real client or server.
pub struct Peer {
    pub reader: PacketReader<ReadHalf<DuplexStream>>,
    pub writer: WriteHalf<DuplexStream>,
}

impl Peer {
    fn new(stream: DuplexStream, codec: Codec, capacity: usize) -> Self {
        let (read, write) = tokio::io::split(stream);
        Self {
            reader: PacketReader::new(read, codec, capacity),
            writer: write,
        }
    }

    pub async fn send(&mut self, packet: &Packet) {
        self.writer.write_all(packet.as_bytes()).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    pub async fn recv(&mut self) -> Packet {
        self.reader.decode_next().await.unwrap()
    }
}

/// A session wired to in-memory client and server peers. The session is not
/// started, so injections can be queued before any traffic.
pub struct Harness {
    pub session: ProxySession<DuplexStream, DuplexStream>,
    pub handle: SessionHandle,
    pub client: Peer,
    pub server: Peer,
    pub observed: UnboundedReceiver<DirectedPacket>,
    pub commands: UnboundedReceiver<String>,
    pub codec: Codec,
}

pub fn harness() -> Harness {
    harness_with(Config::default())
}

pub fn harness_with(config: Config) -> Harness {
    let codec = Codec::default();
    let (client_local, client_remote) = tokio::io::duplex(64 * 1024);
    let (server_local, server_remote) = tokio::io::duplex(64 * 1024);
    let (world_tx, observed) = mpsc::unbounded_channel();
    let (command_tx, commands) = mpsc::unbounded_channel();

    let (session, handle) = ProxySession::new(
        &config,
        codec.clone(),
        client_local,
        server_local,
        world_tx,
        command_tx,
    );
    Harness {
        session,
        handle,
        client: Peer::new(client_remote, codec.clone(), config.window_capacity),
        server: Peer::new(server_remote, codec.clone(), config.window_capacity),
        observed,
        commands,
        codec,
    }
}

pub fn chat(codec: &Codec, text: &str) -> Packet {
    codec.encode(ids::CHAT, &[Value::from(text)]).unwrap()
}

pub fn chat_text(packet: &Packet) -> String {
    assert_eq!(packet.kind(), ids::CHAT, "expected chat, got {:?}", packet);
    packet.field_as_string(0).unwrap()
}
