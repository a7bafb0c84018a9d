pub mod codec;
pub mod field;
pub mod float;
pub mod packet;
pub mod reader;
pub mod schema;
pub mod window;

use std::fmt;

pub use codec::{Codec, PacketEncoder};
pub use field::{FieldKind, Value};
pub use packet::Packet;
pub use reader::PacketReader;
pub use schema::{ids, Schema};

/// Which way a packet travels through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent by the server, destined for the client.
    ToClient,
    /// Sent by the client, destined for the server.
    ToServer,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::ToClient => Direction::ToServer,
            Direction::ToServer => Direction::ToClient,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToClient => write!(f, "server -> client"),
            Direction::ToServer => write!(f, "client -> server"),
        }
    }
}
