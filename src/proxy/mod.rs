pub mod observe;
pub mod session;

use crate::protocol::{Direction, Packet};

pub use observe::is_observed;
pub use session::{ProxySession, SessionHandle};

/// A packet tagged with the way it travels. Carried both by the injection
/// queue (where `direction` is the destination) and the observation queue.
#[derive(Debug, Clone)]
pub struct DirectedPacket {
    pub direction: Direction,
    pub packet: Packet,
    /// Internal packets are delivered but never observed.
    pub internal: bool,
}

impl DirectedPacket {
    pub fn new(direction: Direction, packet: Packet) -> Self {
        Self {
            direction,
            packet,
            internal: false,
        }
    }

    pub fn internal(direction: Direction, packet: Packet) -> Self {
        Self {
            direction,
            packet,
            internal: true,
        }
    }
}
