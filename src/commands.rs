use crate::error::Result;
use crate::logger::{log, LogSeverity};
use crate::protocol::{ids, Codec, Value};
use crate::proxy::SessionHandle;
use crate::world::chunk::AIR;
use crate::world::SharedWorld;
use tokio::sync::mpsc::UnboundedReceiver;

/// Eye height above the feet, sent as the stance.
const STANCE_OFFSET: f64 = 1.62;
/// How far `jump` looks ahead, in blocks.
const JUMP_REACH: i32 = 16;

/// Runs diverted chat commands against one session.
pub struct CommandInterpreter {
    codec: Codec,
    session: SessionHandle,
    world: SharedWorld,
    prefix: String,
}

impl CommandInterpreter {
    pub fn new(codec: Codec, session: SessionHandle, world: SharedWorld, prefix: String) -> Self {
        Self {
            codec,
            session,
            world,
            prefix,
        }
    }

    /// Executes commands until the session drops its end of the channel.
    pub async fn run(self, mut commands: UnboundedReceiver<String>) {
        while let Some(line) = commands.recv().await {
            if let Err(err) = self.execute(&line).await {
                log(format!("Command '{}' failed: {}", line, err), LogSeverity::Error);
            }
        }
    }

    /// Executes one command line, without its prefix.
    pub async fn execute(&self, line: &str) -> Result<()> {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("goto") => {
                let target = match (words.next(), words.next(), words.next()) {
                    (Some(x), Some(z), None) => x.parse::<i32>().ok().zip(z.parse::<i32>().ok()),
                    _ => None,
                };
                match target {
                    Some((x, z)) => self.goto(x, z).await,
                    None => self.reply(&format!("Usage: {}goto <x> <z>", self.prefix)),
                }
            }
            Some("jump") => self.jump().await,
            Some("pos") => self.report_position().await,
            Some("help") | None => self.reply(&format!(
                "Commands: {0}goto <x> <z>, {0}jump, {0}pos, {0}help",
                self.prefix
            )),
            Some(other) => self.reply(&format!("Unknown command: {}", other)),
        }
    }

    async fn goto(&self, x: i32, z: i32) -> Result<()> {
        let y = {
            let world = self.world.read().await;
            match world.surface_at(x, z) {
                Some(surface) => surface.height as f64 + 1.0,
                None => world.player().y,
            }
        };
        self.teleport(x as f64 + 0.5, y, z as f64 + 0.5).await
    }

    /// Hops over whatever blocks the way ahead, landing in the first free
    /// column past it.
    async fn jump(&self) -> Result<()> {
        let landing = {
            let world = self.world.read().await;
            let player = world.player();
            let (dx, dz) = facing(player.yaw);
            let (bx, fy, bz) = (
                player.x.floor() as i32,
                player.y.floor() as i32,
                player.z.floor() as i32,
            );
            let passable = |x: i32, y: i32, z: i32| world.block_at(x, y, z).map(|b| b == AIR);

            let mut blocked = false;
            let mut landing = None;
            for step in 1..=JUMP_REACH {
                let (x, z) = (bx.wrapping_add(dx * step), bz.wrapping_add(dz * step));
                let (Some(feet), Some(head)) = (passable(x, fy, z), passable(x, fy + 1, z)) else {
                    break;
                };
                if !(feet && head) {
                    blocked = true;
                } else if blocked {
                    landing = Some((x, z));
                    break;
                }
            }
            match landing {
                Some((x, z)) => Ok((x as f64 + 0.5, player.y, z as f64 + 0.5)),
                None => Err(blocked),
            }
        };

        match landing {
            Ok((x, y, z)) => self.teleport(x, y, z).await,
            Err(true) => self.reply("No free space within reach"),
            Err(false) => self.reply("Nothing to jump over"),
        }
    }

    async fn report_position(&self) -> Result<()> {
        let message = {
            let world = self.world.read().await;
            let player = world.player();
            if player.positioned {
                format!("Position: {:.2}, {:.2}, {:.2}", player.x, player.y, player.z)
            } else {
                "Position unknown".to_owned()
            }
        };
        self.reply(&message)
    }

    /// Moves the player by telling both ends the same position. Each end
    /// expects its own field order.
    async fn teleport(&self, x: f64, y: f64, z: f64) -> Result<()> {
        let (yaw, pitch) = {
            let world = self.world.read().await;
            (world.player().yaw, world.player().pitch)
        };
        let stance = y + STANCE_OFFSET;
        log(format!("Teleporting to {:.2}, {:.2}, {:.2}", x, y, z), LogSeverity::Info);

        let look = [Value::Float(yaw), Value::Float(pitch), Value::from(true)];
        let mut to_client = vec![
            Value::Double(x),
            Value::Double(stance),
            Value::Double(y),
            Value::Double(z),
        ];
        to_client.extend_from_slice(&look);
        let mut to_server = vec![
            Value::Double(x),
            Value::Double(y),
            Value::Double(stance),
            Value::Double(z),
        ];
        to_server.extend_from_slice(&look);

        self.session
            .inject_to_client(self.codec.encode(ids::PLAYER_POSITION_LOOK, &to_client)?)?;
        self.session
            .inject_to_server(self.codec.encode(ids::PLAYER_POSITION_LOOK, &to_server)?)
    }

    fn reply(&self, text: &str) -> Result<()> {
        let packet = self.codec.encode(ids::CHAT, &[Value::from(text)])?;
        self.session.inject_to_client_internal(packet)
    }
}

/// Unit step along the horizontal axis closest to `yaw` (degrees, 0 = +z).
fn facing(yaw: f32) -> (i32, i32) {
    let radians = (yaw as f64).to_radians();
    let (dx, dz) = (-radians.sin(), radians.cos());
    if dx.abs() > dz.abs() {
        (dx.signum() as i32, 0)
    } else {
        (0, dz.signum() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::protocol::{Packet, PacketReader};
    use crate::proxy::{DirectedPacket, ProxySession};
    use crate::world::World;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tokio::io::{DuplexStream, ReadHalf};
    use tokio::sync::mpsc;

    struct Setup {
        interpreter: CommandInterpreter,
        client: PacketReader<ReadHalf<DuplexStream>>,
        server: PacketReader<ReadHalf<DuplexStream>>,
        observed: mpsc::UnboundedReceiver<DirectedPacket>,
        world: SharedWorld,
        _ends: (tokio::io::WriteHalf<DuplexStream>, tokio::io::WriteHalf<DuplexStream>),
    }

    fn setup() -> Setup {
        let codec = Codec::default();
        let config = Config::default();
        let world = World::shared();
        let (client_local, client_remote) = tokio::io::duplex(64 * 1024);
        let (server_local, server_remote) = tokio::io::duplex(64 * 1024);
        let (world_tx, observed) = mpsc::unbounded_channel();
        let (command_tx, _) = mpsc::unbounded_channel();

        let (session, handle) = ProxySession::new(
            &config,
            codec.clone(),
            client_local,
            server_local,
            world_tx,
            command_tx,
        );
        tokio::spawn(session.run());

        let (client_read, client_write) = tokio::io::split(client_remote);
        let (server_read, server_write) = tokio::io::split(server_remote);
        Setup {
            interpreter: CommandInterpreter::new(codec.clone(), handle, world.clone(), "//".to_owned()),
            client: PacketReader::new(client_read, codec.clone(), config.window_capacity),
            server: PacketReader::new(server_read, codec, config.window_capacity),
            observed,
            world,
            _ends: (client_write, server_write),
        }
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn chat_text(packet: &Packet) -> String {
        assert_eq!(packet.kind(), ids::CHAT);
        packet.field_as_string(0).unwrap()
    }

    #[tokio::test]
    async fn test_goto_lands_on_surface() {
        let mut setup = setup();
        {
            let mut world = setup.world.write().await;
            world
                .apply_chunk_update(10, 0, 20, 1, 64, 1, &deflate(&[1u8; 64]))
                .unwrap();
        }

        setup.interpreter.execute("goto 10 20").await.unwrap();

        let to_client = setup.client.decode_next().await.unwrap();
        assert_eq!(to_client.kind(), ids::PLAYER_POSITION_LOOK);
        assert_eq!(to_client.field_as_double(0).unwrap(), 10.5);
        assert_eq!(to_client.field_as_double(2).unwrap(), 64.0);
        assert_eq!(to_client.field_as_double(1).unwrap(), 64.0 + STANCE_OFFSET);

        let to_server = setup.server.decode_next().await.unwrap();
        assert_eq!(to_server.field_as_double(1).unwrap(), 64.0);
        assert_eq!(to_server.field_as_double(3).unwrap(), 20.5);

        // Teleports feed the world model like any movement.
        let observed = setup.observed.recv().await.unwrap();
        assert_eq!(observed.packet.kind(), ids::PLAYER_POSITION_LOOK);
    }

    #[tokio::test]
    async fn test_bad_arguments_reply_with_usage() {
        let mut setup = setup();
        setup.interpreter.execute("goto ten 20").await.unwrap();
        let reply = setup.client.decode_next().await.unwrap();
        assert_eq!(chat_text(&reply), "Usage: //goto <x> <z>");
    }

    #[tokio::test]
    async fn test_unknown_command_is_reported() {
        let mut setup = setup();
        setup.interpreter.execute("fly away").await.unwrap();
        let reply = setup.client.decode_next().await.unwrap();
        assert_eq!(chat_text(&reply), "Unknown command: fly");
    }

    #[tokio::test]
    async fn test_jump_clears_wall() {
        let mut setup = setup();
        {
            let mut world = setup.world.write().await;
            // Floor at y = 63 from z = 0 to z = 15, wall at z = 3 and 4.
            let mut blocks = Vec::new();
            for z in 0..16 {
                let mut column = vec![1u8; 64];
                column.extend_from_slice(if z == 3 || z == 4 { &[1, 1] } else { &[0, 0] });
                blocks.extend_from_slice(&column);
            }
            world
                .apply_chunk_update(0, 0, 0, 1, 66, 16, &deflate(&blocks))
                .unwrap();
            let player = world.player_mut();
            player.set_position(0.5, 64.0, 65.62, 0.5);
            player.set_look(0.0, 0.0);
        }

        setup.interpreter.execute("jump").await.unwrap();

        let to_client = setup.client.decode_next().await.unwrap();
        assert_eq!(to_client.kind(), ids::PLAYER_POSITION_LOOK);
        assert_eq!(to_client.field_as_double(3).unwrap(), 5.5);
        assert_eq!(to_client.field_as_double(2).unwrap(), 64.0);
    }

    #[tokio::test]
    async fn test_jump_without_obstacle() {
        let mut setup = setup();
        setup.interpreter.execute("jump").await.unwrap();
        let reply = setup.client.decode_next().await.unwrap();
        assert_eq!(chat_text(&reply), "Nothing to jump over");
    }

    #[test]
    fn test_facing_snaps_to_axis() {
        assert_eq!(facing(0.0), (0, 1));
        assert_eq!(facing(90.0), (-1, 0));
        assert_eq!(facing(180.0), (0, -1));
        assert_eq!(facing(-90.0), (1, 0));
        assert_eq!(facing(400.0), (0, 1));
    }
}
