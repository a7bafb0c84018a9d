use crate::error::{Result, WorldError};
use crate::logger::{log, LogSeverity};
use crate::protocol::field::{ItemStack, Value};
use crate::protocol::{ids, Direction, Packet};
use crate::proxy::DirectedPacket;
use crate::world::entity::{Entity, EntityKind};
use crate::world::model::{SharedWorld, World};
use tokio::sync::mpsc::UnboundedReceiver;

/// The world update worker. Applies observed packets until the queue closes.
/// A terrain ingestion failure stops the worker.
pub async fn run(world: SharedWorld, mut observed: UnboundedReceiver<DirectedPacket>) -> Result<()> {
    while let Some(DirectedPacket {
        direction, packet, ..
    }) = observed.recv().await
    {
        let mut world = world.write().await;
        if let Err(err) = apply(&mut world, direction, &packet) {
            log(
                format!(
                    "World update from {} ({}) failed: {}",
                    packet.name(),
                    direction,
                    err
                ),
                LogSeverity::Fatal,
            );
            return Err(err.into());
        }
    }
    log("World update queue closed".to_owned(), LogSeverity::Debug);
    Ok(())
}

fn byte(packet: &Packet, index: usize) -> std::result::Result<i8, WorldError> {
    Ok(packet.field_as_int(index)? as i8)
}

/// Applies one observed packet to the world model.
pub fn apply(world: &mut World, direction: Direction, packet: &Packet) -> std::result::Result<(), WorldError> {
    match packet.kind() {
        // The client's login carries the protocol version where the server's has the entity id.
        ids::LOGIN if direction == Direction::ToClient => {
            world.clear_entities();
            let player = world.player_mut();
            player.entity_id = Some(packet.field_as_int(0)?);
            player.dimension = byte(packet, 3)?;
        }
        ids::TIME_UPDATE => world.set_time(packet.field_as_long(0)?),
        ids::UPDATE_HEALTH => world.player_mut().health = packet.field_as_int(0)? as i16,
        ids::PLAYER_POSITION => {
            let (x, y, stance, z) = (
                packet.field_as_double(0)?,
                packet.field_as_double(1)?,
                packet.field_as_double(2)?,
                packet.field_as_double(3)?,
            );
            world.player_mut().set_position(x, y, stance, z);
        }
        ids::PLAYER_LOOK => {
            let (yaw, pitch) = (packet.field_as_double(0)?, packet.field_as_double(1)?);
            world.player_mut().set_look(yaw as f32, pitch as f32);
        }
        ids::PLAYER_POSITION_LOOK => {
            let x = packet.field_as_double(0)?;
            let z = packet.field_as_double(3)?;
            // Server-bound carries y before stance, client-bound the reverse.
            let (y, stance) = match direction {
                Direction::ToServer => (packet.field_as_double(1)?, packet.field_as_double(2)?),
                Direction::ToClient => (packet.field_as_double(2)?, packet.field_as_double(1)?),
            };
            let (yaw, pitch) = (packet.field_as_double(4)?, packet.field_as_double(5)?);
            let player = world.player_mut();
            player.set_position(x, y, stance, z);
            player.set_look(yaw as f32, pitch as f32);
        }
        ids::NAMED_ENTITY_SPAWN => {
            let mut entity = Entity::new(
                packet.field_as_int(0)?,
                EntityKind::Player {
                    name: packet.field_as_string(1)?,
                },
                packet.field_as_int(2)?,
                packet.field_as_int(3)?,
                packet.field_as_int(4)?,
            );
            entity.yaw = byte(packet, 5)?;
            entity.pitch = byte(packet, 6)?;
            world.spawn_entity(entity);
        }
        ids::PICKUP_SPAWN => {
            let item = ItemStack {
                id: packet.field_as_int(1)? as i16,
                count: byte(packet, 2)?,
                damage: packet.field_as_int(3)? as i16,
            };
            let entity = Entity::new(
                packet.field_as_int(0)?,
                EntityKind::Pickup { item },
                packet.field_as_int(4)?,
                packet.field_as_int(5)?,
                packet.field_as_int(6)?,
            );
            world.spawn_entity(entity);
        }
        ids::ADD_OBJECT => {
            let entity = Entity::new(
                packet.field_as_int(0)?,
                EntityKind::Object {
                    object_type: byte(packet, 1)?,
                },
                packet.field_as_int(2)?,
                packet.field_as_int(3)?,
                packet.field_as_int(4)?,
            );
            world.spawn_entity(entity);
        }
        ids::MOB_SPAWN => {
            let mut entity = Entity::new(
                packet.field_as_int(0)?,
                EntityKind::Mob {
                    mob_type: byte(packet, 1)?,
                },
                packet.field_as_int(2)?,
                packet.field_as_int(3)?,
                packet.field_as_int(4)?,
            );
            entity.yaw = byte(packet, 5)?;
            entity.pitch = byte(packet, 6)?;
            world.spawn_entity(entity);
        }
        ids::PAINTING => {
            // Paintings are placed on block coordinates, not fixed-point ones.
            let entity = Entity::new(
                packet.field_as_int(0)?,
                EntityKind::Painting {
                    title: packet.field_as_string(1)?,
                },
                packet.field_as_int(2)?.wrapping_mul(32),
                packet.field_as_int(3)?.wrapping_mul(32),
                packet.field_as_int(4)?.wrapping_mul(32),
            );
            world.spawn_entity(entity);
        }
        ids::DESTROY_ENTITY => {
            world.remove_entity(packet.field_as_int(0)?);
        }
        ids::ENTITY_RELATIVE_MOVE => {
            let (dx, dy, dz) = (byte(packet, 1)?, byte(packet, 2)?, byte(packet, 3)?);
            if let Some(entity) = world.entity_mut(packet.field_as_int(0)?) {
                entity.move_by(dx, dy, dz);
            }
        }
        ids::ENTITY_LOOK => {
            let (yaw, pitch) = (byte(packet, 1)?, byte(packet, 2)?);
            if let Some(entity) = world.entity_mut(packet.field_as_int(0)?) {
                entity.yaw = yaw;
                entity.pitch = pitch;
            }
        }
        ids::ENTITY_LOOK_MOVE => {
            let (dx, dy, dz) = (byte(packet, 1)?, byte(packet, 2)?, byte(packet, 3)?);
            let (yaw, pitch) = (byte(packet, 4)?, byte(packet, 5)?);
            if let Some(entity) = world.entity_mut(packet.field_as_int(0)?) {
                entity.move_by(dx, dy, dz);
                entity.yaw = yaw;
                entity.pitch = pitch;
            }
        }
        ids::ENTITY_TELEPORT => {
            let (x, y, z) = (
                packet.field_as_int(1)?,
                packet.field_as_int(2)?,
                packet.field_as_int(3)?,
            );
            let (yaw, pitch) = (byte(packet, 4)?, byte(packet, 5)?);
            if let Some(entity) = world.entity_mut(packet.field_as_int(0)?) {
                entity.x = x;
                entity.y = y;
                entity.z = z;
                entity.yaw = yaw;
                entity.pitch = pitch;
            }
        }
        ids::ATTACH_ENTITY => {
            let vehicle = packet.field_as_int(1)?;
            if let Some(entity) = world.entity_mut(packet.field_as_int(0)?) {
                entity.vehicle = (vehicle != -1).then_some(vehicle);
            }
        }
        ids::MAP_CHUNK => {
            // Sizes travel as size - 1 in an unsigned byte.
            let size = |index: usize| -> std::result::Result<i32, WorldError> {
                Ok(packet.field_as_int(index)? as u8 as i32 + 1)
            };
            world.apply_chunk_update(
                packet.field_as_int(0)?,
                packet.field_as_int(1)?,
                packet.field_as_int(2)?,
                size(3)?,
                size(4)?,
                size(5)?,
                packet.field_as_bytes(6)?,
            )?;
        }
        ids::MULTI_BLOCK_CHANGE => {
            let (chunk_x, chunk_z) = (packet.field_as_int(0)?, packet.field_as_int(1)?);
            if let Value::BlockChanges(changes) = packet.field(2)? {
                for change in changes {
                    world.apply_block_change(
                        chunk_x.wrapping_mul(16).wrapping_add(change.x as i32),
                        change.y as i32,
                        chunk_z.wrapping_mul(16).wrapping_add(change.z as i32),
                        change.block,
                    );
                }
            }
        }
        ids::BLOCK_CHANGE => {
            world.apply_block_change(
                packet.field_as_int(0)?,
                packet.field_as_int(1)? as u8 as i32,
                packet.field_as_int(2)?,
                packet.field_as_int(3)? as u8,
            );
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::field::BlockChange;
    use crate::protocol::Codec;
    use crate::world::chunk::Surface;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tokio::sync::mpsc;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn map_chunk(codec: &Codec, x: i32, z: i32, blocks: &[u8]) -> Packet {
        // A full 16 x 128 x 16 chunk, block ids first as on the wire.
        codec
            .encode(
                ids::MAP_CHUNK,
                &[
                    Value::Int(x),
                    Value::Short(0),
                    Value::Int(z),
                    Value::Byte(15),
                    Value::Byte(127),
                    Value::Byte(15),
                    Value::Bytes(deflate(blocks)),
                ],
            )
            .unwrap()
    }

    fn flat_terrain(height: usize, block: u8) -> Vec<u8> {
        let mut blocks = vec![0u8; 16 * 16 * 128];
        for column in blocks.chunks_mut(128) {
            column[..height].fill(block);
        }
        blocks
    }

    #[test]
    fn test_map_chunk_fills_world() {
        let codec = Codec::default();
        let mut world = World::new();
        let packet = map_chunk(&codec, 32, -16, &flat_terrain(64, 2));
        apply(&mut world, Direction::ToClient, &packet).unwrap();

        assert_eq!(world.chunk_count(), 1);
        assert_eq!(
            world.surface_at(40, -1),
            Some(Surface {
                height: 63,
                block: 2
            })
        );
        assert_eq!(world.block_at(47, 64, -16), Some(0));
    }

    #[test]
    fn test_block_updates_after_chunk() {
        let codec = Codec::default();
        let mut world = World::new();
        apply(&mut world, Direction::ToClient, &map_chunk(&codec, 0, 0, &flat_terrain(10, 1))).unwrap();

        let change = codec
            .encode(
                ids::BLOCK_CHANGE,
                &[Value::Int(3), Value::Byte(20), Value::Int(4), Value::Byte(17), Value::Byte(0)],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &change).unwrap();
        assert_eq!(world.surface_at(3, 4).map(|s| s.block), Some(17));

        let multi = codec
            .encode(
                ids::MULTI_BLOCK_CHANGE,
                &[
                    Value::Int(0),
                    Value::Int(0),
                    Value::BlockChanges(vec![crate::protocol::field::BlockChange {
                        x: 3,
                        y: 20,
                        z: 4,
                        block: 0,
                        meta: 0,
                    }]),
                ],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &multi).unwrap();
        assert_eq!(world.surface_at(3, 4).map(|s| s.height), Some(9));
    }

    #[test]
    fn test_entity_lifecycle() {
        let codec = Codec::default();
        let mut world = World::new();
        let spawn = codec
            .encode(
                ids::MOB_SPAWN,
                &[
                    Value::Int(12),
                    Value::Byte(91),
                    Value::Int(320),
                    Value::Int(2048),
                    Value::Int(-320),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Metadata(vec![]),
                ],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &spawn).unwrap();

        let step = codec
            .encode(
                ids::ENTITY_RELATIVE_MOVE,
                &[Value::Int(12), Value::Byte(32), Value::Byte(0), Value::Byte(-32)],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &step).unwrap();
        assert_eq!(world.entity(12).unwrap().position(), (11.0, 64.0, -11.0));

        let ride = codec
            .encode(ids::ATTACH_ENTITY, &[Value::Int(12), Value::Int(40)])
            .unwrap();
        apply(&mut world, Direction::ToClient, &ride).unwrap();
        assert_eq!(world.entity(12).unwrap().vehicle, Some(40));

        let destroy = codec.encode(ids::DESTROY_ENTITY, &[Value::Int(12)]).unwrap();
        apply(&mut world, Direction::ToClient, &destroy).unwrap();
        assert!(world.entity(12).is_none());
    }

    #[test]
    fn test_far_coordinates_wrap() {
        let codec = Codec::default();
        let mut world = World::new();
        let painting = codec
            .encode(
                ids::PAINTING,
                &[
                    Value::Int(5),
                    Value::from("Kebab"),
                    Value::Int(100_000_000),
                    Value::Int(70),
                    Value::Int(i32::MIN),
                    Value::Int(0),
                ],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &painting).unwrap();
        let entity = world.entity(5).unwrap();
        assert_eq!(entity.x, 100_000_000i32.wrapping_mul(32));
        assert_eq!(entity.y, 70 * 32);
        assert_eq!(entity.z, 0);

        // Chunk i32::MAX starts at block -16 once wrapped.
        world
            .apply_chunk_update(-13, 0, 0, 1, 1, 1, &deflate(&[1]))
            .unwrap();
        let change = codec
            .encode(
                ids::MULTI_BLOCK_CHANGE,
                &[
                    Value::Int(i32::MAX),
                    Value::Int(0),
                    Value::BlockChanges(vec![BlockChange {
                        x: 3,
                        y: 0,
                        z: 0,
                        block: 7,
                        meta: 0,
                    }]),
                ],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &change).unwrap();
        assert_eq!(world.block_at(-13, 0, 0), Some(7));
    }

    #[test]
    fn test_position_look_field_order_depends_on_direction() {
        let codec = Codec::default();
        let mut world = World::new();
        let args = [
            Value::Double(1.0),
            Value::Double(65.62),
            Value::Double(64.0),
            Value::Double(3.0),
            Value::Float(0.0),
            Value::Float(0.0),
            Value::Byte(1),
        ];
        let packet = codec.encode(ids::PLAYER_POSITION_LOOK, &args).unwrap();

        apply(&mut world, Direction::ToClient, &packet).unwrap();
        assert_eq!(world.player().y, 64.0);

        apply(&mut world, Direction::ToServer, &packet).unwrap();
        assert_eq!(world.player().y, 65.62);
    }

    #[test]
    fn test_login_only_counts_from_server() {
        let codec = Codec::default();
        let mut world = World::new();
        let login = codec
            .encode(
                ids::LOGIN,
                &[Value::Int(14), Value::from("player"), Value::Long(0), Value::Byte(0)],
            )
            .unwrap();
        apply(&mut world, Direction::ToServer, &login).unwrap();
        assert_eq!(world.player().entity_id, None);

        let login = codec
            .encode(
                ids::LOGIN,
                &[Value::Int(1234), Value::from(""), Value::Long(99), Value::Byte(-1)],
            )
            .unwrap();
        apply(&mut world, Direction::ToClient, &login).unwrap();
        assert_eq!(world.player().entity_id, Some(1234));
        assert_eq!(world.player().dimension, -1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_bad_terrain() {
        let codec = Codec::default();
        let world = World::shared();
        let (tx, rx) = mpsc::unbounded_channel();

        let time = codec.encode(ids::TIME_UPDATE, &[Value::Long(18000)]).unwrap();
        let broken = codec
            .encode(
                ids::MAP_CHUNK,
                &[
                    Value::Int(0),
                    Value::Short(0),
                    Value::Int(0),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Bytes(vec![0xDE, 0xAD]),
                ],
            )
            .unwrap();
        for packet in [time, broken] {
            tx.send(DirectedPacket::new(Direction::ToClient, packet)).unwrap();
        }

        let result = run(world.clone(), rx).await;
        assert!(result.is_err());
        assert_eq!(world.read().await.time(), 18000);
    }
}
