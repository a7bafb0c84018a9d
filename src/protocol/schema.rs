use crate::protocol::field::FieldKind;
use crate::protocol::field::FieldKind::*;

/// Framing description of one packet type.
#[derive(Debug, PartialEq, Eq)]
pub struct PacketSpec {
    pub id: u8,
    pub name: &'static str,
    pub fields: &'static [FieldKind],
}

pub mod ids {
    pub const KEEP_ALIVE: u8 = 0x00;
    pub const LOGIN: u8 = 0x01;
    pub const HANDSHAKE: u8 = 0x02;
    pub const CHAT: u8 = 0x03;
    pub const TIME_UPDATE: u8 = 0x04;
    pub const UPDATE_HEALTH: u8 = 0x08;
    pub const PLAYER_POSITION: u8 = 0x0B;
    pub const PLAYER_LOOK: u8 = 0x0C;
    pub const PLAYER_POSITION_LOOK: u8 = 0x0D;
    pub const NAMED_ENTITY_SPAWN: u8 = 0x14;
    pub const PICKUP_SPAWN: u8 = 0x15;
    pub const ADD_OBJECT: u8 = 0x17;
    pub const MOB_SPAWN: u8 = 0x18;
    pub const PAINTING: u8 = 0x19;
    pub const DESTROY_ENTITY: u8 = 0x1D;
    pub const ENTITY_RELATIVE_MOVE: u8 = 0x1F;
    pub const ENTITY_LOOK: u8 = 0x20;
    pub const ENTITY_LOOK_MOVE: u8 = 0x21;
    pub const ENTITY_TELEPORT: u8 = 0x22;
    pub const ATTACH_ENTITY: u8 = 0x27;
    pub const PRE_CHUNK: u8 = 0x32;
    pub const MAP_CHUNK: u8 = 0x33;
    pub const MULTI_BLOCK_CHANGE: u8 = 0x34;
    pub const BLOCK_CHANGE: u8 = 0x35;
    pub const DISCONNECT: u8 = 0xFF;
}

macro_rules! packets {
    ($($id:literal $name:literal [$($field:ident),*]),* $(,)?) => {
        &[$(PacketSpec { id: $id, name: $name, fields: &[$($field),*] }),*]
    };
}

static BETA_PACKETS: &[PacketSpec] = packets![
    0x00 "keep_alive" [],
    0x01 "login" [Int, Str16, Long, Byte],
    0x02 "handshake" [Str16],
    0x03 "chat" [Str16],
    0x04 "time_update" [Long],
    0x05 "entity_equipment" [Int, Short, Short, Short],
    0x06 "spawn_position" [Int, Int, Int],
    0x07 "use_entity" [Int, Int, Byte],
    0x08 "update_health" [Short],
    0x09 "respawn" [Byte],
    0x0A "player" [Byte],
    0x0B "player_position" [Double, Double, Double, Double, Byte],
    0x0C "player_look" [Float, Float, Byte],
    0x0D "player_position_look" [Double, Double, Double, Double, Float, Float, Byte],
    0x0E "player_digging" [Byte, Int, Byte, Int, Byte],
    0x0F "block_placement" [Int, Byte, Int, Byte, Slot],
    0x10 "held_item_change" [Short],
    0x11 "use_bed" [Int, Byte, Int, Byte, Int],
    0x12 "animation" [Int, Byte],
    0x13 "entity_action" [Int, Byte],
    0x14 "named_entity_spawn" [Int, Str16, Int, Int, Int, Byte, Byte, Short],
    0x15 "pickup_spawn" [Int, Short, Byte, Short, Int, Int, Int, Byte, Byte, Byte],
    0x16 "collect_item" [Int, Int],
    0x17 "add_object" [Int, Byte, Int, Int, Int, ObjectData],
    0x18 "mob_spawn" [Int, Byte, Int, Int, Int, Byte, Byte, Metadata],
    0x19 "painting" [Int, Str16, Int, Int, Int, Int],
    0x1B "stance_update" [Float, Float, Float, Float, Byte, Byte],
    0x1C "entity_velocity" [Int, Short, Short, Short],
    0x1D "destroy_entity" [Int],
    0x1E "entity" [Int],
    0x1F "entity_relative_move" [Int, Byte, Byte, Byte],
    0x20 "entity_look" [Int, Byte, Byte],
    0x21 "entity_look_move" [Int, Byte, Byte, Byte, Byte, Byte],
    0x22 "entity_teleport" [Int, Int, Int, Int, Byte, Byte],
    0x26 "entity_status" [Int, Byte],
    0x27 "attach_entity" [Int, Int],
    0x28 "entity_metadata" [Int, Metadata],
    0x32 "pre_chunk" [Int, Int, Byte],
    0x33 "map_chunk" [Int, Short, Int, Byte, Byte, Byte, ByteArray],
    0x34 "multi_block_change" [Int, Int, BlockChanges],
    0x35 "block_change" [Int, Byte, Int, Byte, Byte],
    0x36 "block_action" [Int, Short, Int, Byte, Byte],
    0x3C "explosion" [Double, Double, Double, Float, Records],
    0x3D "sound_effect" [Int, Int, Byte, Int, Int],
    0x46 "new_state" [Byte, Byte],
    0x47 "thunderbolt" [Int, Byte, Int, Int, Int],
    0x64 "open_window" [Byte, Byte, Str8, Byte],
    0x65 "close_window" [Byte],
    0x66 "window_click" [Byte, Short, Byte, Short, Byte, Slot],
    0x67 "set_slot" [Byte, Short, Slot],
    0x68 "window_items" [Byte, Items],
    0x69 "update_progress_bar" [Byte, Short, Short],
    0x6A "transaction" [Byte, Short, Byte],
    0x82 "update_sign" [Int, Short, Int, Str16, Str16, Str16, Str16],
    0x83 "map_data" [Short, Short, ShortBytes],
    0xC8 "increment_statistic" [Int, Byte],
    0xFF "disconnect" [Str16],
];

/// Packet type table indexed by the leading type byte. Read-only once built.
pub struct Schema {
    entries: [Option<&'static PacketSpec>; 256],
}

impl Schema {
    pub fn from_specs(specs: &'static [PacketSpec]) -> Self {
        let mut entries = [None; 256];
        for spec in specs {
            entries[spec.id as usize] = Some(spec);
        }
        Self { entries }
    }

    /// The Beta (protocol 14) packet set.
    pub fn beta() -> Self {
        Self::from_specs(BETA_PACKETS)
    }

    pub fn get(&self, kind: u8) -> Option<&'static PacketSpec> {
        self.entries[kind as usize]
    }

    pub fn is_known(&self, kind: u8) -> bool {
        self.entries[kind as usize].is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beta_schema_lookup() {
        let schema = Schema::beta();
        assert_eq!(schema.len(), BETA_PACKETS.len());
        assert!(schema.len() > 50);

        let chunk = schema.get(ids::MAP_CHUNK).unwrap();
        assert_eq!(chunk.name, "map_chunk");
        assert_eq!(chunk.fields.last(), Some(&ByteArray));

        assert!(schema.is_known(ids::KEEP_ALIVE));
        assert!(!schema.is_known(0x1A));
        assert!(schema.get(0xFE).is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut seen = [false; 256];
        for spec in BETA_PACKETS {
            assert!(!seen[spec.id as usize], "duplicate id 0x{:02x}", spec.id);
            seen[spec.id as usize] = true;
        }
    }
}
