use crate::protocol::field::ItemStack;

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    Player { name: String },
    Mob { mob_type: i8 },
    Object { object_type: i8 },
    Pickup { item: ItemStack },
    Painting { title: String },
}

/// An entity seen in the server's traffic. Positions are in the wire's
/// fixed-point units of 1/32 block.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: i32,
    pub kind: EntityKind,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub yaw: i8,
    pub pitch: i8,
    pub vehicle: Option<i32>,
}

impl Entity {
    pub fn new(id: i32, kind: EntityKind, x: i32, y: i32, z: i32) -> Self {
        Self {
            id,
            kind,
            x,
            y,
            z,
            yaw: 0,
            pitch: 0,
            vehicle: None,
        }
    }

    /// Position in blocks.
    pub fn position(&self) -> (f64, f64, f64) {
        (
            self.x as f64 / 32.0,
            self.y as f64 / 32.0,
            self.z as f64 / 32.0,
        )
    }

    pub fn move_by(&mut self, dx: i8, dy: i8, dz: i8) {
        // Fixed-point coordinates wrap like the server's own.
        self.x = self.x.wrapping_add(dx as i32);
        self.y = self.y.wrapping_add(dy as i32);
        self.z = self.z.wrapping_add(dz as i32);
    }
}

/// What the proxy knows about the local player.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub entity_id: Option<i32>,
    pub dimension: i8,
    pub x: f64,
    pub y: f64,
    pub stance: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub health: i16,
    /// Set once any position update has been seen.
    pub positioned: bool,
}

impl PlayerState {
    pub fn set_position(&mut self, x: f64, y: f64, stance: f64, z: f64) {
        self.x = x;
        self.y = y;
        self.stance = stance;
        self.z = z;
        self.positioned = true;
    }

    pub fn set_look(&mut self, yaw: f32, pitch: f32) {
        self.yaw = yaw;
        self.pitch = pitch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_point_position() {
        let mut entity = Entity::new(1, EntityKind::Mob { mob_type: 90 }, 64, -32, 16);
        assert_eq!(entity.position(), (2.0, -1.0, 0.5));
        entity.move_by(-64, 32, 0);
        assert_eq!(entity.position(), (0.0, 0.0, 0.5));
    }

    #[test]
    fn test_move_wraps_at_range_edge() {
        let mut entity = Entity::new(2, EntityKind::Mob { mob_type: 90 }, i32::MAX, i32::MIN, 0);
        entity.move_by(1, -1, 0);
        assert_eq!((entity.x, entity.y, entity.z), (i32::MIN, i32::MAX, 0));
    }
}
