use crate::protocol::ids::*;

/// Whether packets of type `kind` feed the world model.
pub fn is_observed(kind: u8, track_terrain: bool) -> bool {
    match kind {
        LOGIN | TIME_UPDATE | UPDATE_HEALTH => true,
        PLAYER_POSITION | PLAYER_LOOK | PLAYER_POSITION_LOOK => true,
        NAMED_ENTITY_SPAWN | PICKUP_SPAWN | ADD_OBJECT | MOB_SPAWN | PAINTING => true,
        DESTROY_ENTITY | ENTITY_RELATIVE_MOVE | ENTITY_LOOK | ENTITY_LOOK_MOVE
        | ENTITY_TELEPORT | ATTACH_ENTITY => true,
        MAP_CHUNK | MULTI_BLOCK_CHANGE | BLOCK_CHANGE => track_terrain,
        _ => false,
    }
}
