//! Value objects - Immutable objects defined by their attributes

mod attributes;
mod coordinates;
mod dice;
mod entity_ref;
mod game_time;

pub use attributes::{Attribute, AttributeBag, AttributeRule, AttributeShape};
pub use coordinates::Coordinates;
pub use dice::{
    pick_weighted, DiceFormula, DiceParseError, DiceRollResult, Keep, MAX_DICE, MAX_DIE_SIZE,
};
pub use entity_ref::{remove_status, upsert_status, EntityKind, EntityRef, Status};
pub use game_time::{
    GameTime, GameTimeBreakdown, TimeAdvance, SECONDS_PER_DAY, SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE, SECONDS_PER_ROUND,
};
