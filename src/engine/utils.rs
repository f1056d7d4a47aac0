use std::time::{SystemTime, UNIX_EPOCH};

use crate::rng::RandomSource;
use crate::types::{Direction, Vec2};

pub(crate) fn now_ms() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    now as u64
}

pub(crate) fn offset(pos: Vec2, dir: Direction, distance: i32) -> Vec2 {
    let (dx, dy) = dir.delta();
    Vec2::new(pos.x + dx * distance, pos.y + dy * distance)
}

pub(crate) fn random_direction(rng: &mut dyn RandomSource) -> Direction {
    match rng.next_int(4) {
        0 => Direction::Up,
        1 => Direction::Down,
        2 => Direction::Left,
        _ => Direction::Right,
    }
}

pub(crate) fn random_step(pos: Vec2, rng: &mut dyn RandomSource) -> Vec2 {
    offset(pos, random_direction(rng), 1)
}

/// One step along the axis with the larger delta; `y` wins ties. `sign` is 1 to
/// approach the target and -1 to back away from it.
pub(crate) fn larger_axis_step(pos: Vec2, dx: i32, dy: i32, sign: i32) -> Vec2 {
    if dx.abs() > dy.abs() {
        Vec2::new(pos.x + dx.signum() * sign, pos.y)
    } else {
        Vec2::new(pos.x, pos.y + dy.signum() * sign)
    }
}

/// Steps both axes toward the target wherever the delta is nonzero.
pub(crate) fn both_axes_step(pos: Vec2, dx: i32, dy: i32) -> Vec2 {
    Vec2::new(pos.x + dx.signum(), pos.y + dy.signum())
}
