use serde::Serialize;

use crate::constants::{STUDENT_AVOID_RANGE, STUDENT_CHASE_RANGE};
use crate::rng::RandomSource;
use crate::types::{Direction, Enemy, EnemyKind, Player, Vec2};
use crate::world::GridQuery;

use super::utils::{both_axes_step, larger_axis_step, offset, random_direction, random_step};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    InvalidDirection,
    OutOfBounds,
    Blocked,
}

impl MoveOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Moved => "moved",
            Self::InvalidDirection => "Invalid direction! Use W/A/S/D.",
            Self::OutOfBounds => "Cannot move outside map boundaries!",
            Self::Blocked => "Cannot move there! That position is blocked.",
        }
    }
}

/// Parses a direction symbol and moves the player one tile if the target is open.
pub fn move_player(player: &mut Player, input: &str, grid: &dyn GridQuery) -> MoveOutcome {
    match Direction::parse_move(input) {
        Some(dir) => step_player(player, dir, grid),
        None => MoveOutcome::InvalidDirection,
    }
}

pub fn step_player(player: &mut Player, dir: Direction, grid: &dyn GridQuery) -> MoveOutcome {
    let target = offset(player.pos(), dir, 1);
    if !grid.in_bounds(target.row(), target.col()) {
        return MoveOutcome::OutOfBounds;
    }
    if !grid.is_walkable(target.row(), target.col()) {
        return MoveOutcome::Blocked;
    }
    player.x = target.x;
    player.y = target.y;
    MoveOutcome::Moved
}

/// Runs one AI step for every active enemy, in list order.
///
/// A rejected candidate leaves the enemy in place. Occupancy is checked against
/// positions already updated this turn; the player's cell never blocks.
pub fn move_enemies(
    enemies: &mut [Enemy],
    player: &Player,
    grid: &dyn GridQuery,
    rng: &mut dyn RandomSource,
) {
    for idx in 0..enemies.len() {
        if !enemies[idx].active {
            continue;
        }
        let target = choose_enemy_target(&enemies[idx], player, rng);
        if target == enemies[idx].pos() {
            continue;
        }
        if can_enemy_enter(enemies, idx, target, grid) {
            enemies[idx].x = target.x;
            enemies[idx].y = target.y;
        }
    }
}

fn can_enemy_enter(enemies: &[Enemy], idx: usize, target: Vec2, grid: &dyn GridQuery) -> bool {
    if !grid.in_bounds(target.row(), target.col()) || !grid.is_walkable(target.row(), target.col())
    {
        return false;
    }
    !enemies.iter().enumerate().any(|(other_idx, other)| {
        other_idx != idx && other.active && other.x == target.x && other.y == target.y
    })
}

pub fn choose_enemy_target(enemy: &Enemy, player: &Player, rng: &mut dyn RandomSource) -> Vec2 {
    match enemy.kind {
        EnemyKind::Ta => ta_target(enemy, player, rng),
        EnemyKind::Professor => professor_target(enemy, player),
        EnemyKind::Student => student_target(enemy, player, rng),
    }
}

fn deltas(enemy: &Enemy, player: &Player) -> (i32, i32, i32) {
    let dx = player.x - enemy.x;
    let dy = player.y - enemy.y;
    (dx, dy, dx.abs() + dy.abs())
}

fn ta_target(enemy: &Enemy, player: &Player, rng: &mut dyn RandomSource) -> Vec2 {
    let pos = enemy.pos();
    let (dx, dy, distance) = deltas(enemy, player);
    let roll = rng.next_int(100);
    let profile = enemy.profile;
    if distance > profile.detection_range || roll >= profile.chase_probability {
        return random_step(pos, rng);
    }

    match profile.movement_strategy {
        0 => larger_axis_step(pos, dx, dy, 1),
        1 => {
            // Flank: commit to the column first, drift on the row half the time.
            if distance > 2 && dx != 0 {
                let mut target = Vec2::new(pos.x + dx.signum(), pos.y);
                if dy != 0 && rng.next_int(2) == 0 {
                    target.y += dy.signum();
                }
                target
            } else {
                larger_axis_step(pos, dx, dy, 1)
            }
        }
        _ => both_axes_step(pos, dx, dy),
    }
}

fn professor_target(enemy: &Enemy, player: &Player) -> Vec2 {
    let pos = enemy.pos();
    let (dx, dy, distance) = deltas(enemy, player);
    let profile = enemy.profile;
    if distance > profile.detection_range {
        return both_axes_step(pos, dx, dy);
    }

    match profile.movement_strategy {
        0 => larger_axis_step(pos, dx, dy, 1),
        1 if distance > 3 => both_axes_step(pos, dx, dy),
        1 => larger_axis_step(pos, dx, dy, 1),
        _ if distance < 2 => larger_axis_step(pos, dx, dy, -1),
        _ => larger_axis_step(pos, dx, dy, 1),
    }
}

fn student_target(enemy: &Enemy, player: &Player, rng: &mut dyn RandomSource) -> Vec2 {
    let pos = enemy.pos();
    let (dx, dy, distance) = deltas(enemy, player);
    let roll = rng.next_int(100);
    let profile = enemy.profile;
    if distance <= STUDENT_CHASE_RANGE && roll < profile.chase_probability {
        return larger_axis_step(pos, dx, dy, 1);
    }

    match profile.movement_strategy {
        0 => random_step(pos, rng),
        1 => {
            if rng.next_int(100) < profile.distraction_factor {
                // Only the landing cell is checked, so a stride of 2 can clear a wall.
                let dir = random_direction(rng);
                let stride = 1 + rng.next_int(2) as i32;
                offset(pos, dir, stride)
            } else {
                random_step(pos, rng)
            }
        }
        _ if distance < STUDENT_AVOID_RANGE => larger_axis_step(pos, dx, dy, -1),
        _ => random_step(pos, rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRng;
    use crate::types::AiProfile;
    use crate::world::{Grid, Tile};

    fn open_grid(rows: usize, cols: usize) -> Grid {
        let mut grid = Grid::new(rows, cols, Tile::Empty);
        for row in 0..rows as i32 {
            grid.set(row, 0, Tile::Wall);
            grid.set(row, cols as i32 - 1, Tile::Wall);
        }
        for col in 0..cols as i32 {
            grid.set(0, col, Tile::Wall);
            grid.set(rows as i32 - 1, col, Tile::Wall);
        }
        grid
    }

    fn enemy(id: u32, kind: EnemyKind, x: i32, y: i32, profile: AiProfile) -> Enemy {
        Enemy {
            id,
            kind,
            x,
            y,
            active: true,
            profile,
        }
    }

    fn profile(chase: u32, range: i32, strategy: u8, distraction: u32) -> AiProfile {
        AiProfile {
            chase_probability: chase,
            detection_range: range,
            movement_strategy: strategy,
            predictive_tracking: false,
            distraction_factor: distraction,
        }
    }

    #[test]
    fn player_rejects_unknown_direction_without_moving() {
        let grid = open_grid(5, 8);
        let mut player = Player::new(Vec2::new(2, 2));
        for input in ["x", "", "north", "ww"] {
            assert_eq!(
                move_player(&mut player, input, &grid),
                MoveOutcome::InvalidDirection
            );
            assert_eq!(player.pos(), Vec2::new(2, 2));
        }
    }

    #[test]
    fn player_is_blocked_by_walls_and_bounds() {
        let mut grid = open_grid(5, 8);
        grid.set(0, 3, Tile::Exit);
        let mut player = Player::new(Vec2::new(1, 1));
        assert_eq!(move_player(&mut player, "a", &grid), MoveOutcome::Blocked);
        assert_eq!(move_player(&mut player, "D", &grid), MoveOutcome::Moved);
        assert_eq!(player.pos(), Vec2::new(2, 1));

        player.x = 3;
        player.y = 0;
        assert_eq!(move_player(&mut player, "up", &grid), MoveOutcome::OutOfBounds);
        assert_eq!(player.pos(), Vec2::new(3, 0));
    }

    #[test]
    fn ta_chases_when_roll_is_below_chase_probability() {
        let ta = enemy(1, EnemyKind::Ta, 2, 2, profile(85, 5, 0, 0));
        let player = Player::new(Vec2::new(5, 2));

        let mut rng = ScriptedRng::new(&[84]);
        assert_eq!(choose_enemy_target(&ta, &player, &mut rng), Vec2::new(3, 2));

        // 85 fails the chase roll; direction 0 wanders up.
        let mut rng = ScriptedRng::new(&[85, 0]);
        assert_eq!(choose_enemy_target(&ta, &player, &mut rng), Vec2::new(2, 1));
    }

    #[test]
    fn ta_ignores_player_outside_detection_range() {
        let ta = enemy(1, EnemyKind::Ta, 1, 1, profile(85, 2, 0, 0));
        let player = Player::new(Vec2::new(4, 1));
        let mut rng = ScriptedRng::new(&[0, 3]);
        assert_eq!(choose_enemy_target(&ta, &player, &mut rng), Vec2::new(2, 1));
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn ta_flanking_and_diagonal_strategies() {
        let player = Player::new(Vec2::new(6, 5));

        let flank = enemy(1, EnemyKind::Ta, 2, 2, profile(85, 10, 1, 0));
        let mut rng = ScriptedRng::new(&[0, 0]);
        assert_eq!(choose_enemy_target(&flank, &player, &mut rng), Vec2::new(3, 3));
        let mut rng = ScriptedRng::new(&[0, 1]);
        assert_eq!(choose_enemy_target(&flank, &player, &mut rng), Vec2::new(3, 2));

        let diagonal = enemy(2, EnemyKind::Ta, 2, 2, profile(85, 10, 2, 0));
        let mut rng = ScriptedRng::new(&[0]);
        assert_eq!(choose_enemy_target(&diagonal, &player, &mut rng), Vec2::new(3, 3));
    }

    #[test]
    fn ta_flank_in_same_column_steps_row_without_coin() {
        let ta = enemy(1, EnemyKind::Ta, 3, 1, profile(85, 10, 1, 0));
        let player = Player::new(Vec2::new(3, 5));
        let mut rng = ScriptedRng::new(&[0]);
        assert_eq!(choose_enemy_target(&ta, &player, &mut rng), Vec2::new(3, 2));
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn professor_keeps_distance_when_adjacent() {
        let professor = enemy(1, EnemyKind::Professor, 3, 3, profile(95, 6, 2, 0));
        let player = Player::new(Vec2::new(4, 3));
        let mut rng = ScriptedRng::new(&[]);
        assert_eq!(
            choose_enemy_target(&professor, &player, &mut rng),
            Vec2::new(2, 3)
        );

        let far_player = Player::new(Vec2::new(3, 6));
        assert_eq!(
            choose_enemy_target(&professor, &far_player, &mut rng),
            Vec2::new(3, 4)
        );
    }

    #[test]
    fn professor_closes_in_from_outside_detection_range() {
        let professor = enemy(1, EnemyKind::Professor, 1, 1, profile(95, 2, 0, 0));
        let player = Player::new(Vec2::new(8, 5));
        let mut rng = ScriptedRng::new(&[]);
        assert_eq!(
            choose_enemy_target(&professor, &player, &mut rng),
            Vec2::new(2, 2)
        );

        let pressing = enemy(2, EnemyKind::Professor, 1, 1, profile(95, 10, 1, 0));
        assert_eq!(
            choose_enemy_target(&pressing, &player, &mut rng),
            Vec2::new(2, 2)
        );
        let near = Player::new(Vec2::new(3, 2));
        assert_eq!(
            choose_enemy_target(&pressing, &near, &mut rng),
            Vec2::new(2, 1)
        );
    }

    #[test]
    fn distracted_student_takes_big_step() {
        let student = enemy(1, EnemyKind::Student, 5, 5, profile(27, 2, 1, 30));
        let player = Player::new(Vec2::new(12, 9));
        // chase roll, distraction roll 29 < 30, direction right, stride 2
        let mut rng = ScriptedRng::new(&[99, 29, 3, 1]);
        assert_eq!(
            choose_enemy_target(&student, &player, &mut rng),
            Vec2::new(7, 5)
        );

        // 30 is not distracted: plain step down
        let mut rng = ScriptedRng::new(&[99, 30, 1]);
        assert_eq!(
            choose_enemy_target(&student, &player, &mut rng),
            Vec2::new(5, 6)
        );
    }

    #[test]
    fn distracted_student_can_hop_a_single_wall() {
        let mut grid = open_grid(5, 8);
        grid.set(2, 3, Tile::Wall);
        let mut enemies = vec![enemy(1, EnemyKind::Student, 2, 2, profile(0, 2, 1, 30))];
        let player = Player::new(Vec2::new(6, 3));
        // chase roll, distraction roll, direction right, stride 2
        let mut rng = ScriptedRng::new(&[99, 0, 3, 1]);
        move_enemies(&mut enemies, &player, &grid, &mut rng);
        assert_eq!(enemies[0].pos(), Vec2::new(4, 2));
    }

    #[test]
    fn student_chases_only_up_close() {
        let student = enemy(1, EnemyKind::Student, 5, 5, profile(50, 2, 0, 0));
        let near = Player::new(Vec2::new(5, 7));
        let mut rng = ScriptedRng::new(&[10]);
        assert_eq!(choose_enemy_target(&student, &near, &mut rng), Vec2::new(5, 6));

        let far = Player::new(Vec2::new(5, 9));
        let mut rng = ScriptedRng::new(&[10, 2]);
        assert_eq!(choose_enemy_target(&student, &far, &mut rng), Vec2::new(4, 5));
    }

    #[test]
    fn shy_student_backs_away() {
        let student = enemy(1, EnemyKind::Student, 5, 5, profile(0, 2, 2, 0));
        let player = Player::new(Vec2::new(7, 5));
        let mut rng = ScriptedRng::new(&[99]);
        assert_eq!(
            choose_enemy_target(&student, &player, &mut rng),
            Vec2::new(4, 5)
        );
    }

    #[test]
    fn enemies_never_stack_but_may_enter_player_cell() {
        let grid = open_grid(5, 8);
        let player = Player::new(Vec2::new(3, 2));
        let chase = profile(95, 10, 0, 0);
        let mut enemies = vec![
            enemy(1, EnemyKind::Professor, 2, 2, chase),
            enemy(2, EnemyKind::Professor, 1, 2, chase),
        ];
        let mut rng = ScriptedRng::new(&[]);
        move_enemies(&mut enemies, &player, &grid, &mut rng);
        assert_eq!(enemies[0].pos(), Vec2::new(3, 2));
        assert_eq!(enemies[1].pos(), Vec2::new(2, 2));

        // First enemy now sits on the player; the second is blocked by it.
        let mut blocked = vec![
            enemy(1, EnemyKind::Professor, 3, 2, chase),
            enemy(2, EnemyKind::Professor, 2, 2, chase),
        ];
        move_enemies(&mut blocked, &player, &grid, &mut rng);
        assert_eq!(blocked[1].pos(), Vec2::new(2, 2));
    }

    #[test]
    fn inactive_enemies_neither_move_nor_block() {
        let grid = open_grid(5, 8);
        let player = Player::new(Vec2::new(4, 2));
        let chase = profile(95, 10, 0, 0);
        let mut enemies = vec![
            Enemy {
                active: false,
                ..enemy(1, EnemyKind::Professor, 3, 2, chase)
            },
            enemy(2, EnemyKind::Professor, 2, 2, chase),
        ];
        let mut rng = ScriptedRng::new(&[]);
        move_enemies(&mut enemies, &player, &grid, &mut rng);
        assert_eq!(enemies[0].pos(), Vec2::new(3, 2));
        assert_eq!(enemies[1].pos(), Vec2::new(3, 2));
    }

    #[test]
    fn enemies_do_not_walk_into_walls() {
        let grid = open_grid(5, 8);
        let player = Player::new(Vec2::new(1, 3));
        let mut enemies = vec![enemy(1, EnemyKind::Professor, 1, 1, profile(95, 10, 2, 0))];
        // Adjacent on the y axis: backing away would hit the top wall.
        let near = Player::new(Vec2::new(1, 2));
        let mut rng = ScriptedRng::new(&[]);
        move_enemies(&mut enemies, &near, &grid, &mut rng);
        assert_eq!(enemies[0].pos(), Vec2::new(1, 1));

        move_enemies(&mut enemies, &player, &grid, &mut rng);
        assert_eq!(enemies[0].pos(), Vec2::new(1, 2));
    }
}
