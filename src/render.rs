use crate::types::{Difficulty, Enemy, Player};
use crate::world::GridQuery;

pub const PLAYER_SYMBOL: char = 'P';

/// Board as text rows: the player, then active enemies, then the tile beneath.
pub fn render_rows(grid: &dyn GridQuery, player: &Player, enemies: &[Enemy]) -> Vec<String> {
    (0..grid.rows() as i32)
        .map(|row| {
            (0..grid.cols() as i32)
                .map(|col| symbol_at(grid, player, enemies, row, col))
                .collect()
        })
        .collect()
}

fn symbol_at(grid: &dyn GridQuery, player: &Player, enemies: &[Enemy], row: i32, col: i32) -> char {
    if player.y == row && player.x == col {
        return PLAYER_SYMBOL;
    }
    enemies
        .iter()
        .find(|enemy| enemy.active && enemy.y == row && enemy.x == col)
        .map(|enemy| enemy.kind.symbol())
        .unwrap_or_else(|| grid.char_at(row, col))
}

pub fn hud_line(level: u32, max_level: u32, gpa: f64, difficulty: Difficulty) -> String {
    format!(
        "Level {level}/{max_level} | GPA {gpa:.2} | Difficulty {}",
        difficulty.save_name()
    )
}
