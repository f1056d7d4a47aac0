use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use crate::constants::{get_exit_distance_ratio, get_map_parameters, MapParameters};
use crate::rng::RandomSource;
use crate::types::{Difficulty, EnemyKind, Vec2};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("grid {rows}x{cols} has no interior border cell for an exit")]
    GridTooSmall { rows: usize, cols: usize },

    #[error("map has no rows")]
    EmptyMap,

    #[error("map row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("unknown tile symbol {symbol:?} at row {row}, col {col}")]
    UnknownSymbol { row: usize, col: usize, symbol: char },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tile {
    Empty,
    Wall,
    Exit,
    /// Enemy spawn marker left by the generator; walkable.
    Spawn(EnemyKind),
}

impl Tile {
    pub fn symbol(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Wall => '#',
            Tile::Exit => 'E',
            Tile::Spawn(kind) => kind.symbol(),
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Tile::Empty),
            '#' => Some(Tile::Wall),
            'E' => Some(Tile::Exit),
            other => EnemyKind::from_symbol(other).map(Tile::Spawn),
        }
    }
}

/// Read-only view over a tile grid, addressed as `(row, col)`.
pub trait GridQuery {
    fn rows(&self) -> usize;

    fn cols(&self) -> usize;

    /// Tile symbol at `(row, col)`, or `#` when out of bounds.
    fn char_at(&self, row: i32, col: i32) -> char;

    fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows() && (col as usize) < self.cols()
    }

    fn is_walkable(&self, row: i32, col: i32) -> bool {
        self.char_at(row, col) != '#'
    }

    fn is_exit(&self, row: i32, col: i32) -> bool {
        self.char_at(row, col) == 'E'
    }
}

/// Rectangular tile buffer stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, fill: Tile) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![fill; rows * cols],
        }
    }

    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, WorldError> {
        let Some(first) = rows.first() else {
            return Err(WorldError::EmptyMap);
        };
        let cols = first.as_ref().chars().count();
        if cols == 0 {
            return Err(WorldError::EmptyMap);
        }
        let mut tiles = Vec::with_capacity(rows.len() * cols);
        for (row, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let found = line.chars().count();
            if found != cols {
                return Err(WorldError::RaggedRow {
                    row,
                    expected: cols,
                    found,
                });
            }
            for (col, symbol) in line.chars().enumerate() {
                let tile = Tile::from_symbol(symbol)
                    .ok_or(WorldError::UnknownSymbol { row, col, symbol })?;
                tiles.push(tile);
            }
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            tiles,
        })
    }

    fn index(&self, row: i32, col: i32) -> Option<usize> {
        if !self.in_bounds(row, col) {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    pub fn get(&self, row: i32, col: i32) -> Option<Tile> {
        self.index(row, col).map(|idx| self.tiles[idx])
    }

    pub fn set(&mut self, row: i32, col: i32, tile: Tile) -> bool {
        match self.index(row, col) {
            Some(idx) => {
                self.tiles[idx] = tile;
                true
            }
            None => false,
        }
    }

    pub fn is_border(&self, row: i32, col: i32) -> bool {
        self.in_bounds(row, col)
            && (row == 0
                || col == 0
                || row as usize == self.rows - 1
                || col as usize == self.cols - 1)
    }

    pub fn to_rows(&self) -> Vec<String> {
        self.tiles
            .chunks(self.cols.max(1))
            .map(|row| row.iter().map(|tile| tile.symbol()).collect())
            .collect()
    }

    pub fn cells(&self) -> impl Iterator<Item = (Vec2, Tile)> + '_ {
        self.tiles.iter().enumerate().map(|(idx, tile)| {
            let row = (idx / self.cols) as i32;
            let col = (idx % self.cols) as i32;
            (Vec2::at(row, col), *tile)
        })
    }

    pub fn exit_cells(&self) -> Vec<Vec2> {
        self.cells()
            .filter(|(_, tile)| *tile == Tile::Exit)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Removes every spawn marker, returning them in row-major order.
    pub fn take_spawn_markers(&mut self) -> Vec<(Vec2, EnemyKind)> {
        let mut out = Vec::new();
        for idx in 0..self.tiles.len() {
            if let Tile::Spawn(kind) = self.tiles[idx] {
                let row = (idx / self.cols) as i32;
                let col = (idx % self.cols) as i32;
                out.push((Vec2::at(row, col), kind));
                self.tiles[idx] = Tile::Empty;
            }
        }
        out
    }
}

impl GridQuery for Grid {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn char_at(&self, row: i32, col: i32) -> char {
        self.get(row, col).map(Tile::symbol).unwrap_or('#')
    }
}

#[derive(Clone, Debug)]
pub struct GeneratedWorld {
    pub grid: Grid,
    pub params: MapParameters,
    pub start: Vec2,
    pub exit: Vec2,
    /// Interior neighbour of the exit where the safe path ends.
    pub exit_target: Vec2,
    pub safe_path: Vec<Vec2>,
}

pub fn generate_world(
    difficulty: Difficulty,
    level: u32,
    rng: &mut dyn RandomSource,
) -> Result<GeneratedWorld, WorldError> {
    let params = get_map_parameters(difficulty, level);
    let (rows, cols) = (params.rows, params.cols);
    if rows < 3 || cols < 3 {
        return Err(WorldError::GridTooSmall { rows, cols });
    }

    let mut grid = Grid::new(rows, cols, Tile::Empty);
    add_border_walls(&mut grid);

    let start = Vec2::at(
        1 + rng.next_int((rows - 2) as u32) as i32,
        1 + rng.next_int((cols - 2) as u32) as i32,
    );
    let exit = pick_exit_far_from(
        rows,
        cols,
        start,
        get_exit_distance_ratio(difficulty),
        rng,
    )?;
    grid.set(exit.row(), exit.col(), Tile::Exit);

    let exit_target = exit_target_for(rows, cols, exit);
    let safe_path = carve_safe_path(&mut grid, start, exit_target);
    let mut safe = vec![false; rows * cols];
    for cell in &safe_path {
        safe[cell.row() as usize * cols + cell.col() as usize] = true;
    }

    for row in 1..(rows - 1) as i32 {
        for col in 1..(cols - 1) as i32 {
            if safe[row as usize * cols + col as usize] {
                continue;
            }
            if Vec2::at(row, col) == start || Vec2::at(row, col) == exit {
                continue;
            }
            if rng.chance_percent(params.wall_percent) {
                grid.set(row, col, Tile::Wall);
            } else if rng.chance_percent(params.enemy_percent) {
                let kind = EnemyKind::ALL[rng.next_int(3) as usize];
                grid.set(row, col, Tile::Spawn(kind));
            }
        }
    }

    Ok(GeneratedWorld {
        grid,
        params,
        start,
        exit,
        exit_target,
        safe_path,
    })
}

fn add_border_walls(grid: &mut Grid) {
    let (rows, cols) = (grid.rows() as i32, grid.cols() as i32);
    for row in 0..rows {
        grid.set(row, 0, Tile::Wall);
        grid.set(row, cols - 1, Tile::Wall);
    }
    for col in 0..cols {
        grid.set(0, col, Tile::Wall);
        grid.set(rows - 1, col, Tile::Wall);
    }
}

/// Border cells (corners excluded) an exit may occupy, in a stable order.
pub fn exit_candidates(rows: usize, cols: usize) -> Vec<Vec2> {
    let mut out = Vec::new();
    if rows < 3 || cols < 3 {
        return out;
    }
    let (last_row, last_col) = (rows as i32 - 1, cols as i32 - 1);
    for col in 1..last_col {
        out.push(Vec2::at(0, col));
        out.push(Vec2::at(last_row, col));
    }
    for row in 1..last_row {
        out.push(Vec2::at(row, 0));
        out.push(Vec2::at(row, last_col));
    }
    out
}

pub fn pick_exit_far_from(
    rows: usize,
    cols: usize,
    start: Vec2,
    ratio: f64,
    rng: &mut dyn RandomSource,
) -> Result<Vec2, WorldError> {
    let border = exit_candidates(rows, cols);
    let Some(max_distance) = border.iter().map(|cell| manhattan(*cell, start)).max() else {
        return Err(WorldError::GridTooSmall { rows, cols });
    };
    let min_distance = ((max_distance as f64 * ratio) as i32).max(1);

    let mut candidates: Vec<Vec2> = border
        .iter()
        .copied()
        .filter(|cell| manhattan(*cell, start) >= min_distance)
        .collect();
    if candidates.is_empty() {
        candidates = border
            .into_iter()
            .filter(|cell| manhattan(*cell, start) == max_distance)
            .collect();
    }
    Ok(candidates[rng.pick_index(candidates.len())])
}

pub fn exit_target_for(rows: usize, cols: usize, exit: Vec2) -> Vec2 {
    let (last_row, last_col) = (rows as i32 - 1, cols as i32 - 1);
    if exit.row() == 0 {
        Vec2::at(1, exit.col())
    } else if exit.row() == last_row {
        Vec2::at(last_row - 1, exit.col())
    } else if exit.col() == 0 {
        Vec2::at(exit.row(), 1)
    } else if exit.col() == last_col {
        Vec2::at(exit.row(), last_col - 1)
    } else {
        exit
    }
}

/// Walks from `start` to `target`, always along the axis with the larger remaining
/// delta (rows win ties), forcing each visited cell empty.
pub fn carve_safe_path(grid: &mut Grid, start: Vec2, target: Vec2) -> Vec<Vec2> {
    let mut path = Vec::new();
    let mut cursor = start;
    loop {
        path.push(cursor);
        grid.set(cursor.row(), cursor.col(), Tile::Empty);
        if cursor == target {
            break;
        }
        let d_row = target.row() - cursor.row();
        let d_col = target.col() - cursor.col();
        if d_row.abs() >= d_col.abs() {
            cursor.y += d_row.signum();
        } else {
            cursor.x += d_col.signum();
        }
    }
    path
}

pub fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Shortest walkable 4-neighbour path from `from` to `to`, both ends included.
pub fn find_path(grid: &dyn GridQuery, from: Vec2, to: Vec2) -> Option<Vec<Vec2>> {
    if !grid.is_walkable(from.row(), from.col()) || !grid.is_walkable(to.row(), to.col()) {
        return None;
    }
    let mut came_from: HashMap<Vec2, Vec2> = HashMap::new();
    let mut queue = VecDeque::new();
    came_from.insert(from, from);
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        if cell == to {
            let mut path = vec![cell];
            let mut cursor = cell;
            while cursor != from {
                cursor = came_from[&cursor];
                path.push(cursor);
            }
            path.reverse();
            return Some(path);
        }
        for (dx, dy) in [(0, -1), (0, 1), (-1, 0), (1, 0)] {
            let next = Vec2::new(cell.x + dx, cell.y + dy);
            if !grid.is_walkable(next.row(), next.col()) || came_from.contains_key(&next) {
                continue;
            }
            came_from.insert(next, cell);
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MAX_LEVEL;
    use crate::rng::{Rng, ScriptedRng};

    fn border_is_walled_except_one_exit(grid: &Grid) -> bool {
        let mut exits = 0;
        for (pos, tile) in grid.cells() {
            if !grid.is_border(pos.row(), pos.col()) {
                continue;
            }
            match tile {
                Tile::Wall => {}
                Tile::Exit => exits += 1,
                _ => return false,
            }
        }
        exits == 1
    }

    #[test]
    fn border_has_exactly_one_exit_for_all_tiers() {
        for difficulty in Difficulty::ALL {
            for level in 1..=MAX_LEVEL {
                for seed in 0..200u32 {
                    let mut rng = Rng::new(seed);
                    let world = generate_world(difficulty, level, &mut rng).expect("generates");
                    assert!(
                        border_is_walled_except_one_exit(&world.grid),
                        "bad border: {difficulty:?} level={level} seed={seed}"
                    );
                    assert_eq!(world.grid.exit_cells(), vec![world.exit]);
                }
            }
        }
    }

    #[test]
    fn start_and_safe_path_are_walkable_interior_cells() {
        for difficulty in Difficulty::ALL {
            for seed in 0..200u32 {
                let mut rng = Rng::new(seed);
                let world = generate_world(difficulty, 2, &mut rng).expect("generates");
                assert!(!world.grid.is_border(world.start.row(), world.start.col()));
                assert_eq!(world.safe_path.first(), Some(&world.start));
                assert_eq!(world.safe_path.last(), Some(&world.exit_target));
                for cell in &world.safe_path {
                    assert_eq!(world.grid.get(cell.row(), cell.col()), Some(Tile::Empty));
                }
                for pair in world.safe_path.windows(2) {
                    assert_eq!(manhattan(pair[0], pair[1]), 1);
                }
            }
        }
    }

    #[test]
    fn exit_is_reachable_from_start() {
        for seed in 0..200u32 {
            let mut rng = Rng::new(seed);
            let world = generate_world(Difficulty::Hard, 3, &mut rng).expect("generates");
            assert!(
                find_path(&world.grid, world.start, world.exit).is_some(),
                "unreachable exit: seed={seed}"
            );
        }
    }

    #[test]
    fn exit_respects_distance_threshold() {
        for difficulty in Difficulty::ALL {
            for seed in 0..200u32 {
                let mut rng = Rng::new(seed);
                let world = generate_world(difficulty, 1, &mut rng).expect("generates");
                let max_distance = exit_candidates(world.params.rows, world.params.cols)
                    .into_iter()
                    .map(|cell| manhattan(cell, world.start))
                    .max()
                    .expect("candidates");
                let threshold =
                    ((max_distance as f64 * get_exit_distance_ratio(difficulty)) as i32).max(1);
                let distance = manhattan(world.exit, world.start);
                assert!(distance >= threshold || distance == max_distance);
            }
        }
    }

    #[test]
    fn easy_scenario_carves_from_forced_start() {
        // start row = 1 + 1, start col = 1 + 2
        let mut rng = ScriptedRng::new(&[1, 2]);
        let world = generate_world(Difficulty::Easy, 1, &mut rng).expect("generates");
        assert_eq!(world.start, Vec2::at(2, 3));
        assert_eq!((world.params.rows, world.params.cols), (4, 8));

        // farthest border cells from (2,3) are (0,6) and (1,7) at distance 5
        let threshold = ((5.0 * 0.6) as i32).max(1);
        assert!(manhattan(world.exit, world.start) >= threshold);
        assert_eq!(world.safe_path.first(), Some(&Vec2::at(2, 3)));
        assert_eq!(world.safe_path.last(), Some(&world.exit_target));
        for cell in &world.safe_path {
            assert!(world.grid.is_walkable(cell.row(), cell.col()));
        }
    }

    #[test]
    fn carve_prefers_rows_on_ties() {
        let mut grid = Grid::new(6, 6, Tile::Wall);
        let path = carve_safe_path(&mut grid, Vec2::at(1, 1), Vec2::at(3, 3));
        assert_eq!(
            path,
            vec![
                Vec2::at(1, 1),
                Vec2::at(2, 1),
                Vec2::at(2, 2),
                Vec2::at(3, 2),
                Vec2::at(3, 3),
            ]
        );
    }

    #[test]
    fn out_of_bounds_reads_as_wall() {
        let grid = Grid::new(4, 8, Tile::Empty);
        assert_eq!(grid.char_at(-1, 0), '#');
        assert_eq!(grid.char_at(0, 8), '#');
        assert!(!grid.is_walkable(4, 0));
        assert!(grid.is_walkable(3, 7));
    }

    #[test]
    fn exit_candidates_skip_corners() {
        let candidates = exit_candidates(4, 8);
        assert_eq!(candidates.len(), 2 * 6 + 2 * 2);
        assert!(!candidates.contains(&Vec2::at(0, 0)));
        assert!(!candidates.contains(&Vec2::at(3, 7)));
        assert!(exit_candidates(2, 8).is_empty());
    }

    #[test]
    fn rows_round_trip_and_reject_garbage() {
        let rows = vec!["####".to_string(), "#TE#".to_string(), "####".to_string()];
        let grid = Grid::from_rows(&rows).expect("parses");
        assert_eq!(grid.to_rows(), rows);
        assert!(grid.is_exit(1, 2));

        assert_eq!(
            Grid::from_rows(&["###", "#?#"]),
            Err(WorldError::UnknownSymbol {
                row: 1,
                col: 1,
                symbol: '?'
            })
        );
        assert!(matches!(
            Grid::from_rows(&["###", "##"]),
            Err(WorldError::RaggedRow { .. })
        ));
    }

    #[test]
    fn take_spawn_markers_clears_them_in_scan_order() {
        let mut grid = Grid::from_rows(&["#####", "#S.T#", "#F..#", "#####"]).expect("parses");
        let markers = grid.take_spawn_markers();
        assert_eq!(
            markers,
            vec![
                (Vec2::at(1, 1), EnemyKind::Student),
                (Vec2::at(1, 3), EnemyKind::Ta),
                (Vec2::at(2, 1), EnemyKind::Professor),
            ]
        );
        assert!(grid.cells().all(|(_, tile)| !matches!(tile, Tile::Spawn(_))));
    }
}
