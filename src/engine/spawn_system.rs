use super::*;

/// AI tuning for the `index`-th enemy of `kind` on stage `level`.
pub fn build_profile(
    kind: EnemyKind,
    difficulty: Difficulty,
    level: u32,
    index: usize,
) -> AiProfile {
    let tier = difficulty.tier() as u32;
    let stage = level.clamp(1, MAX_LEVEL);
    let later_stage = u32::from(stage > 1);
    let bonus = get_level_bonus(kind, difficulty);
    let cap = get_chase_cap(kind);
    let i = index as u32;

    match kind {
        EnemyKind::Ta => AiProfile {
            chase_probability: (60 + bonus + 3 * stage + 2 * (i % 3)).min(cap),
            detection_range: (3 + tier + later_stage) as i32,
            movement_strategy: ((tier + stage + i) % 3) as u8,
            predictive_tracking: false,
            distraction_factor: 0,
        },
        EnemyKind::Professor => AiProfile {
            chase_probability: (75 + bonus + 5 * stage + if i == 0 { 5 } else { 0 }).min(cap),
            detection_range: (4 + 2 * tier + later_stage) as i32,
            movement_strategy: ((2 * tier + stage + i) % 3) as u8,
            predictive_tracking: tier > 1 && stage > 1,
            distraction_factor: 0,
        },
        EnemyKind::Student => AiProfile {
            chase_probability: (20 + 5 * tier + 2 * stage + 10 * (i % 2)).min(cap),
            detection_range: STUDENT_DETECTION_RANGE,
            movement_strategy: ((tier + 2 * stage + i) % 3) as u8,
            predictive_tracking: false,
            distraction_factor: (30 - 3 * stage as i32 + 2 * tier as i32).clamp(0, 100) as u32,
        },
    }
}

impl GameEngine {
    pub(super) fn spawn_level_enemies(&mut self, markers: Vec<(Vec2, EnemyKind)>) {
        self.enemies.clear();
        match self.options.spawn_plan {
            SpawnPlan::Markers => {
                for (pos, kind) in markers {
                    self.push_enemy(kind, pos);
                }
            }
            SpawnPlan::Roster {
                ta,
                professor,
                student,
            } => {
                let roster = [
                    (EnemyKind::Ta, ta),
                    (EnemyKind::Professor, professor),
                    (EnemyKind::Student, student),
                ];
                for (kind, count) in roster {
                    for _ in 0..count {
                        let Some(pos) = self.pick_enemy_spawn_position() else {
                            break;
                        };
                        self.push_enemy(kind, pos);
                    }
                }
            }
        }
    }

    fn push_enemy(&mut self, kind: EnemyKind, pos: Vec2) {
        let index = self.enemies.iter().filter(|enemy| enemy.kind == kind).count();
        let id = self.enemies.len() as u32 + 1;
        self.enemies.push(Enemy {
            id,
            kind,
            x: pos.x,
            y: pos.y,
            active: true,
            profile: build_profile(kind, self.settings.difficulty, self.level, index),
        });
    }

    pub(super) fn is_cell_occupied_by_other_enemy(
        &self,
        x: i32,
        y: i32,
        exclude_enemy_idx: Option<usize>,
    ) -> bool {
        self.enemies.iter().enumerate().any(|(idx, enemy)| {
            Some(idx) != exclude_enemy_idx && enemy.active && enemy.x == x && enemy.y == y
        })
    }

    fn is_spawnable(&self, pos: Vec2) -> bool {
        self.grid.get(pos.row(), pos.col()) == Some(Tile::Empty)
            && !self.is_cell_occupied_by_other_enemy(pos.x, pos.y, None)
            && manhattan(pos, self.player.pos()) >= SPAWN_MIN_PLAYER_DISTANCE
    }

    fn pick_enemy_spawn_position(&mut self) -> Option<Vec2> {
        let rows = self.grid.rows();
        let cols = self.grid.cols();
        if rows < 3 || cols < 3 {
            return None;
        }

        for _ in 0..SPAWN_RANDOM_ATTEMPTS {
            let pos = Vec2::at(
                1 + self.rng.next_int((rows - 2) as u32) as i32,
                1 + self.rng.next_int((cols - 2) as u32) as i32,
            );
            if self.is_spawnable(pos) {
                return Some(pos);
            }
        }

        self.grid
            .cells()
            .map(|(pos, _)| pos)
            .find(|pos| self.is_spawnable(*pos))
    }
}
