use crate::types::{Difficulty, DifficultySettings, EnemyKind};

pub const MAX_LEVEL: u32 = 3;

pub const SAVE_FILE_NAME: &str = "hku_gpa_escape_save.txt";
pub const TA_QUESTIONS_FILE: &str = "questions_ta.txt";
pub const PROFESSOR_QUESTIONS_FILE: &str = "questions_prof.txt";
pub const STUDENT_QUESTIONS_FILE: &str = "questions_student.txt";

/// Manhattan radius within which a student considers chasing.
pub const STUDENT_CHASE_RANGE: i32 = 3;
/// Students closer than this may back away (movement strategy 2).
pub const STUDENT_AVOID_RANGE: i32 = 4;
pub const STUDENT_DETECTION_RANGE: i32 = 2;

/// Roster placement keeps enemies at least this far from the player.
pub const SPAWN_MIN_PLAYER_DISTANCE: i32 = 3;
pub const SPAWN_RANDOM_ATTEMPTS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapParameters {
    pub rows: usize,
    pub cols: usize,
    pub wall_percent: u32,
    pub enemy_percent: u32,
}

pub fn get_map_parameters(difficulty: Difficulty, level: u32) -> MapParameters {
    let step = level.clamp(1, MAX_LEVEL) - 1;
    match difficulty {
        Difficulty::Easy => MapParameters {
            rows: 4,
            cols: 8,
            wall_percent: 4 + step,
            enemy_percent: 25 + step * 4,
        },
        Difficulty::Normal => MapParameters {
            rows: 8,
            cols: 15,
            wall_percent: 8 + step,
            enemy_percent: 22 + step * 4,
        },
        Difficulty::Hard => MapParameters {
            rows: 10,
            cols: 20,
            wall_percent: 10 + step,
            enemy_percent: 25 + step * 5,
        },
    }
}

/// Fraction of the farthest border distance the exit must reach.
pub fn get_exit_distance_ratio(difficulty: Difficulty) -> f64 {
    match difficulty {
        Difficulty::Easy => 0.6,
        Difficulty::Normal => 0.7,
        Difficulty::Hard => 0.8,
    }
}

pub fn get_difficulty_settings(difficulty: Difficulty) -> DifficultySettings {
    let (initial_gpa, ta, professor, student) = match difficulty {
        Difficulty::Easy => (4.0, 0.8, 1.0, 0.5),
        Difficulty::Normal => (3.5, 1.0, 1.5, 0.8),
        Difficulty::Hard => (3.0, 1.2, 2.0, 1.0),
    };
    DifficultySettings {
        difficulty,
        initial_gpa,
        ta_multiplier: ta,
        professor_multiplier: professor,
        student_multiplier: student,
    }
}

pub fn get_level_bonus(kind: EnemyKind, difficulty: Difficulty) -> u32 {
    match (kind, difficulty) {
        (EnemyKind::Ta, Difficulty::Easy) => 5,
        (EnemyKind::Ta, Difficulty::Normal) => 15,
        (EnemyKind::Ta, Difficulty::Hard) => 25,
        (EnemyKind::Professor, Difficulty::Easy) => 10,
        (EnemyKind::Professor, Difficulty::Normal) => 20,
        (EnemyKind::Professor, Difficulty::Hard) => 30,
        (EnemyKind::Student, _) => 0,
    }
}

pub fn get_chase_cap(kind: EnemyKind) -> u32 {
    match kind {
        EnemyKind::Ta => 85,
        EnemyKind::Professor => 95,
        EnemyKind::Student => 50,
    }
}

/// Enemy counts used by the roster spawn plan when none are given explicitly.
pub fn get_default_roster(difficulty: Difficulty) -> (usize, usize, usize) {
    match difficulty {
        Difficulty::Easy => (1, 1, 1),
        Difficulty::Normal => (2, 1, 2),
        Difficulty::Hard => (3, 2, 3),
    }
}
