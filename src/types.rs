use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Accepts `w/a/s/d` or the direction words, case-insensitively.
    pub fn parse_move(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "w" | "up" => Some(Self::Up),
            "s" | "down" => Some(Self::Down),
            "a" | "left" => Some(Self::Left),
            "d" | "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Ta,
    Professor,
    Student,
}

impl EnemyKind {
    pub const ALL: [EnemyKind; 3] = [Self::Ta, Self::Professor, Self::Student];

    pub fn symbol(self) -> char {
        match self {
            Self::Ta => 'T',
            Self::Professor => 'F',
            Self::Student => 'S',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'T' => Some(Self::Ta),
            'F' => Some(Self::Professor),
            'S' => Some(Self::Student),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ta => "TA",
            Self::Professor => "Professor",
            Self::Student => "Student",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Easy, Self::Normal, Self::Hard];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" | "1" => Some(Self::Easy),
            "normal" | "2" => Some(Self::Normal),
            "hard" | "3" => Some(Self::Hard),
            _ => None,
        }
    }

    /// Numeric tier used by the map table and the AI formulas.
    pub fn tier(self) -> i32 {
        match self {
            Self::Easy => 1,
            Self::Normal => 2,
            Self::Hard => 3,
        }
    }

    pub fn save_name(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Normal => "NORMAL",
            Self::Hard => "HARD",
        }
    }

    pub fn from_save_name(value: &str) -> Option<Self> {
        match value {
            "EASY" => Some(Self::Easy),
            "NORMAL" => Some(Self::Normal),
            "HARD" => Some(Self::Hard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DifficultySettings {
    pub difficulty: Difficulty,
    #[serde(rename = "initialGpa")]
    pub initial_gpa: f64,
    #[serde(rename = "taMultiplier")]
    pub ta_multiplier: f64,
    #[serde(rename = "professorMultiplier")]
    pub professor_multiplier: f64,
    #[serde(rename = "studentMultiplier")]
    pub student_multiplier: f64,
}

impl DifficultySettings {
    pub fn multiplier(&self, kind: EnemyKind) -> f64 {
        match kind {
            EnemyKind::Ta => self.ta_multiplier,
            EnemyKind::Professor => self.professor_multiplier,
            EnemyKind::Student => self.student_multiplier,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell at grid `(row, col)`.
    pub fn at(row: i32, col: i32) -> Self {
        Self { x: col, y: row }
    }

    pub fn row(self) -> i32 {
        self.y
    }

    pub fn col(self) -> i32 {
        self.x
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    MainMenu,
    Playing,
    LevelComplete,
    GameOver,
    Victory,
}

/// Per-enemy AI tuning. Fields a kind does not use stay zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AiProfile {
    #[serde(rename = "chaseProbability")]
    pub chase_probability: u32,
    #[serde(rename = "detectionRange")]
    pub detection_range: i32,
    /// Selector in `0..=2`; its meaning depends on the enemy kind.
    #[serde(rename = "movementStrategy")]
    pub movement_strategy: u8,
    #[serde(rename = "predictiveTracking")]
    pub predictive_tracking: bool,
    #[serde(rename = "distractionFactor")]
    pub distraction_factor: u32,
}

pub const PLAYER_ID: u32 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            id: PLAYER_ID,
            x: pos.x,
            y: pos.y,
        }
    }

    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: i32,
    pub y: i32,
    pub active: bool,
    pub profile: AiProfile,
}

impl Enemy {
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterPhase {
    TurnStart,
    AfterPlayerMove,
    AfterEnemyMove,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QuizOutcome {
    Correct,
    Wrong { penalty: f64 },
    NoQuestion,
}

impl QuizOutcome {
    pub fn penalty(self) -> f64 {
        match self {
            Self::Wrong { penalty } => penalty.max(0.0),
            Self::Correct | Self::NoQuestion => 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    LevelStarted {
        level: u32,
        rows: usize,
        cols: usize,
        enemies: usize,
    },
    EncounterResolved {
        #[serde(rename = "enemyId")]
        enemy_id: u32,
        kind: EnemyKind,
        phase: EncounterPhase,
        outcome: QuizOutcome,
        #[serde(rename = "gpaAfter")]
        gpa_after: f64,
    },
    EnemyDeactivated {
        #[serde(rename = "enemyId")]
        enemy_id: u32,
    },
    LevelCompleted {
        level: u32,
        turns: u64,
    },
    GameOver {
        level: u32,
    },
    Victory {
        gpa: f64,
    },
    SessionRestored {
        level: u32,
        gpa: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EnemySnapshot {
    pub id: u32,
    pub kind: EnemyKind,
    pub x: i32,
    pub y: i32,
    pub active: bool,
}

/// Everything needed to resume a session. AI profiles are not stored; they are
/// rebuilt from kind, order, difficulty and level.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub level: u32,
    pub gpa: f64,
    pub difficulty: Difficulty,
    pub player: Vec2,
    #[serde(rename = "gridRows")]
    pub grid_rows: Vec<String>,
    pub enemies: Vec<EnemySnapshot>,
    /// RFC 3339 stamp, present only on snapshots read back from disk.
    #[serde(rename = "savedAt", skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,
}
