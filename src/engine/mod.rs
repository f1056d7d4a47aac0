use serde::Serialize;

use crate::constants::{
    get_chase_cap, get_default_roster, get_difficulty_settings, get_level_bonus, MAX_LEVEL,
    SPAWN_MIN_PLAYER_DISTANCE, SPAWN_RANDOM_ATTEMPTS, STUDENT_DETECTION_RANGE,
};
use crate::quiz::Quiz;
use crate::rng::{RandomSource, Rng};
use crate::types::{
    AiProfile, Difficulty, DifficultySettings, EncounterPhase, Enemy, EnemyKind, EnemySnapshot,
    GameState, Player, QuizOutcome, RuntimeEvent, SessionSnapshot, Vec2,
};
use crate::world::{generate_world, manhattan, Grid, GridQuery, Tile, WorldError};

mod encounter;
mod movement;
mod spawn_system;
mod utils;

pub use self::encounter::check_collision;
pub use self::movement::{choose_enemy_target, move_enemies, move_player, MoveOutcome};
pub use self::spawn_system::build_profile;

pub(crate) use self::utils::now_ms;

/// How a level's enemies are created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpawnPlan {
    /// One enemy per spawn marker left by the generator.
    #[default]
    Markers,
    /// Fixed counts placed on random free cells away from the player.
    Roster {
        ta: usize,
        professor: usize,
        student: usize,
    },
}

impl SpawnPlan {
    pub fn default_roster(difficulty: Difficulty) -> Self {
        let (ta, professor, student) = get_default_roster(difficulty);
        Self::Roster {
            ta,
            professor,
            student,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GameEngineOptions {
    pub spawn_plan: SpawnPlan,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EncounterReport {
    #[serde(rename = "enemyId")]
    pub enemy_id: u32,
    pub kind: EnemyKind,
    pub phase: EncounterPhase,
    pub outcome: QuizOutcome,
    #[serde(rename = "gpaAfter")]
    pub gpa_after: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "outcome", rename_all = "snake_case")]
pub enum TurnAction {
    /// The session was not in `Playing`, or ended before the player acted.
    Skipped,
    SaveRequested,
    Move(MoveOutcome),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReport {
    pub action: TurnAction,
    pub encounters: Vec<EncounterReport>,
    pub state: GameState,
}

pub struct GameEngine {
    pub started_at_ms: u64,
    pub settings: DifficultySettings,
    pub grid: Grid,

    rng: Box<dyn RandomSource>,
    options: GameEngineOptions,
    level: u32,
    gpa: f64,
    state: GameState,
    player: Player,
    enemies: Vec<Enemy>,
    events: Vec<RuntimeEvent>,
    turn_counter: u64,
    total_turns: u64,
}

impl GameEngine {
    pub fn new(
        difficulty: Difficulty,
        seed: u32,
        options: GameEngineOptions,
    ) -> Result<Self, WorldError> {
        Self::with_rng(difficulty, Box::new(Rng::new(seed)), options)
    }

    /// Starts a fresh session on level 1 drawing every random number from `rng`.
    pub fn with_rng(
        difficulty: Difficulty,
        rng: Box<dyn RandomSource>,
        options: GameEngineOptions,
    ) -> Result<Self, WorldError> {
        let settings = get_difficulty_settings(difficulty);
        let mut engine = Self::empty(settings, rng, options);
        engine.gpa = settings.initial_gpa;
        engine.load_level(1)?;
        Ok(engine)
    }

    /// Rebuilds a session from a saved snapshot. Enemy profiles are recomputed.
    pub fn restore(
        snapshot: &SessionSnapshot,
        rng: Box<dyn RandomSource>,
        options: GameEngineOptions,
    ) -> Result<Self, WorldError> {
        let settings = get_difficulty_settings(snapshot.difficulty);
        let mut engine = Self::empty(settings, rng, options);
        engine.grid = Grid::from_rows(&snapshot.grid_rows)?;
        engine.grid.take_spawn_markers();
        engine.level = snapshot.level.clamp(1, MAX_LEVEL);
        engine.gpa = snapshot.gpa.max(0.0);
        engine.player = Player::new(snapshot.player);

        for saved in &snapshot.enemies {
            let index = engine
                .enemies
                .iter()
                .filter(|enemy| enemy.kind == saved.kind)
                .count();
            engine.enemies.push(Enemy {
                id: saved.id,
                kind: saved.kind,
                x: saved.x,
                y: saved.y,
                active: saved.active,
                profile: build_profile(saved.kind, snapshot.difficulty, engine.level, index),
            });
        }

        engine.state = if engine.gpa <= 0.0 {
            GameState::GameOver
        } else {
            GameState::Playing
        };
        engine.events.push(RuntimeEvent::SessionRestored {
            level: engine.level,
            gpa: engine.gpa,
        });
        Ok(engine)
    }

    fn empty(
        settings: DifficultySettings,
        rng: Box<dyn RandomSource>,
        options: GameEngineOptions,
    ) -> Self {
        Self {
            started_at_ms: now_ms(),
            settings,
            grid: Grid::new(0, 0, Tile::Empty),
            rng,
            options,
            level: 1,
            gpa: 0.0,
            state: GameState::Playing,
            player: Player::new(Vec2::new(0, 0)),
            enemies: Vec::new(),
            events: Vec::new(),
            turn_counter: 0,
            total_turns: 0,
        }
    }

    fn load_level(&mut self, level: u32) -> Result<(), WorldError> {
        let world = generate_world(self.settings.difficulty, level, self.rng.as_mut())?;
        let mut grid = world.grid;
        let markers = grid.take_spawn_markers();
        self.grid = grid;
        self.level = level;
        self.player = Player::new(world.start);
        self.turn_counter = 0;
        self.spawn_level_enemies(markers);
        self.state = GameState::Playing;
        self.events.push(RuntimeEvent::LevelStarted {
            level,
            rows: self.grid.rows(),
            cols: self.grid.cols(),
            enemies: self.enemies.len(),
        });
        Ok(())
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn gpa(&self) -> f64 {
        self.gpa
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn difficulty(&self) -> Difficulty {
        self.settings.difficulty
    }

    /// Accepted moves across the whole session.
    pub fn turns(&self) -> u64 {
        self.total_turns
    }

    pub fn rng(&mut self) -> &mut dyn RandomSource {
        self.rng.as_mut()
    }

    /// Ends the session and hands back its random source for the next one.
    pub fn into_rng(self) -> Box<dyn RandomSource> {
        self.rng
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Resolves an enemy already sitting on the player before any input is read.
    pub fn start_turn(&mut self, quiz: &mut dyn Quiz) -> Option<EncounterReport> {
        if self.state != GameState::Playing {
            return None;
        }
        self.resolve_encounter(EncounterPhase::TurnStart, quiz)
    }

    /// Applies one player command and, if the player actually moved, the rest of
    /// the turn: exit check, encounter, enemy moves, encounter.
    pub fn take_action(&mut self, input: &str, quiz: &mut dyn Quiz) -> TurnReport {
        let mut encounters = Vec::new();
        if self.state != GameState::Playing {
            return self.report(TurnAction::Skipped, encounters);
        }
        if input.trim().eq_ignore_ascii_case("save") {
            return self.report(TurnAction::SaveRequested, encounters);
        }

        let outcome = move_player(&mut self.player, input, &self.grid);
        if outcome != MoveOutcome::Moved {
            return self.report(TurnAction::Move(outcome), encounters);
        }
        self.turn_counter += 1;
        self.total_turns += 1;

        if self.grid.is_exit(self.player.y, self.player.x) {
            self.state = GameState::LevelComplete;
            self.events.push(RuntimeEvent::LevelCompleted {
                level: self.level,
                turns: self.turn_counter,
            });
            return self.report(TurnAction::Move(outcome), encounters);
        }

        encounters.extend(self.resolve_encounter(EncounterPhase::AfterPlayerMove, quiz));
        if self.state != GameState::Playing {
            return self.report(TurnAction::Move(outcome), encounters);
        }

        move_enemies(
            &mut self.enemies,
            &self.player,
            &self.grid,
            self.rng.as_mut(),
        );
        encounters.extend(self.resolve_encounter(EncounterPhase::AfterEnemyMove, quiz));
        self.check_game_over();
        self.report(TurnAction::Move(outcome), encounters)
    }

    /// `start_turn` followed by `take_action`, for callers that read input up front.
    pub fn play_turn(&mut self, input: &str, quiz: &mut dyn Quiz) -> TurnReport {
        let opening = self.start_turn(quiz);
        if self.state != GameState::Playing {
            return self.report(TurnAction::Skipped, opening.into_iter().collect());
        }
        let mut report = self.take_action(input, quiz);
        if let Some(first) = opening {
            report.encounters.insert(0, first);
        }
        report
    }

    /// Moves on from `LevelComplete`: next level with the GPA carried over, or
    /// `Victory` after the last one. Other states are returned unchanged.
    pub fn advance_level(&mut self) -> Result<GameState, WorldError> {
        if self.state != GameState::LevelComplete {
            return Ok(self.state);
        }
        if self.level < MAX_LEVEL {
            self.load_level(self.level + 1)?;
        } else {
            self.state = GameState::Victory;
            self.events.push(RuntimeEvent::Victory { gpa: self.gpa });
        }
        Ok(self.state)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            level: self.level,
            gpa: self.gpa,
            difficulty: self.settings.difficulty,
            player: self.player.pos(),
            grid_rows: self.grid.to_rows(),
            enemies: self
                .enemies
                .iter()
                .map(|enemy| EnemySnapshot {
                    id: enemy.id,
                    kind: enemy.kind,
                    x: enemy.x,
                    y: enemy.y,
                    active: enemy.active,
                })
                .collect(),
            saved_at: None,
        }
    }

    fn report(&self, action: TurnAction, encounters: Vec<EncounterReport>) -> TurnReport {
        TurnReport {
            action,
            encounters,
            state: self.state,
        }
    }
}
