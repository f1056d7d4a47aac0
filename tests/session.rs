use gpa_escape::constants::MAX_LEVEL;
use gpa_escape::engine::{
    build_profile, GameEngine, GameEngineOptions, SpawnPlan, TurnAction,
};
use gpa_escape::quiz::Quiz;
use gpa_escape::rng::{RandomSource, Rng, ScriptedRng};
use gpa_escape::save_store::SaveStore;
use gpa_escape::types::{
    Difficulty, DifficultySettings, EncounterPhase, EnemyKind, EnemySnapshot, GameState,
    QuizOutcome, RuntimeEvent, SessionSnapshot, Vec2,
};
use gpa_escape::world::find_path;

/// Replays outcomes in order, then keeps answering with the last one.
struct ScriptedQuiz {
    outcomes: Vec<QuizOutcome>,
    asked: Vec<EnemyKind>,
}

impl ScriptedQuiz {
    fn new(outcomes: &[QuizOutcome]) -> Self {
        Self {
            outcomes: outcomes.to_vec(),
            asked: Vec::new(),
        }
    }
}

impl Quiz for ScriptedQuiz {
    fn ask(
        &mut self,
        kind: EnemyKind,
        settings: &DifficultySettings,
        _rng: &mut dyn RandomSource,
    ) -> QuizOutcome {
        let index = self.asked.len().min(self.outcomes.len().saturating_sub(1));
        self.asked.push(kind);
        match self.outcomes.get(index).copied() {
            Some(QuizOutcome::Wrong { penalty }) => QuizOutcome::Wrong {
                penalty: penalty * settings.multiplier(kind),
            },
            Some(outcome) => outcome,
            None => QuizOutcome::NoQuestion,
        }
    }
}

fn step_toward_exit(engine: &GameEngine) -> &'static str {
    let from = engine.player().pos();
    let exit = engine.grid.exit_cells()[0];
    let path = find_path(&engine.grid, from, exit).expect("exit is reachable");
    let next = path[1];
    match (next.x - from.x, next.y - from.y) {
        (0, -1) => "w",
        (0, 1) => "s",
        (-1, 0) => "a",
        _ => "d",
    }
}

fn corridor_snapshot(enemies: Vec<EnemySnapshot>) -> SessionSnapshot {
    SessionSnapshot {
        level: 1,
        gpa: 3.0,
        difficulty: Difficulty::Hard,
        player: Vec2::at(1, 1),
        grid_rows: vec![
            "##########".to_string(),
            "#........E".to_string(),
            "#........#".to_string(),
            "##########".to_string(),
        ],
        enemies,
        saved_at: None,
    }
}

#[test]
fn perfect_student_walks_out_of_every_level() {
    for difficulty in Difficulty::ALL {
        for seed in 0..25u32 {
            let mut engine =
                GameEngine::new(difficulty, seed, GameEngineOptions::default()).expect("engine");
            let start_gpa = engine.gpa();
            let mut quiz = ScriptedQuiz::new(&[QuizOutcome::Correct]);
            let mut levels_completed = 0;

            for _ in 0..1_000 {
                match engine.state() {
                    GameState::Victory => break,
                    GameState::LevelComplete => {
                        levels_completed += 1;
                        engine.advance_level().expect("next level");
                    }
                    GameState::Playing => {
                        let command = step_toward_exit(&engine);
                        let report = engine.play_turn(command, &mut quiz);
                        assert_ne!(report.action, TurnAction::Skipped);
                    }
                    other => panic!("unexpected state {other:?}"),
                }
            }

            assert_eq!(engine.state(), GameState::Victory, "{difficulty:?} seed={seed}");
            assert_eq!(levels_completed, MAX_LEVEL);
            assert_eq!(engine.gpa(), start_gpa);
        }
    }
}

#[test]
fn wrong_answers_drain_gpa_until_game_over() {
    // A professor standing on the player has no delta to step along, so it stays put.
    let snapshot = corridor_snapshot(vec![EnemySnapshot {
        id: 1,
        kind: EnemyKind::Professor,
        x: 2,
        y: 1,
        active: true,
    }]);
    let mut engine = GameEngine::restore(
        &snapshot,
        Box::new(ScriptedRng::new(&[])),
        GameEngineOptions::default(),
    )
    .expect("restore");
    let mut quiz = ScriptedQuiz::new(&[QuizOutcome::Wrong { penalty: 0.5 }]);

    let report = engine.play_turn("d", &mut quiz);
    // Hard professors multiply by 2.0; both checks in the turn fire.
    assert_eq!(report.encounters.len(), 2);
    assert_eq!(report.encounters[0].phase, EncounterPhase::AfterPlayerMove);
    assert_eq!(engine.gpa(), 1.0);

    let report = engine.play_turn("a", &mut quiz);
    assert_eq!(report.state, GameState::GameOver);
    assert_eq!(engine.gpa(), 0.0);
    assert_eq!(quiz.asked.len(), 3);

    let events = engine.drain_events();
    assert!(matches!(events.first(), Some(RuntimeEvent::SessionRestored { level: 1, .. })));
    assert!(matches!(events.last(), Some(RuntimeEvent::GameOver { level: 1 })));

    let after = engine.play_turn("d", &mut quiz);
    assert_eq!(after.action, TurnAction::Skipped);
    assert_eq!(quiz.asked.len(), 3);
}

#[test]
fn deactivated_enemies_are_left_behind() {
    let snapshot = corridor_snapshot(vec![
        EnemySnapshot {
            id: 1,
            kind: EnemyKind::Ta,
            x: 2,
            y: 1,
            active: true,
        },
        EnemySnapshot {
            id: 2,
            kind: EnemyKind::Student,
            x: 5,
            y: 2,
            active: false,
        },
    ]);
    let mut engine = GameEngine::restore(
        &snapshot,
        Box::new(Rng::new(3)),
        GameEngineOptions::default(),
    )
    .expect("restore");
    let mut quiz = ScriptedQuiz::new(&[QuizOutcome::Correct]);

    engine.play_turn("d", &mut quiz);
    assert!(!engine.enemies()[0].active);
    assert_eq!(engine.enemies()[1].pos(), Vec2::new(5, 2));

    for _ in 0..6 {
        engine.play_turn("d", &mut quiz);
        assert_eq!(engine.enemies()[0].pos(), Vec2::new(2, 1));
        assert_eq!(engine.enemies()[1].pos(), Vec2::new(5, 2));
    }
    assert_eq!(engine.player().pos(), Vec2::at(1, 8));
    engine.play_turn("d", &mut quiz);
    assert_eq!(engine.state(), GameState::LevelComplete);
    assert_eq!(quiz.asked, vec![EnemyKind::Ta]);
}

#[test]
fn saved_session_resumes_identically() {
    let options = GameEngineOptions {
        spawn_plan: SpawnPlan::default_roster(Difficulty::Normal),
    };
    let mut original =
        GameEngine::new(Difficulty::Normal, 2024, options.clone()).expect("engine");
    let mut quiz = ScriptedQuiz::new(&[QuizOutcome::Wrong { penalty: 0.1 }]);
    for _ in 0..3 {
        if original.state() != GameState::Playing {
            break;
        }
        let command = step_toward_exit(&original);
        original.play_turn(command, &mut quiz);
    }
    let snapshot = original.snapshot();

    let path = std::env::temp_dir()
        .join(format!(
            "gpa-escape-session-{}-{}",
            std::process::id(),
            rand::random::<u32>()
        ))
        .join("save.txt");
    let store = SaveStore::new(path.clone());
    store.save(&snapshot).expect("save");
    let loaded = store.load().expect("load");
    assert_eq!(loaded.enemies, snapshot.enemies);
    assert_eq!(loaded.grid_rows, snapshot.grid_rows);
    assert_eq!(loaded.gpa, snapshot.gpa);

    let mut direct =
        GameEngine::restore(&snapshot, Box::new(Rng::new(9)), options.clone()).expect("direct");
    let mut from_disk =
        GameEngine::restore(&loaded, Box::new(Rng::new(9)), options).expect("from disk");
    for (index, enemy) in from_disk.enemies().iter().enumerate() {
        let same_kind_before = from_disk.enemies()[..index]
            .iter()
            .filter(|other| other.kind == enemy.kind)
            .count();
        assert_eq!(
            enemy.profile,
            build_profile(enemy.kind, Difficulty::Normal, loaded.level, same_kind_before)
        );
    }

    let mut quiz_a = ScriptedQuiz::new(&[QuizOutcome::Correct]);
    let mut quiz_b = ScriptedQuiz::new(&[QuizOutcome::Correct]);
    for _ in 0..10 {
        if direct.state() != GameState::Playing {
            break;
        }
        let command = step_toward_exit(&direct);
        let a = direct.play_turn(command, &mut quiz_a);
        let b = from_disk.play_turn(command, &mut quiz_b);
        assert_eq!(a, b);
    }
    assert_eq!(direct.snapshot(), from_disk.snapshot());

    if let Some(parent) = path.parent() {
        let _ = std::fs::remove_dir_all(parent);
    }
}
