use anyhow::{Context, Result};
use clap::Parser;
use gpa_escape::constants::MAX_LEVEL;
use gpa_escape::engine::{GameEngine, GameEngineOptions, MoveOutcome, SpawnPlan, TurnAction};
use gpa_escape::logging::EventLog;
use gpa_escape::quiz::{AnswerSource, Examiner, Question, QuestionBank};
use gpa_escape::rng::{RandomSource, Rng};
use gpa_escape::types::{
    Difficulty, Direction, EnemyKind, GameState, QuizOutcome, RuntimeEvent, Vec2,
};
use gpa_escape::world::{find_path, GridQuery};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_CORRECT_RATE: u32 = 60;
const DEFAULT_MAX_TURNS: u64 = 2_000;

const SYNTHETIC_TA_QUESTIONS: &str = "\
Which loop always runs at least once? A) for B) while C) do-while D) none|C|0.3
What does a stack return first? A) oldest B) newest C) smallest D) random|B|0.2
";
const SYNTHETIC_PROFESSOR_QUESTIONS: &str = "\
Worst case of quicksort? A) n B) n log n C) n^2 D) log n|C|0.5
Which traversal visits a BST in order? A) pre-order B) in-order C) post-order D) level|B|0.4
";
const SYNTHETIC_STUDENT_QUESTIONS: &str = "\
Where is the exam hall? A) library B) canteen C) gym D) main building|D|0.2
";

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    runs: Option<usize>,
    #[arg(long)]
    correct_rate: Option<u32>,
    #[arg(long)]
    max_turns: Option<u64>,
    #[arg(long)]
    questions_dir: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SpawnMode {
    Markers,
    Roster,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    difficulty: Difficulty,
    spawn: SpawnMode,
    seed: u32,
    #[serde(rename = "correctRate")]
    correct_rate: u32,
    #[serde(rename = "maxTurns")]
    max_turns: u64,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    difficulty: Difficulty,
    spawn: SpawnMode,
    #[serde(rename = "correctRate")]
    correct_rate: u32,
    outcome: GameState,
    #[serde(rename = "levelReached")]
    level_reached: u32,
    #[serde(rename = "finalGpa")]
    final_gpa: f64,
    turns: u64,
    encounters: u32,
    correct: u32,
    wrong: u32,
    #[serde(rename = "noQuestion")]
    no_question: u32,
    #[serde(rename = "levelsCompleted")]
    levels_completed: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    turn: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageTurns")]
    average_turns: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Answers correctly `correct_rate` percent of the time, drawing from its own
/// generator rather than the session's.
struct AutopilotAnswers {
    rng: Rng,
    correct_rate: u32,
}

impl AutopilotAnswers {
    fn new(seed: u32, correct_rate: u32) -> Self {
        Self {
            rng: Rng::new(seed ^ 0x9e37_79b9),
            correct_rate: correct_rate.min(100),
        }
    }
}

impl AnswerSource for AutopilotAnswers {
    fn answer(&mut self, question: &Question, _kind: EnemyKind) -> Option<String> {
        let choice = if self.rng.chance_percent(self.correct_rate) {
            question.answer
        } else {
            wrong_choice(question.answer)
        };
        Some(choice.to_string())
    }
}

fn wrong_choice(answer: char) -> char {
    match answer {
        'A' => 'B',
        'B' => 'C',
        'C' => 'D',
        _ => 'A',
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let bank = load_bank(cli.questions_dir.as_deref());
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut run_log = EventLog::stderr(match_id.clone());
    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_turns = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        run_log.emit(
            "info",
            "scenario_started",
            None,
            None,
            json!({
                "scenario": scenario.name,
                "seed": scenario.seed,
                "difficulty": scenario.difficulty,
                "spawn": scenario.spawn,
                "correctRate": scenario.correct_rate,
            }),
        );
        let mut scenario_log = EventLog::stderr(format!("{match_id}/{}", scenario.name));
        let scenario_run = run_scenario(&scenario, &bank, &mut scenario_log);

        for anomaly in &scenario_run.anomaly_records {
            scenario_log.emit(
                "warn",
                "anomaly_detected",
                None,
                Some(anomaly.turn),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_turns += scenario_run.result.turns;
        *outcome_counts
            .entry(outcome_key(scenario_run.result.outcome))
            .or_insert(0) += 1;

        run_log.emit(
            "info",
            "scenario_finished",
            Some(scenario_run.result.level_reached),
            Some(scenario_run.result.turns),
            json!({
                "scenario": scenario.name,
                "outcome": scenario_run.result.outcome,
                "finalGpa": scenario_run.result.final_gpa,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        let line = serde_json::to_string(&scenario_run.result)
            .context("serializing scenario result")?;
        println!("{line}");
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        outcome_counts,
        total_anomalies,
        total_turns,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            run_log.emit(
                "error",
                "summary_write_failed",
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    run_log.emit(
        "info",
        "run_finished",
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageTurns": summary.average_turns,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
    Ok(())
}

fn load_bank(dir: Option<&Path>) -> QuestionBank {
    match dir {
        Some(dir) => {
            let (bank, errors) = QuestionBank::load_dir(dir);
            for error in errors {
                eprintln!("[simulate] {error}");
            }
            bank
        }
        None => synthetic_bank(),
    }
}

fn synthetic_bank() -> QuestionBank {
    QuestionBank::default()
        .with_pool(EnemyKind::Ta, QuestionBank::parse(SYNTHETIC_TA_QUESTIONS))
        .with_pool(
            EnemyKind::Professor,
            QuestionBank::parse(SYNTHETIC_PROFESSOR_QUESTIONS),
        )
        .with_pool(
            EnemyKind::Student,
            QuestionBank::parse(SYNTHETIC_STUDENT_QUESTIONS),
        )
}

fn run_scenario(scenario: &Scenario, bank: &QuestionBank, log: &mut EventLog) -> ScenarioRunResult {
    let spawn_plan = match scenario.spawn {
        SpawnMode::Markers => SpawnPlan::Markers,
        SpawnMode::Roster => SpawnPlan::default_roster(scenario.difficulty),
    };

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();

    let mut engine = match GameEngine::new(
        scenario.difficulty,
        scenario.seed,
        GameEngineOptions { spawn_plan },
    ) {
        Ok(engine) => engine,
        Err(error) => {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                0,
                format!("world generation failed: {error}"),
            );
            return ScenarioRunResult {
                result: empty_result(scenario, anomalies),
                anomaly_records,
            };
        }
    };

    let mut shuffled = bank.clone();
    shuffled.shuffle(engine.rng());
    let mut examiner = Examiner::new(
        shuffled,
        AutopilotAnswers::new(scenario.seed, scenario.correct_rate),
    );

    let mut turn = 0u64;
    let mut encounters = 0;
    let mut correct = 0;
    let mut wrong = 0;
    let mut no_question = 0;
    let mut levels_completed = 0;

    loop {
        let events = engine.drain_events();
        log.record_events(&events, engine.level(), turn);
        for event in &events {
            match event {
                RuntimeEvent::EncounterResolved { outcome, .. } => {
                    encounters += 1;
                    match outcome {
                        QuizOutcome::Correct => correct += 1,
                        QuizOutcome::Wrong { .. } => wrong += 1,
                        QuizOutcome::NoQuestion => no_question += 1,
                    }
                }
                RuntimeEvent::LevelCompleted { .. } => levels_completed += 1,
                _ => {}
            }
        }
        for message in collect_session_anomalies(&engine) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                turn,
                message,
            );
        }

        match engine.state() {
            GameState::GameOver | GameState::Victory => break,
            GameState::LevelComplete => {
                if let Err(error) = engine.advance_level() {
                    push_anomaly(
                        &mut anomalies,
                        &mut anomaly_records,
                        &mut anomaly_seen,
                        turn,
                        format!("level load failed: {error}"),
                    );
                    break;
                }
                continue;
            }
            GameState::MainMenu | GameState::Playing => {}
        }

        turn += 1;
        if turn > scenario.max_turns {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                turn,
                "turn safety limit exceeded".to_string(),
            );
            break;
        }

        let command = autopilot_command(&mut engine);
        let report = engine.play_turn(command, &mut examiner);
        if let TurnAction::Move(outcome) = report.action {
            if outcome != MoveOutcome::Moved {
                push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    turn,
                    format!("autopilot move rejected: {}", outcome.message()),
                );
            }
        }
    }

    ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            difficulty: scenario.difficulty,
            spawn: scenario.spawn,
            correct_rate: scenario.correct_rate,
            outcome: engine.state(),
            level_reached: engine.level(),
            final_gpa: (engine.gpa() * 100.0).round() / 100.0,
            turns: engine.turns(),
            encounters,
            correct,
            wrong,
            no_question,
            levels_completed,
            anomalies,
        },
        anomaly_records,
    }
}

fn empty_result(scenario: &Scenario, anomalies: Vec<String>) -> ScenarioResultLine {
    ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        difficulty: scenario.difficulty,
        spawn: scenario.spawn,
        correct_rate: scenario.correct_rate,
        outcome: GameState::GameOver,
        level_reached: 0,
        final_gpa: 0.0,
        turns: 0,
        encounters: 0,
        correct: 0,
        wrong: 0,
        no_question: 0,
        levels_completed: 0,
        anomalies,
    }
}

/// Next step on a shortest walkable path to the exit; a random open step when
/// no path exists.
fn autopilot_command(engine: &mut GameEngine) -> &'static str {
    let from = engine.player().pos();
    let next = engine
        .grid
        .exit_cells()
        .first()
        .and_then(|exit| find_path(&engine.grid, from, *exit))
        .and_then(|path| path.get(1).copied());
    if let Some(next) = next {
        if let Some(dir) = direction_between(from, next) {
            return command_for(dir);
        }
    }

    let offset = engine.rng().next_int(4) as usize;
    for step in 0..Direction::ALL.len() {
        let dir = Direction::ALL[(offset + step) % Direction::ALL.len()];
        let (dx, dy) = dir.delta();
        if engine.grid.is_walkable(from.y + dy, from.x + dx) {
            return command_for(dir);
        }
    }
    command_for(Direction::ALL[offset])
}

fn direction_between(from: Vec2, to: Vec2) -> Option<Direction> {
    Direction::ALL
        .into_iter()
        .find(|dir| dir.delta() == (to.x - from.x, to.y - from.y))
}

fn command_for(dir: Direction) -> &'static str {
    match dir {
        Direction::Up => "w",
        Direction::Down => "s",
        Direction::Left => "a",
        Direction::Right => "d",
    }
}

fn collect_session_anomalies(engine: &GameEngine) -> Vec<String> {
    let mut anomalies = Vec::new();
    if !engine.gpa().is_finite() || engine.gpa() < 0.0 {
        anomalies.push(format!("invalid gpa: {}", engine.gpa()));
    }

    let mut occupied = HashSet::new();
    for enemy in engine.enemies() {
        if !engine.grid.is_walkable(enemy.y, enemy.x) {
            anomalies.push(format!(
                "enemy {} stands on a wall at ({}, {})",
                enemy.id, enemy.x, enemy.y
            ));
        }
        if enemy.active && !occupied.insert(enemy.pos()) {
            anomalies.push(format!(
                "active enemies share cell ({}, {})",
                enemy.x, enemy.y
            ));
        }
    }

    if engine.level() == 0 || engine.level() > MAX_LEVEL {
        anomalies.push(format!("invalid level: {}", engine.level()));
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(rand::random::<u64>));
    let correct_rate = cli.correct_rate.unwrap_or(DEFAULT_CORRECT_RATE).min(100);
    let max_turns = cli.max_turns.unwrap_or(DEFAULT_MAX_TURNS).max(1);
    let runs = cli.runs.unwrap_or(1).clamp(1, 1_000);

    let mut scenarios = Vec::new();
    if cli.single {
        let difficulty = cli
            .difficulty
            .as_deref()
            .and_then(Difficulty::parse)
            .unwrap_or(Difficulty::Normal);
        for run in 0..runs {
            scenarios.push(Scenario {
                name: format!("single-{}-run{}", difficulty.save_name().to_lowercase(), run + 1),
                difficulty,
                spawn: SpawnMode::Markers,
                seed: normalize_seed(seed as u64 + run as u64),
                correct_rate,
                max_turns,
            });
        }
        return scenarios;
    }

    let difficulties: Vec<Difficulty> = match cli.difficulty.as_deref().and_then(Difficulty::parse)
    {
        Some(difficulty) => vec![difficulty],
        None => Difficulty::ALL.to_vec(),
    };
    let mut offset = 0u64;
    for run in 0..runs {
        for difficulty in &difficulties {
            for spawn in [SpawnMode::Markers, SpawnMode::Roster] {
                let spawn_label = match spawn {
                    SpawnMode::Markers => "markers",
                    SpawnMode::Roster => "roster",
                };
                scenarios.push(Scenario {
                    name: format!(
                        "{}-{spawn_label}-run{}",
                        difficulty.save_name().to_lowercase(),
                        run + 1
                    ),
                    difficulty: *difficulty,
                    spawn,
                    seed: normalize_seed(seed as u64 + offset),
                    correct_rate,
                    max_turns,
                });
                offset += 1;
            }
        }
    }
    scenarios
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    turn: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        turn,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_turns: u64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_turns = if scenario_count == 0 {
        0
    } else {
        total_turns / scenario_count as u64
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_turns,
        outcome_counts,
        scenarios,
    }
}

fn outcome_key(state: GameState) -> String {
    match state {
        GameState::Victory => "victory",
        GameState::GameOver => "game_over",
        GameState::LevelComplete => "level_complete",
        GameState::Playing => "playing",
        GameState::MainMenu => "main_menu",
    }
    .to_string()
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
