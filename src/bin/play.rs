use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::QueueableCommand;
use gpa_escape::constants::{MAX_LEVEL, SAVE_FILE_NAME};
use gpa_escape::engine::{
    EncounterReport, GameEngine, GameEngineOptions, MoveOutcome, SpawnPlan, TurnAction,
};
use gpa_escape::logging::EventLog;
use gpa_escape::quiz::{parse_choice, AnswerSource, Examiner, Question, QuestionBank};
use gpa_escape::render::{hud_line, render_rows, PLAYER_SYMBOL};
use gpa_escape::rng::{RandomSource, Rng};
use gpa_escape::save_store::SaveStore;
use gpa_escape::types::{Difficulty, EnemyKind, GameState, QuizOutcome};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Escape the building before your GPA hits zero")]
struct Cli {
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value = ".")]
    questions_dir: PathBuf,
    #[arg(long, default_value = SAVE_FILE_NAME)]
    save_file: PathBuf,
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Enemy counts as `ta,prof,student` instead of the generated spawn markers.
    #[arg(long)]
    roster: Option<String>,
}

/// Reads answers from the terminal, re-prompting until one of A-D is given.
struct StdinAnswers;

impl AnswerSource for StdinAnswers {
    fn answer(&mut self, question: &Question, kind: EnemyKind) -> Option<String> {
        println!();
        println!("=== {} Encounter! ===", kind.display_name());
        println!("{}", question.text);
        loop {
            prompt("Your answer (enter A/B/C/D): ").ok()?;
            let line = read_line().ok()??;
            if parse_choice(&line).is_some() {
                return Some(line);
            }
            println!("Invalid input! Please enter A, B, C, or D.");
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let session_id = format!("play-{seed}-{}", std::process::id());
    let mut log = match cli.log_file.as_ref() {
        Some(path) => EventLog::to_file(path, session_id)
            .with_context(|| format!("opening log file {}", path.display()))?,
        None => EventLog::disabled(),
    };
    let options = GameEngineOptions {
        spawn_plan: match cli.roster.as_deref() {
            Some(value) => parse_roster(value)?,
            None => SpawnPlan::Markers,
        },
    };
    let preset_difficulty = match cli.difficulty.as_deref() {
        Some(value) => match Difficulty::parse(value) {
            Some(difficulty) => Some(difficulty),
            None => bail!("unknown difficulty {value:?}; expected easy, normal or hard"),
        },
        None => None,
    };

    let mut rng: Box<dyn RandomSource> = Box::new(Rng::new(seed));
    let (mut bank, errors) = QuestionBank::load_dir(&cli.questions_dir);
    for error in &errors {
        println!("Warning: {error}");
        log.emit(
            "warn",
            "question_file_missing",
            None,
            None,
            json!({ "error": error.to_string() }),
        );
    }
    bank.shuffle(rng.as_mut());
    log.emit(
        "info",
        "session_started",
        None,
        None,
        json!({
            "seed": seed,
            "questions": bank.len(),
            "saveFile": cli.save_file.to_string_lossy(),
        }),
    );

    let store = SaveStore::new(cli.save_file.clone());
    let mut examiner = Examiner::new(bank, StdinAnswers);

    println!("=== HKU GPA Escape ===");
    loop {
        println!();
        println!("1) New game");
        println!("2) Load game");
        println!("3) Quit");
        prompt("Choose an option: ")?;
        let Some(choice) = read_line()? else {
            break;
        };
        match choice.trim() {
            "1" => {
                let difficulty = match preset_difficulty {
                    Some(difficulty) => difficulty,
                    None => match ask_difficulty()? {
                        Some(difficulty) => difficulty,
                        None => break,
                    },
                };
                let engine = GameEngine::with_rng(difficulty, rng, options.clone())
                    .context("generating the first level")?;
                rng = play_session(engine, &mut examiner, &store, &mut log)?;
            }
            "2" => match store.load() {
                Ok(snapshot) => {
                    match snapshot.saved_at.as_deref() {
                        Some(saved_at) => println!("Loaded save from {saved_at}."),
                        None => println!("Loaded save."),
                    }
                    let engine = GameEngine::restore(&snapshot, rng, options.clone())
                        .context("restoring the saved session")?;
                    rng = play_session(engine, &mut examiner, &store, &mut log)?;
                }
                Err(error) => {
                    println!("Cannot load {}: {error}", store.path().display());
                    log.emit(
                        "warn",
                        "load_failed",
                        None,
                        None,
                        json!({ "error": error.to_string() }),
                    );
                }
            },
            "3" | "q" | "quit" => break,
            other => println!("Unknown option {other:?}."),
        }
    }
    println!("Goodbye!");
    Ok(())
}

fn play_session(
    mut engine: GameEngine,
    examiner: &mut Examiner<StdinAnswers>,
    store: &SaveStore,
    log: &mut EventLog,
) -> Result<Box<dyn RandomSource>> {
    loop {
        let events = engine.drain_events();
        log.record_events(&events, engine.level(), engine.turns());

        match engine.state() {
            GameState::Victory => {
                println!();
                println!(
                    "*** You escaped all {MAX_LEVEL} levels! Final GPA: {:.2} ***",
                    engine.gpa()
                );
                break;
            }
            GameState::GameOver => {
                println!();
                println!("*** GAME OVER: your GPA reached 0 on level {}. ***", engine.level());
                break;
            }
            GameState::LevelComplete => {
                println!();
                println!("Level {} complete!", engine.level());
                engine.advance_level().context("generating the next level")?;
                continue;
            }
            GameState::MainMenu | GameState::Playing => {}
        }

        if let Some(encounter) = engine.start_turn(examiner) {
            print_encounter(&encounter, examiner.last_question());
            if engine.state() != GameState::Playing {
                continue;
            }
        }

        draw_board(&engine)?;
        prompt("Move (w/a/s/d), save or quit: ")?;
        let Some(line) = read_line()? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("quit") {
            break;
        }

        let report = engine.take_action(&line, examiner);
        match report.action {
            TurnAction::SaveRequested => match store.save(&engine.snapshot()) {
                Ok(()) => println!("Game saved to {}.", store.path().display()),
                Err(error) => {
                    println!("Save failed: {error}");
                    log.emit(
                        "error",
                        "save_failed",
                        Some(engine.level()),
                        Some(engine.turns()),
                        json!({ "error": error.to_string() }),
                    );
                }
            },
            TurnAction::Move(outcome) if outcome != MoveOutcome::Moved => {
                println!("{}", outcome.message());
            }
            TurnAction::Move(_) | TurnAction::Skipped => {}
        }
        for encounter in &report.encounters {
            print_encounter(encounter, examiner.last_question());
        }
    }
    Ok(engine.into_rng())
}

fn print_encounter(encounter: &EncounterReport, question: Option<&Question>) {
    match encounter.outcome {
        QuizOutcome::Correct => println!("Correct! Well done!"),
        QuizOutcome::Wrong { penalty } => {
            if let Some(question) = question {
                println!("Wrong! The correct answer is: {}", question.answer);
            }
            println!("You lost {penalty:.2} GPA! GPA is now {:.2}.", encounter.gpa_after);
        }
        QuizOutcome::NoQuestion => println!(
            "{}: No questions available. You're lucky this time!",
            encounter.kind.display_name()
        ),
    }
}

fn draw_board(engine: &GameEngine) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.queue(Print("\n"))?;
    stdout.queue(Print(hud_line(
        engine.level(),
        MAX_LEVEL,
        engine.gpa(),
        engine.difficulty(),
    )))?;
    stdout.queue(Print("\n"))?;
    for row in render_rows(&engine.grid, engine.player(), engine.enemies()) {
        for symbol in row.chars() {
            stdout.queue(SetForegroundColor(symbol_color(symbol)))?;
            stdout.queue(Print(symbol))?;
        }
        stdout.queue(ResetColor)?;
        stdout.queue(Print("\n"))?;
    }
    stdout.queue(Print("P = you, T = TA, F = Professor, S = Student, E = exit\n"))?;
    stdout.flush()
}

fn symbol_color(symbol: char) -> Color {
    match symbol {
        PLAYER_SYMBOL => Color::Blue,
        'T' | 'F' | 'S' => Color::Red,
        'E' => Color::Yellow,
        '#' => Color::DarkGrey,
        _ => Color::Reset,
    }
}

fn ask_difficulty() -> Result<Option<Difficulty>> {
    loop {
        println!("Select difficulty: 1) Easy  2) Normal  3) Hard");
        prompt("Difficulty: ")?;
        let Some(line) = read_line()? else {
            return Ok(None);
        };
        if let Some(difficulty) = Difficulty::parse(&line) {
            return Ok(Some(difficulty));
        }
        println!("Please enter 1, 2 or 3.");
    }
}

fn parse_roster(value: &str) -> Result<SpawnPlan> {
    let counts = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid roster count {part:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let [ta, professor, student] = counts.as_slice() else {
        bail!("roster needs three counts as ta,prof,student; got {value:?}");
    };
    Ok(SpawnPlan::Roster {
        ta: *ta,
        professor: *professor,
        student: *student,
    })
}

fn prompt(text: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.queue(Print(text))?;
    stdout.flush()
}

/// One trimmed line from stdin, or `None` at end of input.
fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
