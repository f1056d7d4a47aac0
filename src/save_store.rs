use std::fs;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use thiserror::Error;

use crate::constants::MAX_LEVEL;
use crate::types::{Difficulty, EnemyKind, EnemySnapshot, SessionSnapshot, Vec2};
use crate::world::{Grid, GridQuery};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("save file has no {0} record")]
    Missing(&'static str),
}

pub type Result<T> = std::result::Result<T, SaveError>;

/// Flat-file store holding a single saved session.
pub struct SaveStore {
    file_path: PathBuf,
}

impl SaveStore {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn exists(&self) -> bool {
        self.file_path.is_file()
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let saved_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::write(&self.file_path, encode_snapshot(snapshot, &saved_at))?;
        Ok(())
    }

    pub fn load(&self) -> Result<SessionSnapshot> {
        let text = fs::read_to_string(&self.file_path)?;
        decode_snapshot(&text)
    }
}

pub fn encode_snapshot(snapshot: &SessionSnapshot, saved_at: &str) -> String {
    let rows = snapshot.grid_rows.len();
    let cols = snapshot
        .grid_rows
        .first()
        .map(|row| row.chars().count())
        .unwrap_or(0);

    let mut out = String::new();
    out.push_str(&format!("LEVEL {}\n", snapshot.level));
    out.push_str(&format!("GPA {}\n", snapshot.gpa));
    out.push_str(&format!("DIFFICULTY {}\n", snapshot.difficulty.save_name()));
    out.push_str(&format!("SAVED_AT {saved_at}\n"));
    out.push_str(&format!("PLAYER {} {}\n", snapshot.player.x, snapshot.player.y));
    out.push_str(&format!("MAP {rows} {cols}\n"));
    for row in &snapshot.grid_rows {
        out.push_str(row);
        out.push('\n');
    }
    out.push_str(&format!("ENEMIES {}\n", snapshot.enemies.len()));
    for enemy in &snapshot.enemies {
        out.push_str(&format!(
            "{} {} {} {} {}\n",
            enemy.kind.symbol(),
            enemy.x,
            enemy.y,
            u8::from(enemy.active),
            enemy.id
        ));
    }
    out
}

struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    /// Next non-blank line with its 1-based number.
    fn next_record(&mut self) -> Option<(usize, &'a str)> {
        self.inner
            .by_ref()
            .map(|(idx, line)| (idx + 1, line.trim_end()))
            .find(|(_, line)| !line.trim().is_empty())
    }
}

fn parse_error(line: usize, message: impl Into<String>) -> SaveError {
    SaveError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    value: Option<&str>,
    what: &str,
) -> Result<T> {
    value
        .and_then(|raw| raw.parse::<T>().ok())
        .ok_or_else(|| parse_error(line, format!("invalid {what}")))
}

/// Parses the text save format. Unknown records are skipped; a missing
/// `DIFFICULTY` falls back to normal.
pub fn decode_snapshot(text: &str) -> Result<SessionSnapshot> {
    let mut lines = Lines {
        inner: text.lines().enumerate(),
    };

    let mut level = None;
    let mut gpa = None;
    let mut difficulty = Difficulty::Normal;
    let mut saved_at = None;
    let mut player: Option<(usize, Vec2)> = None;
    let mut grid: Option<Grid> = None;
    let mut enemies = Vec::new();

    while let Some((line_no, line)) = lines.next_record() {
        let mut tokens = line.split_whitespace();
        let Some(token) = tokens.next() else {
            continue;
        };
        match token {
            "LEVEL" => {
                let value: u32 = parse_field(line_no, tokens.next(), "level")?;
                if !(1..=MAX_LEVEL).contains(&value) {
                    return Err(parse_error(line_no, format!("level {value} out of range")));
                }
                level = Some(value);
            }
            "GPA" => {
                let value: f64 = parse_field(line_no, tokens.next(), "GPA")?;
                if !value.is_finite() {
                    return Err(parse_error(line_no, "GPA is not finite"));
                }
                gpa = Some(value.max(0.0));
            }
            "DIFFICULTY" => {
                difficulty = tokens
                    .next()
                    .and_then(Difficulty::from_save_name)
                    .unwrap_or(Difficulty::Normal);
            }
            "SAVED_AT" => {
                saved_at = tokens.next().map(str::to_string);
            }
            "PLAYER" => {
                let x = parse_field(line_no, tokens.next(), "player x")?;
                let y = parse_field(line_no, tokens.next(), "player y")?;
                player = Some((line_no, Vec2::new(x, y)));
            }
            "MAP" => {
                let rows: usize = parse_field(line_no, tokens.next(), "map rows")?;
                let cols: usize = parse_field(line_no, tokens.next(), "map cols")?;
                grid = Some(read_map(&mut lines, line_no, rows, cols)?);
            }
            "ENEMIES" => {
                let count: usize = parse_field(line_no, tokens.next(), "enemy count")?;
                enemies = read_enemies(&mut lines, line_no, count)?;
            }
            _ => {}
        }
    }

    let level = level.ok_or(SaveError::Missing("LEVEL"))?;
    let gpa = gpa.ok_or(SaveError::Missing("GPA"))?;
    let (player_line, player) = player.ok_or(SaveError::Missing("PLAYER"))?;
    let grid = grid.ok_or(SaveError::Missing("MAP"))?;

    if !grid.in_bounds(player.row(), player.col()) {
        return Err(parse_error(
            player_line,
            format!("player ({}, {}) is outside the map", player.x, player.y),
        ));
    }

    Ok(SessionSnapshot {
        level,
        gpa,
        difficulty,
        player,
        grid_rows: grid.to_rows(),
        enemies,
        saved_at,
    })
}

fn read_map(lines: &mut Lines<'_>, header_line: usize, rows: usize, cols: usize) -> Result<Grid> {
    let mut map_rows = Vec::new();
    for read in 0..rows {
        let Some((line_no, line)) = lines.next_record() else {
            return Err(parse_error(
                header_line,
                format!("expected {rows} map rows, found {read}"),
            ));
        };
        let line = line.trim();
        if line.chars().count() != cols {
            return Err(parse_error(
                line_no,
                format!("expected {cols} columns, found {}", line.chars().count()),
            ));
        }
        map_rows.push(line.to_string());
    }
    Grid::from_rows(&map_rows).map_err(|err| parse_error(header_line, err.to_string()))
}

fn read_enemies(
    lines: &mut Lines<'_>,
    header_line: usize,
    count: usize,
) -> Result<Vec<EnemySnapshot>> {
    let mut enemies = Vec::new();
    for read in 0..count {
        let Some((line_no, line)) = lines.next_record() else {
            return Err(parse_error(
                header_line,
                format!("expected {count} enemies, found {read}"),
            ));
        };
        let mut tokens = line.split_whitespace();
        let kind = tokens
            .next()
            .and_then(|symbol| {
                let mut chars = symbol.chars();
                match (chars.next(), chars.next()) {
                    (Some(first), None) => EnemyKind::from_symbol(first),
                    _ => None,
                }
            })
            .ok_or_else(|| parse_error(line_no, "unknown enemy kind"))?;
        let x = parse_field(line_no, tokens.next(), "enemy x")?;
        let y = parse_field(line_no, tokens.next(), "enemy y")?;
        // Older saves carry only kind and position.
        let active = match tokens.next() {
            None | Some("1") => true,
            Some("0") => false,
            Some(_) => return Err(parse_error(line_no, "enemy active flag must be 0 or 1")),
        };
        let id = match tokens.next() {
            Some(raw) => parse_field(line_no, Some(raw), "enemy id")?,
            None => read as u32 + 1,
        };
        enemies.push(EnemySnapshot {
            id,
            kind,
            x,
            y,
            active,
        });
    }
    Ok(enemies)
}
