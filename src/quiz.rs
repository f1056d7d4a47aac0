//! Question bank and the examiner that turns an encounter into a quiz outcome.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants::{PROFESSOR_QUESTIONS_FILE, STUDENT_QUESTIONS_FILE, TA_QUESTIONS_FILE};
use crate::rng::RandomSource;
use crate::types::{DifficultySettings, EnemyKind, QuizOutcome};

#[derive(Debug, Error)]
pub enum QuestionBankError {
    #[error("cannot read question file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, QuestionBankError>;

/// Asked whenever the player shares a cell with an active enemy.
pub trait Quiz {
    fn ask(
        &mut self,
        kind: EnemyKind,
        settings: &DifficultySettings,
        rng: &mut dyn RandomSource,
    ) -> QuizOutcome;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Question {
    pub text: String,
    /// Expected choice, uppercased.
    pub answer: char,
    pub base_penalty: f64,
}

impl Question {
    /// Parses `question|answer|penalty`. Returns `None` for anything else.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, '|');
        let text = fields.next()?.trim();
        let answer = fields.next()?.trim().chars().next()?.to_ascii_uppercase();
        let base_penalty = fields.next()?.split_whitespace().next()?.parse::<f64>().ok()?;
        if text.is_empty() || !base_penalty.is_finite() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            answer,
            base_penalty,
        })
    }
}

/// First non-space character of `input`, uppercased, if it is one of `A..=D`.
pub fn parse_choice(input: &str) -> Option<char> {
    let choice = input.trim_start().chars().next()?.to_ascii_uppercase();
    matches!(choice, 'A'..='D').then_some(choice)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuestionBank {
    ta: Vec<Question>,
    professor: Vec<Question>,
    student: Vec<Question>,
}

impl QuestionBank {
    pub fn parse(text: &str) -> Vec<Question> {
        text.lines().filter_map(Question::parse_line).collect()
    }

    pub fn load_file(path: &Path) -> Result<Vec<Question>> {
        let text = fs::read_to_string(path).map_err(|source| QuestionBankError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Loads the three question files from `dir`. A file that cannot be read
    /// leaves its pool empty and is returned alongside the bank.
    pub fn load_dir(dir: &Path) -> (Self, Vec<QuestionBankError>) {
        let mut bank = Self::default();
        let mut errors = Vec::new();
        for kind in EnemyKind::ALL {
            match Self::load_file(&dir.join(question_file_name(kind))) {
                Ok(questions) => *bank.pool_mut(kind) = questions,
                Err(err) => errors.push(err),
            }
        }
        (bank, errors)
    }

    /// Replaces the pool for `kind`.
    pub fn with_pool(mut self, kind: EnemyKind, questions: Vec<Question>) -> Self {
        *self.pool_mut(kind) = questions;
        self
    }

    pub fn pool(&self, kind: EnemyKind) -> &[Question] {
        match kind {
            EnemyKind::Ta => &self.ta,
            EnemyKind::Professor => &self.professor,
            EnemyKind::Student => &self.student,
        }
    }

    fn pool_mut(&mut self, kind: EnemyKind) -> &mut Vec<Question> {
        match kind {
            EnemyKind::Ta => &mut self.ta,
            EnemyKind::Professor => &mut self.professor,
            EnemyKind::Student => &mut self.student,
        }
    }

    pub fn len(&self) -> usize {
        self.ta.len() + self.professor.len() + self.student.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fisher-Yates over every pool.
    pub fn shuffle(&mut self, rng: &mut dyn RandomSource) {
        for kind in EnemyKind::ALL {
            let pool = self.pool_mut(kind);
            for i in (1..pool.len()).rev() {
                let j = rng.next_int(i as u32 + 1) as usize;
                pool.swap(i, j);
            }
        }
    }

    pub fn pick(&self, kind: EnemyKind, rng: &mut dyn RandomSource) -> Option<&Question> {
        let pool = self.pool(kind);
        if pool.is_empty() {
            return None;
        }
        pool.get(rng.pick_index(pool.len()))
    }
}

pub fn question_file_name(kind: EnemyKind) -> &'static str {
    match kind {
        EnemyKind::Ta => TA_QUESTIONS_FILE,
        EnemyKind::Professor => PROFESSOR_QUESTIONS_FILE,
        EnemyKind::Student => STUDENT_QUESTIONS_FILE,
    }
}

/// Whoever answers the questions: a person at the terminal or an autopilot.
pub trait AnswerSource {
    /// Raw answer text, or `None` when no answer can be obtained.
    fn answer(&mut self, question: &Question, kind: EnemyKind) -> Option<String>;
}

/// Draws a question for the enemy's kind and grades the answer.
pub struct Examiner<A> {
    bank: QuestionBank,
    answers: A,
    last_question: Option<Question>,
}

impl<A: AnswerSource> Examiner<A> {
    pub fn new(bank: QuestionBank, answers: A) -> Self {
        Self {
            bank,
            answers,
            last_question: None,
        }
    }

    /// Question asked by the most recent encounter, if any was available.
    pub fn last_question(&self) -> Option<&Question> {
        self.last_question.as_ref()
    }
}

impl<A: AnswerSource> Quiz for Examiner<A> {
    fn ask(
        &mut self,
        kind: EnemyKind,
        settings: &DifficultySettings,
        rng: &mut dyn RandomSource,
    ) -> QuizOutcome {
        let Some(question) = self.bank.pick(kind, rng).cloned() else {
            self.last_question = None;
            return QuizOutcome::NoQuestion;
        };
        let reply = self.answers.answer(&question, kind);
        let outcome = match reply.as_deref().and_then(parse_choice) {
            Some(choice) if choice == question.answer => QuizOutcome::Correct,
            _ => QuizOutcome::Wrong {
                penalty: question.base_penalty * settings.multiplier(kind),
            },
        };
        self.last_question = Some(question);
        outcome
    }
}
