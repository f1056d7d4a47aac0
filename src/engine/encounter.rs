use super::*;

/// Index of the first active enemy standing on the player's cell.
pub fn check_collision(player: &Player, enemies: &[Enemy]) -> Option<usize> {
    enemies
        .iter()
        .position(|enemy| enemy.active && enemy.x == player.x && enemy.y == player.y)
}

impl GameEngine {
    pub(super) fn resolve_encounter(
        &mut self,
        phase: EncounterPhase,
        quiz: &mut dyn Quiz,
    ) -> Option<EncounterReport> {
        let idx = check_collision(&self.player, &self.enemies)?;
        let (enemy_id, kind) = (self.enemies[idx].id, self.enemies[idx].kind);

        let settings = self.settings;
        let outcome = quiz.ask(kind, &settings, self.rng.as_mut());
        self.gpa = (self.gpa - outcome.penalty()).max(0.0);

        self.events.push(RuntimeEvent::EncounterResolved {
            enemy_id,
            kind,
            phase,
            outcome,
            gpa_after: self.gpa,
        });
        if matches!(outcome, QuizOutcome::Correct | QuizOutcome::NoQuestion) {
            self.enemies[idx].active = false;
            self.events.push(RuntimeEvent::EnemyDeactivated { enemy_id });
        }
        self.check_game_over();

        Some(EncounterReport {
            enemy_id,
            kind,
            phase,
            outcome,
            gpa_after: self.gpa,
        })
    }

    pub(super) fn check_game_over(&mut self) {
        if self.state == GameState::Playing && self.gpa <= 0.0 {
            self.gpa = 0.0;
            self.state = GameState::GameOver;
            self.events.push(RuntimeEvent::GameOver { level: self.level });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(id: u32, row: i32, col: i32, active: bool) -> Enemy {
        Enemy {
            id,
            kind: EnemyKind::Ta,
            x: col,
            y: row,
            active,
            profile: AiProfile::default(),
        }
    }

    #[test]
    fn collision_ignores_inactive_enemies() {
        let player = Player::new(Vec2::at(2, 3));
        let enemies = vec![
            enemy(1, 2, 3, false),
            enemy(2, 1, 3, true),
            enemy(3, 2, 3, true),
            enemy(4, 2, 3, true),
        ];
        assert_eq!(check_collision(&player, &enemies), Some(2));
        assert_eq!(check_collision(&player, &enemies[..2]), None);
    }
}
