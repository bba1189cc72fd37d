// Game state transitions for a single team: question entry fees, answer
// scoring with the type-advantage adjustment, fainting, revival, and the
// three-stage evolution check.
//
// Everything here is pure state manipulation. Callers load a `TeamState`
// from the store, apply one operation, and persist the result; no I/O
// happens inside the engine.

use serde::Serialize;
use thiserror::Error;

use super::progress::Progress;
use super::rules;

/// Gameplay error taxonomy. Handlers translate these into the status-field
/// JSON responses; none of them are fatal.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),
    #[error("not found")]
    NotFound,
    #[error("Team name already registered")]
    Conflict,
    #[error("Time's up")]
    GameOver,
    #[error("You cannot attempt this question anymore.")]
    AttemptsExhausted,
    #[error("Choose your starting pokemon first")]
    CreatureNotChosen,
    #[error("{0}")]
    AuthFailure(String),
}

/// The creature currently bound to a team, or the opponent guarding a
/// question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatureInfo {
    pub name: String,
    pub poke_type: u8,
    pub question_number: i64,
    pub stage: u8,
}

impl CreatureInfo {
    /// Client-side display id: question numbers group species into families
    /// of ten, so the id stays stable across evolution stages.
    pub fn display_id(&self) -> i64 {
        self.question_number % 10
    }
}

/// A quiz question and its expected answer.
#[derive(Debug, Clone)]
pub struct QuestionInfo {
    pub number: i64,
    pub difficulty_level: i64,
    pub content: String,
    pub answer: String,
}

/// In-memory view of a team profile, the engine's unit of state.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamState {
    pub teamname: String,
    pub creature: Option<CreatureInfo>,
    pub chosen: bool,
    pub submitted: bool,
    pub fainted: bool,
    pub xp: i64,
    pub pokemoney: i64,
    pub evolution: u8,
    pub progress: Progress,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub question: String,
    pub visited: u8,
    pub amount_deducted: i64,
    pub poke_type_1: u8,
    pub poke_type_2: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub xp: i64,
    pub pokemoney: i64,
    pub fainted: bool,
    pub visited: u8,
    pub evolved: bool,
    pub evolution: u8,
    /// Species the creature evolved into, when `evolved` is set. The caller
    /// rebinds the team's creature record to this name.
    pub new_species: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChooseOutcome {
    pub teamname: String,
    pub already_chosen: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviveOutcome {
    pub amount_deducted: i64,
    pub pokemoney: i64,
    pub fainted: bool,
    pub xp: i64,
}

impl TeamState {
    fn guard_playing(&self) -> Result<&CreatureInfo, GameError> {
        if self.submitted {
            return Err(GameError::GameOver);
        }
        self.creature.as_ref().ok_or(GameError::CreatureNotChosen)
    }

    /// Serve a question: charge the entry fee and record the attempt.
    ///
    /// Guards run before the fee is charged, so a question that is already
    /// exhausted (three attempts, or answered correctly) never costs
    /// anything. Repeat views of a still-open question each charge the fee.
    pub fn request_question(
        &mut self,
        question: &QuestionInfo,
        opponent: &CreatureInfo,
    ) -> Result<QuestionView, GameError> {
        let own_type = self.guard_playing()?.poke_type;
        if !self.progress.can_attempt(question.number) {
            return Err(GameError::AttemptsExhausted);
        }

        let fee = rules::entry_fee(question.difficulty_level);
        self.pokemoney -= fee;
        let visited = self.progress.record_attempt(question.number);

        Ok(QuestionView {
            question: question.content.clone(),
            visited,
            amount_deducted: fee,
            poke_type_1: own_type,
            poke_type_2: opponent.poke_type,
        })
    }

    /// Score a submitted answer.
    ///
    /// A correct answer (case-insensitive exact match) locks the question,
    /// awards currency and experience, and may evolve the creature. A wrong
    /// answer faints the creature and changes nothing else.
    pub fn submit_answer(
        &mut self,
        question: &QuestionInfo,
        opponent: &CreatureInfo,
        answer: &str,
    ) -> Result<AnswerOutcome, GameError> {
        let own_type = self.guard_playing()?.poke_type;
        if self.progress.attempts(question.number) >= rules::MAX_ATTEMPTS
            || self.progress.is_correct(question.number)
        {
            return Err(GameError::AttemptsExhausted);
        }

        let correct = answer.trim().eq_ignore_ascii_case(question.answer.trim());
        if !correct {
            self.fainted = true;
            return Ok(AnswerOutcome {
                correct: false,
                xp: self.xp,
                pokemoney: self.pokemoney,
                fainted: self.fainted,
                visited: self.progress.attempts(question.number),
                evolved: false,
                evolution: self.evolution,
                new_species: None,
            });
        }

        self.progress.mark_correct(question.number);

        let advantage = rules::type_advantage(own_type, opponent.poke_type);
        let reward = rules::answer_reward(question.difficulty_level, advantage);
        self.pokemoney += reward;
        self.xp += reward;

        // Evolution never regresses: xp only grows, but guard anyway.
        let stage = rules::evolution_stage(self.xp).max(self.evolution);
        let evolved = stage != self.evolution;
        let mut new_species = None;
        if evolved {
            self.evolution = stage;
            if let Some(species) = rules::species_for(own_type, stage) {
                if let Some(creature) = self.creature.as_mut() {
                    creature.name = species.to_string();
                    creature.stage = stage;
                }
                new_species = Some(species.to_string());
            }
        }

        Ok(AnswerOutcome {
            correct: true,
            xp: self.xp,
            pokemoney: self.pokemoney,
            fainted: self.fainted,
            visited: self.progress.attempts(question.number),
            evolved,
            evolution: self.evolution,
            new_species,
        })
    }

    /// Bind the starting creature. Idempotent: once chosen, further calls
    /// return the current state without rebinding.
    pub fn choose_starter(&mut self, creature: &CreatureInfo) -> Result<ChooseOutcome, GameError> {
        if self.submitted {
            return Err(GameError::GameOver);
        }
        if self.chosen {
            return Ok(ChooseOutcome {
                teamname: self.teamname.clone(),
                already_chosen: true,
            });
        }
        self.creature = Some(creature.clone());
        self.chosen = true;
        Ok(ChooseOutcome {
            teamname: self.teamname.clone(),
            already_chosen: false,
        })
    }

    /// Revive a fainted creature at the pokecenter. The cost depends on the
    /// evolution stage and is charged unconditionally; the balance may go
    /// negative.
    pub fn revive(&mut self) -> Result<ReviveOutcome, GameError> {
        if self.submitted {
            return Err(GameError::GameOver);
        }
        let cost = rules::revive_cost(self.evolution);
        self.pokemoney -= cost;
        self.fainted = false;
        Ok(ReviveOutcome {
            amount_deducted: cost,
            pokemoney: self.pokemoney,
            fainted: self.fainted,
            xp: self.xp,
        })
    }

    /// Quote the revive cost without touching the profile.
    pub fn revive_quote(&self) -> Result<i64, GameError> {
        if self.submitted {
            return Err(GameError::GameOver);
        }
        Ok(rules::revive_cost(self.evolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starter(poke_type: u8) -> CreatureInfo {
        CreatureInfo {
            name: rules::species_for(poke_type, 1).unwrap().to_string(),
            poke_type,
            question_number: poke_type as i64,
            stage: 1,
        }
    }

    fn opponent(poke_type: u8, number: i64) -> CreatureInfo {
        CreatureInfo {
            name: format!("Gym {number}"),
            poke_type,
            question_number: number,
            stage: 1,
        }
    }

    fn question(number: i64, level: i64) -> QuestionInfo {
        QuestionInfo {
            number,
            difficulty_level: level,
            content: format!("Question {number}?"),
            answer: "Pallet Town".to_string(),
        }
    }

    fn team(poke_type: u8) -> TeamState {
        TeamState {
            teamname: "rockets".to_string(),
            creature: Some(starter(poke_type)),
            chosen: true,
            submitted: false,
            fainted: false,
            xp: 0,
            pokemoney: 3000,
            evolution: 1,
            progress: Progress::new(10),
        }
    }

    #[test]
    fn test_request_question_charges_fee_and_counts_attempt() {
        let mut t = team(1);
        let view = t.request_question(&question(3, 1), &opponent(2, 3)).unwrap();
        assert_eq!(view.amount_deducted, 100);
        assert_eq!(view.visited, 1);
        assert_eq!(view.poke_type_1, 1);
        assert_eq!(view.poke_type_2, 2);
        assert_eq!(t.pokemoney, 2900);

        let view = t.request_question(&question(3, 1), &opponent(2, 3)).unwrap();
        assert_eq!(view.visited, 2);
        assert_eq!(t.pokemoney, 2800);
    }

    #[test]
    fn test_request_question_level_2_fee() {
        let mut t = team(1);
        let view = t.request_question(&question(5, 2), &opponent(4, 5)).unwrap();
        assert_eq!(view.amount_deducted, 200);
        assert_eq!(t.pokemoney, 2800);
    }

    #[test]
    fn test_request_question_exhausted_charges_nothing() {
        let mut t = team(1);
        for _ in 0..3 {
            t.request_question(&question(3, 1), &opponent(2, 3)).unwrap();
        }
        let before = t.pokemoney;
        let err = t
            .request_question(&question(3, 1), &opponent(2, 3))
            .unwrap_err();
        assert_eq!(err, GameError::AttemptsExhausted);
        assert_eq!(t.pokemoney, before);
        assert_eq!(t.progress.attempts(3), 3);
    }

    #[test]
    fn test_request_question_locked_after_correct() {
        let mut t = team(1);
        t.request_question(&question(3, 1), &opponent(2, 3)).unwrap();
        t.submit_answer(&question(3, 1), &opponent(2, 3), "Pallet Town")
            .unwrap();
        let err = t
            .request_question(&question(3, 1), &opponent(2, 3))
            .unwrap_err();
        assert_eq!(err, GameError::AttemptsExhausted);
    }

    #[test]
    fn test_request_question_game_over() {
        let mut t = team(1);
        t.submitted = true;
        assert_eq!(
            t.request_question(&question(1, 1), &opponent(2, 1)),
            Err(GameError::GameOver)
        );
    }

    #[test]
    fn test_request_question_without_starter() {
        let mut t = team(1);
        t.creature = None;
        assert_eq!(
            t.request_question(&question(1, 1), &opponent(2, 1)),
            Err(GameError::CreatureNotChosen)
        );
    }

    #[test]
    fn test_attempts_never_exceed_three() {
        let mut t = team(1);
        for _ in 0..20 {
            let _ = t.request_question(&question(1, 1), &opponent(3, 1));
        }
        assert_eq!(t.progress.attempts(1), 3);
    }

    #[test]
    fn test_correct_answer_neutral_reward() {
        let mut t = team(1);
        let out = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "pallet town")
            .unwrap();
        assert!(out.correct);
        assert_eq!(out.pokemoney, 3500);
        assert_eq!(out.xp, 500);
        assert!(!out.evolved);
    }

    #[test]
    fn test_correct_answer_is_case_insensitive_and_trimmed() {
        let mut t = team(1);
        let out = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "  PALLET TOWN  ")
            .unwrap();
        assert!(out.correct);
    }

    #[test]
    fn test_correct_answer_with_advantage() {
        let mut t = team(1);
        let out = t
            .submit_answer(&question(1, 1), &opponent(2, 1), "Pallet Town")
            .unwrap();
        assert_eq!(out.xp, 600);
    }

    #[test]
    fn test_correct_answer_with_penalty_level_2() {
        let mut t = team(1);
        let out = t
            .submit_answer(&question(1, 2), &opponent(3, 1), "Pallet Town")
            .unwrap();
        // (500 - 100) * 2
        assert_eq!(out.xp, 800);
        assert_eq!(out.pokemoney, 3800);
    }

    #[test]
    fn test_wrong_answer_faints_without_penalty() {
        let mut t = team(1);
        let out = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "Cerulean City")
            .unwrap();
        assert!(!out.correct);
        assert!(out.fainted);
        assert_eq!(out.xp, 0);
        assert_eq!(out.pokemoney, 3000);
        assert!(t.fainted);
        // Wrong answers do not lock the question
        assert!(t.progress.can_attempt(1));
    }

    #[test]
    fn test_answer_rejected_once_correct() {
        let mut t = team(1);
        t.submit_answer(&question(1, 1), &opponent(4, 1), "Pallet Town")
            .unwrap();
        let err = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "Pallet Town")
            .unwrap_err();
        assert_eq!(err, GameError::AttemptsExhausted);
    }

    #[test]
    fn test_answer_rejected_after_three_attempts() {
        let mut t = team(1);
        for _ in 0..3 {
            t.request_question(&question(1, 1), &opponent(4, 1)).unwrap();
        }
        let err = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "Pallet Town")
            .unwrap_err();
        assert_eq!(err, GameError::AttemptsExhausted);
    }

    #[test]
    fn test_evolution_at_threshold() {
        let mut t = team(1);
        t.xp = 3999;
        let out = t
            .submit_answer(&question(1, 1), &opponent(4, 1), "Pallet Town")
            .unwrap();
        assert_eq!(out.xp, 4499);
        assert!(out.evolved);
        assert_eq!(out.evolution, 2);
        assert_eq!(out.new_species.as_deref(), Some("Charmeleon"));
        assert_eq!(t.creature.as_ref().unwrap().name, "Charmeleon");
        assert_eq!(t.creature.as_ref().unwrap().stage, 2);
        // Type is preserved across evolution
        assert_eq!(t.creature.as_ref().unwrap().poke_type, 1);
    }

    #[test]
    fn test_evolution_monotonic_over_answers() {
        let mut t = team(2);
        let mut last_stage = t.evolution;
        for number in 1..=10 {
            let out = t
                .submit_answer(&question(number, 2), &opponent(4, number), "Pallet Town")
                .unwrap();
            assert!(out.evolution >= last_stage);
            last_stage = out.evolution;
        }
        assert_eq!(t.evolution, 3);
        assert_eq!(t.creature.as_ref().unwrap().name, "Blastoise");
    }

    #[test]
    fn test_evolution_can_skip_to_stage_three() {
        let mut t = team(4);
        t.xp = 7900;
        t.evolution = 2;
        let out = t
            .submit_answer(&question(1, 1), &opponent(1, 1), "Pallet Town")
            .unwrap();
        assert_eq!(out.evolution, 3);
        assert_eq!(out.new_species.as_deref(), Some("Raichu"));
    }

    #[test]
    fn test_choose_starter_binds_once() {
        let mut t = team(1);
        t.creature = None;
        t.chosen = false;
        let pick = starter(3);
        let out = t.choose_starter(&pick).unwrap();
        assert!(!out.already_chosen);
        assert!(t.chosen);
        assert_eq!(t.creature.as_ref().unwrap().name, "Bulbasaur");
    }

    #[test]
    fn test_choose_starter_idempotent() {
        let mut t = team(1);
        let before = t.clone();
        let out = t.choose_starter(&starter(2)).unwrap();
        assert!(out.already_chosen);
        assert_eq!(t, before);
    }

    #[test]
    fn test_choose_starter_game_over() {
        let mut t = team(1);
        t.submitted = true;
        assert_eq!(t.choose_starter(&starter(2)), Err(GameError::GameOver));
    }

    #[test]
    fn test_revive_clears_faint_and_charges_by_stage() {
        let mut t = team(1);
        t.fainted = true;
        let out = t.revive().unwrap();
        assert_eq!(out.amount_deducted, 300);
        assert_eq!(out.pokemoney, 2700);
        assert!(!t.fainted);
    }

    #[test]
    fn test_revive_has_no_balance_floor() {
        let mut t = team(1);
        t.evolution = 3;
        t.pokemoney = 50;
        t.fainted = true;
        let out = t.revive().unwrap();
        assert_eq!(out.amount_deducted, 100);
        assert_eq!(out.pokemoney, -50);
        assert!(!out.fainted);
    }

    #[test]
    fn test_revive_quote_does_not_mutate() {
        let mut t = team(1);
        t.evolution = 2;
        let before = t.clone();
        assert_eq!(t.revive_quote().unwrap(), 200);
        assert_eq!(t, before);
    }

    #[test]
    fn test_revive_game_over() {
        let mut t = team(1);
        t.submitted = true;
        assert_eq!(t.revive(), Err(GameError::GameOver));
        assert_eq!(t.revive_quote(), Err(GameError::GameOver));
    }

    #[test]
    fn test_display_id_groups_by_family() {
        let c = CreatureInfo {
            name: "Charizard".into(),
            poke_type: 1,
            question_number: 21,
            stage: 3,
        };
        assert_eq!(c.display_id(), 1);
    }
}
