// The game state engine: pure rules over a team's profile, no I/O.

pub mod game;
pub mod progress;
pub mod rules;

pub use game::{
    AnswerOutcome, ChooseOutcome, CreatureInfo, GameError, QuestionInfo, QuestionView,
    ReviveOutcome, TeamState,
};
pub use progress::Progress;
