//! Practice-test engine
//!
//! Bookkeeping for a timed test: which question is on screen, what was
//! answered or flagged, how much time is left, and the final score.
//! All operations take the current instant explicitly so the timer can be
//! driven deterministically.

pub mod session;

pub use session::{
    Direction, Navigation, Outcome, PracticeSession, QuestionSlot, QuestionStatus, ScoreReport,
    SessionView, StatusSummary,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PracticeError {
    #[error("Question {index} is out of range (test has {count} questions)")]
    QuestionOutOfRange { index: usize, count: usize },

    #[error("Option {option} is out of range for question {question} ({options} options)")]
    OptionOutOfRange {
        question: usize,
        option: usize,
        options: usize,
    },

    #[error("Session has already been submitted")]
    SessionClosed,
}
