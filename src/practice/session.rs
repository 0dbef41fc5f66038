//! Timed practice session over one test series

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PracticeError;
use crate::models::{QuestionView, TestSeries};

/// Per-question palette status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionStatus {
    NotVisited,
    NotAnswered,
    Answered,
    MarkedForReview,
    AnsweredAndMarked,
}

#[derive(Debug, Clone, Default)]
struct QuestionState {
    visited: bool,
    answer: Option<usize>,
    marked: bool,
}

impl QuestionState {
    fn status(&self) -> QuestionStatus {
        match (self.answer.is_some(), self.marked) {
            (true, true) => QuestionStatus::AnsweredAndMarked,
            (true, false) => QuestionStatus::Answered,
            (false, true) => QuestionStatus::MarkedForReview,
            (false, false) if self.visited => QuestionStatus::NotAnswered,
            (false, false) => QuestionStatus::NotVisited,
        }
    }
}

/// Number of questions in each status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub not_visited: usize,
    pub not_answered: usize,
    pub answered: usize,
    pub marked_for_review: usize,
    pub answered_and_marked: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub score: f64,
    pub max_score: f64,
    pub time_taken_seconds: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

/// Navigator request: `{"direction":"next"}` or `{"index":3}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Navigation {
    Step { direction: Direction },
    Jump { index: usize },
}

/// Result of a mutating call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Time was up; the session was submitted instead
    AutoSubmitted,
}

#[derive(Debug, Clone)]
struct Submission {
    at: DateTime<Utc>,
    report: ScoreReport,
}

#[derive(Debug, Clone)]
pub struct PracticeSession {
    id: Uuid,
    series: TestSeries,
    started_at: DateTime<Utc>,
    current: usize,
    states: Vec<QuestionState>,
    submission: Option<Submission>,
}

impl PracticeSession {
    /// Start a session; the first question counts as visited
    pub fn start(series: TestSeries, started_at: DateTime<Utc>) -> Self {
        let mut states = vec![QuestionState::default(); series.questions.len()];
        if let Some(first) = states.first_mut() {
            first.visited = true;
        }
        Self {
            id: Uuid::new_v4(),
            series,
            started_at,
            current: 0,
            states,
            submission: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn series(&self) -> &TestSeries {
        &self.series
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_submitted(&self) -> bool {
        self.submission.is_some()
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        self.submission.as_ref().map(|s| &s.report)
    }

    fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.series.duration_minutes))
    }

    /// Time left at `now`; frozen once submitted
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let at = self.submission.as_ref().map_or(now, |s| s.at);
        let elapsed = (at - self.started_at).max(Duration::zero());
        (self.duration() - elapsed).max(Duration::zero())
    }

    /// When the session stopped accepting changes: the submission time, or
    /// the deadline if it was never submitted
    pub fn closed_at(&self) -> DateTime<Utc> {
        self.submission
            .as_ref()
            .map_or(self.started_at + self.duration(), |s| s.at)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.remaining(now) <= Duration::zero()
    }

    pub fn status(&self, index: usize) -> Option<QuestionStatus> {
        self.states.get(index).map(QuestionState::status)
    }

    pub fn selected(&self, index: usize) -> Option<usize> {
        self.states.get(index).and_then(|s| s.answer)
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary::default();
        for state in &self.states {
            match state.status() {
                QuestionStatus::NotVisited => summary.not_visited += 1,
                QuestionStatus::NotAnswered => summary.not_answered += 1,
                QuestionStatus::Answered => summary.answered += 1,
                QuestionStatus::MarkedForReview => summary.marked_for_review += 1,
                QuestionStatus::AnsweredAndMarked => summary.answered_and_marked += 1,
            }
        }
        summary
    }

    pub fn go_to(&mut self, index: usize, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        self.check_index(index)?;
        self.visit(index);
        Ok(Outcome::Applied)
    }

    /// Move forward; stays on the last question
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        if self.current + 1 < self.states.len() {
            self.visit(self.current + 1);
        }
        Ok(Outcome::Applied)
    }

    /// Move back; stays on the first question
    pub fn previous(&mut self, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        if self.current > 0 && !self.states.is_empty() {
            self.visit(self.current - 1);
        }
        Ok(Outcome::Applied)
    }

    pub fn navigate(&mut self, navigation: Navigation, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        match navigation {
            Navigation::Step { direction: Direction::Next } => self.next(now),
            Navigation::Step { direction: Direction::Previous } => self.previous(now),
            Navigation::Jump { index } => self.go_to(index, now),
        }
    }

    pub fn answer(&mut self, index: usize, option: usize, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        self.check_index(index)?;
        let options = self.series.questions[index].options.len();
        if option >= options {
            return Err(PracticeError::OptionOutOfRange {
                question: index,
                option,
                options,
            });
        }
        let state = &mut self.states[index];
        state.visited = true;
        state.answer = Some(option);
        Ok(Outcome::Applied)
    }

    pub fn clear_answer(&mut self, index: usize, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        self.check_index(index)?;
        self.states[index].answer = None;
        Ok(Outcome::Applied)
    }

    pub fn toggle_review(&mut self, index: usize, now: DateTime<Utc>) -> Result<Outcome, PracticeError> {
        if !self.ensure_open(now)? {
            return Ok(Outcome::AutoSubmitted);
        }
        self.check_index(index)?;
        let state = &mut self.states[index];
        state.visited = true;
        state.marked = !state.marked;
        Ok(Outcome::Applied)
    }

    /// Freeze the session and score it. Later calls return the same report.
    pub fn submit(&mut self, now: DateTime<Utc>) -> &ScoreReport {
        let submission = match self.submission.take() {
            Some(existing) => existing,
            None => {
                let at = now.min(self.started_at + self.duration()).max(self.started_at);
                let report = self.score(at);
                tracing::debug!(session_id = %self.id, score = report.score, "Practice session submitted");
                Submission { at, report }
            }
        };
        &self.submission.insert(submission).report
    }

    /// Closed sessions are an error; expired ones are submitted and `false` returned
    fn ensure_open(&mut self, now: DateTime<Utc>) -> Result<bool, PracticeError> {
        if self.is_submitted() {
            return Err(PracticeError::SessionClosed);
        }
        if self.is_expired(now) {
            self.submit(now);
            return Ok(false);
        }
        Ok(true)
    }

    fn check_index(&self, index: usize) -> Result<(), PracticeError> {
        if index >= self.states.len() {
            return Err(PracticeError::QuestionOutOfRange {
                index,
                count: self.states.len(),
            });
        }
        Ok(())
    }

    fn visit(&mut self, index: usize) {
        self.current = index;
        self.states[index].visited = true;
    }

    fn score(&self, at: DateTime<Utc>) -> ScoreReport {
        let mut correct = 0;
        let mut incorrect = 0;
        let mut unanswered = 0;
        for (question, state) in self.series.questions.iter().zip(&self.states) {
            match state.answer {
                Some(choice) if choice == question.correct_option => correct += 1,
                Some(_) => incorrect += 1,
                None => unanswered += 1,
            }
        }
        let score = correct as f64 * self.series.marks_per_question
            - incorrect as f64 * self.series.negative_marks;

        ScoreReport {
            correct,
            incorrect,
            unanswered,
            score,
            max_score: self.series.max_score(),
            time_taken_seconds: (at - self.started_at).num_seconds(),
        }
    }

    /// Client-facing snapshot at `now`
    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let questions = self
            .series
            .questions
            .iter()
            .zip(&self.states)
            .map(|(question, state)| QuestionSlot {
                question: QuestionView::from(question),
                status: state.status(),
                selected_option: state.answer,
            })
            .collect();

        SessionView {
            id: self.id,
            series_id: self.series.id,
            title: self.series.title.clone(),
            started_at: self.started_at,
            duration_minutes: self.series.duration_minutes,
            remaining_seconds: self.remaining(now).num_seconds(),
            current: self.current,
            questions,
            summary: self.summary(),
            submitted: self.is_submitted(),
            report: self.report().cloned(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSlot {
    #[serde(flatten)]
    pub question: QuestionView,
    pub status: QuestionStatus,
    pub selected_option: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub series_id: i64,
    pub title: String,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub remaining_seconds: i64,
    pub current: usize,
    pub questions: Vec<QuestionSlot>,
    pub summary: StatusSummary,
    pub submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScoreReport>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Question;
    use proptest::prelude::*;

    fn series(questions: usize, minutes: u32) -> TestSeries {
        TestSeries {
            id: 1,
            title: "Mock".to_string(),
            description: None,
            duration_minutes: minutes,
            marks_per_question: 4.0,
            negative_marks: 1.0,
            questions: (0..questions)
                .map(|i| Question {
                    id: i as u32 + 1,
                    prompt: format!("Q{}", i + 1),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_option: i % 4,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn start(questions: usize, minutes: u32) -> (PracticeSession, DateTime<Utc>) {
        let t0 = Utc::now();
        (PracticeSession::start(series(questions, minutes), t0), t0)
    }

    #[test]
    fn test_start_visits_first_question() {
        let (session, _) = start(3, 10);
        assert_eq!(session.current(), 0);
        assert_eq!(session.status(0), Some(QuestionStatus::NotAnswered));
        assert_eq!(session.status(1), Some(QuestionStatus::NotVisited));
        assert_eq!(session.summary().not_visited, 2);
    }

    #[test]
    fn test_navigation_saturates() {
        let (mut s, t0) = start(3, 10);
        s.previous(t0).unwrap();
        assert_eq!(s.current(), 0);

        s.next(t0).unwrap();
        s.next(t0).unwrap();
        s.next(t0).unwrap();
        assert_eq!(s.current(), 2);
        assert_eq!(s.summary().not_visited, 0);

        s.go_to(1, t0).unwrap();
        assert_eq!(s.current(), 1);
        assert_eq!(
            s.go_to(3, t0),
            Err(PracticeError::QuestionOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn test_navigation_requests() {
        let next: Navigation = serde_json::from_str(r#"{"direction":"next"}"#).unwrap();
        let jump: Navigation = serde_json::from_str(r#"{"index":2}"#).unwrap();
        assert_eq!(next, Navigation::Step { direction: Direction::Next });

        let (mut s, t0) = start(3, 10);
        s.navigate(jump, t0).unwrap();
        assert_eq!(s.current(), 2);
        let back: Navigation = serde_json::from_str(r#"{"direction":"previous"}"#).unwrap();
        s.navigate(back, t0).unwrap();
        assert_eq!(s.current(), 1);
        assert!(serde_json::from_str::<Navigation>(r#"{"direction":"sideways"}"#).is_err());
    }

    #[test]
    fn test_status_transitions() {
        let (mut s, t0) = start(2, 10);
        s.answer(0, 2, t0).unwrap();
        assert_eq!(s.status(0), Some(QuestionStatus::Answered));

        s.toggle_review(0, t0).unwrap();
        assert_eq!(s.status(0), Some(QuestionStatus::AnsweredAndMarked));

        s.clear_answer(0, t0).unwrap();
        assert_eq!(s.status(0), Some(QuestionStatus::MarkedForReview));

        s.toggle_review(0, t0).unwrap();
        assert_eq!(s.status(0), Some(QuestionStatus::NotAnswered));

        assert_eq!(
            s.answer(1, 4, t0),
            Err(PracticeError::OptionOutOfRange { question: 1, option: 4, options: 4 })
        );
    }

    #[test]
    fn test_scoring_with_negative_marks() {
        let (mut s, t0) = start(4, 10);
        s.answer(0, 0, t0).unwrap(); // correct
        s.answer(1, 1, t0).unwrap(); // correct
        s.answer(2, 0, t0).unwrap(); // wrong

        let report = s.submit(t0 + Duration::seconds(90)).clone();
        assert_eq!(report.correct, 2);
        assert_eq!(report.incorrect, 1);
        assert_eq!(report.unanswered, 1);
        assert_eq!(report.score, 7.0);
        assert_eq!(report.max_score, 16.0);
        assert_eq!(report.time_taken_seconds, 90);
    }

    #[test]
    fn test_submit_is_idempotent_and_closes() {
        let (mut s, t0) = start(2, 10);
        s.answer(0, 0, t0).unwrap();
        let first = s.submit(t0 + Duration::seconds(30)).clone();
        let second = s.submit(t0 + Duration::seconds(300)).clone();
        assert_eq!(first, second);

        assert_eq!(s.answer(1, 1, t0), Err(PracticeError::SessionClosed));
        assert_eq!(s.next(t0), Err(PracticeError::SessionClosed));
        assert_eq!(s.remaining(t0 + Duration::hours(5)), Duration::minutes(10) - Duration::seconds(30));
    }

    #[test]
    fn test_closed_at() {
        let (mut s, t0) = start(2, 10);
        assert_eq!(s.closed_at(), t0 + Duration::minutes(10));
        s.submit(t0 + Duration::seconds(45));
        assert_eq!(s.closed_at(), t0 + Duration::seconds(45));
    }

    #[test]
    fn test_mutation_after_expiry_auto_submits() {
        let (mut s, t0) = start(2, 1);
        s.answer(0, 0, t0).unwrap();

        let late = t0 + Duration::seconds(61);
        assert_eq!(s.answer(1, 1, late), Ok(Outcome::AutoSubmitted));
        assert!(s.is_submitted());
        assert_eq!(s.selected(1), None);

        let report = s.report().unwrap();
        assert_eq!(report.correct, 1);
        assert_eq!(report.time_taken_seconds, 60);
    }

    #[test]
    fn test_mutation_exactly_at_expiry_auto_submits() {
        let (mut s, t0) = start(1, 1);
        assert_eq!(s.go_to(0, t0 + Duration::minutes(1)), Ok(Outcome::AutoSubmitted));
    }

    #[test]
    fn test_view_hides_answers() {
        let (mut s, t0) = start(2, 10);
        s.answer(1, 3, t0).unwrap();
        let view = s.view(t0 + Duration::seconds(10));
        assert_eq!(view.remaining_seconds, 590);
        assert_eq!(view.questions[1].selected_option, Some(3));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["questions"][0].get("correctOption").is_none());
        assert_eq!(json["questions"][1]["status"], "answered");
        assert!(json.get("report").is_none());
    }

    #[test]
    fn test_empty_series() {
        let (mut s, t0) = start(0, 5);
        assert_eq!(s.next(t0), Ok(Outcome::Applied));
        assert_eq!(s.previous(t0), Ok(Outcome::Applied));
        assert!(s.go_to(0, t0).is_err());
        assert_eq!(s.submit(t0).max_score, 0.0);
    }

    proptest! {
        #[test]
        fn remaining_never_negative_and_monotonic(minutes in 1u32..180, a in 0i64..20_000, b in 0i64..20_000) {
            let (s, t0) = start(1, minutes);
            let (early, late) = (a.min(b), a.max(b));
            let r_early = s.remaining(t0 + Duration::seconds(early));
            let r_late = s.remaining(t0 + Duration::seconds(late));
            prop_assert!(r_late >= Duration::zero());
            prop_assert!(r_early >= r_late);
            prop_assert!(r_early <= Duration::minutes(i64::from(minutes)));
        }

        #[test]
        fn summary_counts_every_question(answers in proptest::collection::vec(proptest::option::of(0usize..4), 1..20)) {
            let (mut s, t0) = start(answers.len(), 60);
            for (i, answer) in answers.iter().enumerate() {
                if let Some(option) = answer {
                    s.answer(i, *option, t0).unwrap();
                }
            }
            let summary = s.summary();
            let total = summary.not_visited + summary.not_answered + summary.answered
                + summary.marked_for_review + summary.answered_and_marked;
            prop_assert_eq!(total, answers.len());

            let report = s.submit(t0).clone();
            prop_assert_eq!(report.correct + report.incorrect + report.unanswered, answers.len());
        }
    }
}
