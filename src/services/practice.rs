//! Practice test service
//!
//! Test series are persisted; running sessions live in memory only and are
//! lost on restart. Closed sessions stay readable for a retention window and
//! are pruned when new sessions start.

use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::audit::ChangeRecorder;
use super::error::{ServiceError, ServiceResult};
use super::validation::{optional, order_clause, required};
use crate::db::repositories::TestSeriesRepository;
use crate::models::{
    AuditAction, CreateTestSeriesInput, ListParams, NewAuditLog, PagedResult, Question,
    QuestionInput, TestSeries, TestSeriesSummary, TEST_SERIES_SORT_COLUMNS,
};
use crate::practice::{Navigation, Outcome, PracticeError, PracticeSession, SessionView};

const ENTITY: &str = "test_series";

/// How long a submitted or expired session remains readable
pub const SESSION_RETENTION_HOURS: i64 = 24;

pub struct PracticeService {
    repo: Arc<dyn TestSeriesRepository>,
    recorder: ChangeRecorder,
    sessions: RwLock<HashMap<Uuid, PracticeSession>>,
    retention: Duration,
}

impl PracticeService {
    pub fn new(repo: Arc<dyn TestSeriesRepository>, recorder: ChangeRecorder) -> Self {
        Self::with_retention(repo, recorder, Duration::hours(SESSION_RETENTION_HOURS))
    }

    pub fn with_retention(
        repo: Arc<dyn TestSeriesRepository>,
        recorder: ChangeRecorder,
        retention: Duration,
    ) -> Self {
        Self {
            repo,
            recorder,
            sessions: RwLock::new(HashMap::new()),
            retention,
        }
    }

    pub async fn create_series(&self, input: CreateTestSeriesInput, actor: &str) -> ServiceResult<TestSeries> {
        let title = required("Title", &input.title)?;
        if input.duration_minutes == 0 {
            return Err(ServiceError::validation("Duration must be at least one minute"));
        }
        if input.marks_per_question.is_nan() || input.marks_per_question <= 0.0 {
            return Err(ServiceError::validation("Marks per question must be positive"));
        }
        if input.negative_marks.is_nan() || input.negative_marks < 0.0 {
            return Err(ServiceError::validation("Negative marks cannot be below zero"));
        }
        if input.questions.is_empty() {
            return Err(ServiceError::validation("A test needs at least one question"));
        }

        let questions = input
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| question(i, q))
            .collect::<ServiceResult<Vec<_>>>()?;

        let series = TestSeries {
            id: 0,
            title,
            description: optional(input.description),
            duration_minutes: input.duration_minutes,
            marks_per_question: input.marks_per_question,
            negative_marks: input.negative_marks,
            questions,
            created_at: Utc::now(),
        };

        let created = self.repo.create(&series).await?;
        tracing::info!(series_id = created.id, questions = created.questions.len(), "Test series created");

        self.recorder
            .record(
                NewAuditLog::new(actor, AuditAction::Create, ENTITY, Some(created.id))
                    .with_details(json!({ "questions": created.questions.len() })),
            )
            .await;
        Ok(created)
    }

    pub async fn get_series(&self, id: i64) -> ServiceResult<TestSeries> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Test series", id))
    }

    pub async fn list_series(&self, params: &ListParams) -> ServiceResult<PagedResult<TestSeriesSummary>> {
        let order_by = order_clause(params, &TEST_SERIES_SORT_COLUMNS)?;
        let total = self.repo.count().await?;
        let items = self
            .repo
            .list(&order_by, params.offset(), params.limit as i64)
            .await?;
        Ok(PagedResult::new(items, total, params).map(|s| TestSeriesSummary::from(&s)))
    }

    /// Running sessions keep their own copy of the series and are unaffected
    pub async fn delete_series(&self, id: i64, actor: &str) -> ServiceResult<()> {
        if !self.repo.delete(id).await? {
            return Err(ServiceError::not_found("Test series", id));
        }
        self.recorder
            .record(NewAuditLog::new(actor, AuditAction::Delete, ENTITY, Some(id)))
            .await;
        Ok(())
    }

    pub async fn start_session(&self, series_id: i64) -> ServiceResult<SessionView> {
        let series = self.get_series(series_id).await?;
        let now = Utc::now();
        let session = PracticeSession::start(series, now);
        let view = session.view(now);

        tracing::debug!(session_id = %session.id(), series_id, "Practice session started");
        let mut sessions = self.sessions.write().await;
        self.prune(&mut sessions, now);
        sessions.insert(session.id(), session);
        Ok(view)
    }

    pub async fn get_session(&self, id: Uuid) -> ServiceResult<SessionView> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(&id)
            .ok_or_else(|| ServiceError::not_found("Session", id))?;
        Ok(session.view(Utc::now()))
    }

    pub async fn answer(&self, id: Uuid, question: usize, option: usize) -> ServiceResult<SessionView> {
        self.mutate(id, |s, now| s.answer(question, option, now)).await
    }

    pub async fn clear(&self, id: Uuid, question: usize) -> ServiceResult<SessionView> {
        self.mutate(id, |s, now| s.clear_answer(question, now)).await
    }

    pub async fn review(&self, id: Uuid, question: usize) -> ServiceResult<SessionView> {
        self.mutate(id, |s, now| s.toggle_review(question, now)).await
    }

    pub async fn navigate(&self, id: Uuid, navigation: Navigation) -> ServiceResult<SessionView> {
        self.mutate(id, |s, now| s.navigate(navigation, now)).await
    }

    pub async fn submit(&self, id: Uuid) -> ServiceResult<SessionView> {
        self.mutate(id, |s, now| {
            if s.is_submitted() {
                return Ok(Outcome::Applied);
            }
            let session_id = s.id();
            let report = s.submit(now);
            tracing::info!(
                session_id = %session_id,
                score = report.score,
                max_score = report.max_score,
                "Practice session submitted"
            );
            Ok(Outcome::Applied)
        })
        .await
    }

    /// Drop sessions that closed more than the retention window before `now`
    fn prune(&self, sessions: &mut HashMap<Uuid, PracticeSession>, now: chrono::DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| s.closed_at() + self.retention > now);
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned closed practice sessions");
        }
    }

    async fn mutate<F>(&self, id: Uuid, op: F) -> ServiceResult<SessionView>
    where
        F: FnOnce(&mut PracticeSession, chrono::DateTime<Utc>) -> Result<Outcome, PracticeError>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| ServiceError::not_found("Session", id))?;
        let now = Utc::now();
        if op(session, now)? == Outcome::AutoSubmitted {
            tracing::info!(session_id = %id, "Practice session auto-submitted on expiry");
        }
        Ok(session.view(now))
    }
}

fn question(index: usize, input: QuestionInput) -> ServiceResult<Question> {
    let number = index + 1;
    let prompt = required(&format!("Question {} prompt", number), &input.prompt)?;
    let options: Vec<String> = input.options.iter().map(|o| o.trim().to_string()).collect();
    if options.len() < 2 {
        return Err(ServiceError::validation(format!(
            "Question {} needs at least two options",
            number
        )));
    }
    if options.iter().any(|o| o.is_empty()) {
        return Err(ServiceError::validation(format!(
            "Question {} has an empty option",
            number
        )));
    }
    if input.correct_option >= options.len() {
        return Err(ServiceError::validation(format!(
            "Question {}: correct option {} is out of range",
            number, input.correct_option
        )));
    }
    Ok(Question {
        id: number as u32,
        prompt,
        options,
        correct_option: input.correct_option,
    })
}
