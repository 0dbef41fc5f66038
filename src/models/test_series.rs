//! Practice test series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{SortColumns, SortOrder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_option: usize,
}

/// A question as shown during a running session (answer hidden)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub id: u32,
    pub prompt: String,
    pub options: Vec<String>,
}

impl From<&Question> for QuestionView {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt.clone(),
            options: q.options.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSeries {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub marks_per_question: f64,
    pub negative_marks: f64,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl TestSeries {
    pub fn max_score(&self) -> f64 {
        self.questions.len() as f64 * self.marks_per_question
    }
}

/// A series as served to practice clients: questions without their answers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSeriesDetail {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub marks_per_question: f64,
    pub negative_marks: f64,
    pub questions: Vec<QuestionView>,
    pub created_at: DateTime<Utc>,
}

impl From<&TestSeries> for TestSeriesDetail {
    fn from(t: &TestSeries) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            description: t.description.clone(),
            duration_minutes: t.duration_minutes,
            marks_per_question: t.marks_per_question,
            negative_marks: t.negative_marks,
            questions: t.questions.iter().map(QuestionView::from).collect(),
            created_at: t.created_at,
        }
    }
}

/// Listing entry without the question bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSeriesSummary {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub question_count: usize,
    pub created_at: DateTime<Utc>,
}

impl From<&TestSeries> for TestSeriesSummary {
    fn from(t: &TestSeries) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            description: t.description.clone(),
            duration_minutes: t.duration_minutes,
            question_count: t.questions.len(),
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInput {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestSeriesInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub duration_minutes: u32,
    #[serde(default = "default_marks")]
    pub marks_per_question: f64,
    #[serde(default)]
    pub negative_marks: f64,
    pub questions: Vec<QuestionInput>,
}

fn default_marks() -> f64 {
    1.0
}

pub const TEST_SERIES_SORT_COLUMNS: SortColumns = SortColumns {
    fields: &[
        ("id", "id"),
        ("title", "title"),
        ("durationMinutes", "duration_minutes"),
        ("createdAt", "created_at"),
    ],
    default_column: "created_at",
    default_order: SortOrder::Desc,
};
