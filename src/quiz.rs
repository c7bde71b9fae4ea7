//! Quizzes: the aggregate, teacher-side authoring rules and the `/quizzes`
//! client.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::api::ApiClient;
use crate::error::{ApiError, ValidationError};
use crate::models::timestamp;

pub const OPTION_LETTERS: [char; 4] = ['a', 'b', 'c', 'd'];
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Text of the correct option.
    pub answer: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "QuizWire")]
pub struct Quiz {
    pub id: String,
    pub quiz_number: u32,
    pub course_id: String,
    pub course_name: String,
    pub teacher_id: String,
    pub tenant_id: String,
    pub description: String,
    #[serde(serialize_with = "timestamp::serialize")]
    pub due_date: DateTime<Utc>,
    pub questions: Vec<QuizQuestion>,
    pub total_marks: u32,
    pub status: QuizStatus,
    pub ai_generated: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    quiz_number: u32,
    course_id: Option<String>,
    course_name: Option<String>,
    teacher_id: Option<String>,
    tenant_id: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    due_date: DateTime<Utc>,
    #[serde(default)]
    questions: Vec<QuizQuestion>,
    total_marks: Option<u32>,
    status: Option<QuizStatus>,
    ai_generated: Option<bool>,
}

impl TryFrom<QuizWire> for Quiz {
    type Error = String;

    fn try_from(w: QuizWire) -> Result<Self, Self::Error> {
        let id = w
            .mongo_id
            .or(w.id)
            .filter(|id| !id.is_empty())
            .ok_or("quiz without id")?;
        Ok(Quiz {
            id,
            quiz_number: w.quiz_number,
            course_id: w.course_id.unwrap_or_default(),
            course_name: w.course_name.unwrap_or_default(),
            teacher_id: w.teacher_id.unwrap_or_default(),
            tenant_id: w.tenant_id.unwrap_or_default(),
            description: w.description.unwrap_or_default(),
            due_date: w.due_date,
            total_marks: w.total_marks.unwrap_or(w.questions.len() as u32),
            questions: w.questions,
            status: w.status.unwrap_or_default(),
            ai_generated: w.ai_generated.unwrap_or(false),
        })
    }
}

impl Quiz {
    /// Past-due quizzes read as inactive whatever the stored status.
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuizStatus {
        if self.due_date < now {
            QuizStatus::Inactive
        } else {
            self.status
        }
    }

    pub fn display_number(&self) -> String {
        format!("{:02}", self.quiz_number)
    }
}

fn iso(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// --- authoring ---

/// One question as edited: options plus the letter of the correct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub statement: String,
    pub options: Vec<String>,
    pub answer: Option<char>,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        QuestionDraft {
            statement: String::new(),
            options: vec![String::new(); MIN_OPTIONS],
            answer: None,
        }
    }
}

impl QuestionDraft {
    pub fn from_question(q: &QuizQuestion) -> Self {
        let answer = q
            .options
            .iter()
            .position(|o| *o == q.answer)
            .and_then(|i| OPTION_LETTERS.get(i).copied());
        QuestionDraft {
            statement: q.question.clone(),
            options: q.options.clone(),
            answer,
        }
    }

    pub fn available_letters(&self) -> &[char] {
        &OPTION_LETTERS[..self.options.len().min(MAX_OPTIONS)]
    }

    pub fn add_option(&mut self) -> bool {
        if self.options.len() >= MAX_OPTIONS {
            return false;
        }
        self.options.push(String::new());
        true
    }

    /// Keeps at least two options. An answer that no longer points at an
    /// option is cleared.
    pub fn remove_option(&mut self, index: usize) -> bool {
        if self.options.len() <= MIN_OPTIONS || index >= self.options.len() {
            return false;
        }
        self.options.remove(index);
        if self.answer_index().map_or(false, |i| i >= self.options.len()) {
            self.answer = None;
        }
        true
    }

    fn answer_index(&self) -> Option<usize> {
        self.answer.and_then(|a| OPTION_LETTERS.iter().position(|l| *l == a))
    }

    /// `number` is 1-based and only used in errors.
    pub fn validate(&self, number: usize) -> Result<QuizQuestion, ValidationError> {
        if self.statement.trim().is_empty() {
            return Err(ValidationError::EmptyStatement { question: number });
        }
        let count = self.options.len();
        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&count) {
            return Err(ValidationError::OptionCount { question: number, count });
        }
        if let Some(i) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(ValidationError::EmptyOption { question: number, option: i + 1 });
        }
        let answer = self
            .answer_index()
            .and_then(|i| self.options.get(i))
            .ok_or(ValidationError::InvalidAnswer { question: number })?;
        Ok(QuizQuestion {
            question: self.statement.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            answer: answer.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub quiz_number: u32,
    pub course_id: String,
    pub course_name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub description: String,
    pub questions: Vec<QuestionDraft>,
    pub status: QuizStatus,
}

impl Default for QuizDraft {
    fn default() -> Self {
        QuizDraft {
            quiz_number: 1,
            course_id: String::new(),
            course_name: String::new(),
            due_date: None,
            description: String::new(),
            questions: vec![QuestionDraft::default()],
            status: QuizStatus::Active,
        }
    }
}

/// A draft that passed every authoring rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidQuiz {
    pub quiz_number: u32,
    pub course_id: String,
    pub course_name: String,
    pub due_date: DateTime<Utc>,
    pub description: String,
    pub questions: Vec<QuizQuestion>,
    pub status: QuizStatus,
}

impl ValidQuiz {
    /// One mark per question.
    pub fn total_marks(&self) -> u32 {
        self.questions.len() as u32
    }
}

impl QuizDraft {
    pub fn from_quiz(quiz: &Quiz) -> Self {
        QuizDraft {
            quiz_number: quiz.quiz_number,
            course_id: quiz.course_id.clone(),
            course_name: quiz.course_name.clone(),
            due_date: Some(quiz.due_date),
            description: quiz.description.clone(),
            questions: quiz.questions.iter().map(QuestionDraft::from_question).collect(),
            status: quiz.status,
        }
    }

    pub fn add_question(&mut self) {
        self.questions.push(QuestionDraft::default());
    }

    pub fn remove_question(&mut self, index: usize) -> bool {
        if index >= self.questions.len() {
            return false;
        }
        self.questions.remove(index);
        true
    }

    pub fn validate(&self) -> Result<ValidQuiz, ValidationError> {
        if self.quiz_number == 0 {
            return Err(ValidationError::InvalidQuizNumber);
        }
        if self.course_id.trim().is_empty() {
            return Err(ValidationError::MissingCourse);
        }
        let due_date = self.due_date.ok_or(ValidationError::MissingDueDate)?;
        if self.questions.is_empty() {
            return Err(ValidationError::NoQuestions);
        }
        let questions = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| q.validate(i + 1))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ValidQuiz {
            quiz_number: self.quiz_number,
            course_id: self.course_id.trim().to_string(),
            course_name: self.course_name.trim().to_string(),
            due_date,
            description: self.description.trim().to_string(),
            questions,
            status: self.status,
        })
    }

    pub fn into_create(self, teacher_id: &str, tenant_id: &str) -> Result<QuizCreate, ValidationError> {
        let valid = self.validate()?;
        Ok(QuizCreate {
            total_marks: valid.total_marks(),
            course_id: valid.course_id,
            course_name: valid.course_name,
            teacher_id: teacher_id.to_string(),
            tenant_id: tenant_id.to_string(),
            quiz_number: valid.quiz_number,
            description: valid.description,
            due_date: iso(&valid.due_date),
            questions: valid.questions,
            ai_generated: false,
        })
    }
}

/// Editing an existing quiz. Once students have submitted, questions and
/// course are frozen.
#[derive(Debug, Clone)]
pub struct QuizEdit {
    pub quiz_id: String,
    pub draft: QuizDraft,
    original: QuizDraft,
    questions_locked: bool,
}

impl QuizEdit {
    pub fn new(quiz: &Quiz, has_submissions: bool) -> Self {
        let original = QuizDraft::from_quiz(quiz);
        QuizEdit {
            quiz_id: quiz.id.clone(),
            draft: original.clone(),
            original,
            questions_locked: has_submissions,
        }
    }

    pub fn questions_locked(&self) -> bool {
        self.questions_locked
    }

    pub fn has_changes(&self) -> bool {
        self.draft != self.original
    }

    pub fn update(&self) -> Result<QuizUpdate, ValidationError> {
        if !self.has_changes() {
            return Err(ValidationError::NoChanges);
        }
        if self.questions_locked
            && (self.draft.questions != self.original.questions || self.draft.course_id != self.original.course_id)
        {
            return Err(ValidationError::QuestionsLocked);
        }
        let valid = self.draft.validate()?;
        let unlocked = !self.questions_locked;
        Ok(QuizUpdate {
            quiz_number: Some(valid.quiz_number),
            description: Some(valid.description.clone()),
            due_date: Some(iso(&valid.due_date)),
            status: Some(valid.status),
            total_marks: unlocked.then(|| valid.total_marks()),
            course_id: unlocked.then(|| valid.course_id.clone()),
            course_name: unlocked.then(|| valid.course_name.clone()),
            questions: unlocked.then_some(valid.questions),
        })
    }
}

// --- payloads ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizCreate {
    pub course_id: String,
    pub course_name: String,
    pub teacher_id: String,
    pub tenant_id: String,
    pub quiz_number: u32,
    pub description: String,
    pub due_date: String,
    pub questions: Vec<QuizQuestion>,
    pub total_marks: u32,
    pub ai_generated: bool,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizUpdate {
    pub quiz_number: Option<u32>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<QuizStatus>,
    pub course_id: Option<String>,
    pub course_name: Option<String>,
    pub questions: Option<Vec<QuizQuestion>>,
    pub total_marks: Option<u32>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizListParams {
    pub tenant_id: Option<String>,
    pub teacher_id: Option<String>,
    pub course_id: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct TeacherScope<'a> {
    teacher_id: &'a str,
}

#[derive(Debug, Clone)]
pub struct QuizClient {
    api: ApiClient,
}

impl QuizClient {
    pub fn new(api: ApiClient) -> Self {
        QuizClient { api }
    }

    pub async fn create(&self, quiz: &QuizCreate) -> Result<Quiz, ApiError> {
        let req = self.api.request(Method::POST, &["quizzes"]).json(quiz);
        let created: Quiz = self.api.send_json(req).await?;
        tracing::info!(quiz_id=%created.id, "quiz created");
        Ok(created)
    }

    pub async fn list(&self, params: &QuizListParams) -> Result<Vec<Quiz>, ApiError> {
        let req = self.api.request(Method::GET, &["quizzes"]).query(params);
        self.api.send_json(req).await
    }

    pub async fn get(&self, quiz_id: &str) -> Result<Quiz, ApiError> {
        let req = self.api.request(Method::GET, &["quizzes", quiz_id]);
        self.api.send_json(req).await
    }

    pub async fn update(&self, quiz_id: &str, teacher_id: &str, update: &QuizUpdate) -> Result<Quiz, ApiError> {
        let req = self
            .api
            .request(Method::PATCH, &["quizzes", quiz_id])
            .query(&TeacherScope { teacher_id })
            .json(update);
        let updated: Quiz = self.api.send_json(req).await?;
        tracing::info!(%quiz_id, "quiz updated");
        Ok(updated)
    }

    pub async fn delete(&self, quiz_id: &str, teacher_id: &str) -> Result<(), ApiError> {
        let req = self
            .api
            .request(Method::DELETE, &["quizzes", quiz_id])
            .query(&TeacherScope { teacher_id });
        self.api.send_unit(req).await?;
        tracing::info!(%quiz_id, "quiz deleted");
        Ok(())
    }
}
