//! Quiz submissions, teacher-side summaries and the student quiz board.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiClient;
use crate::error::{ApiError, ValidationError};
use crate::quiz::{Quiz, QuizClient, QuizListParams};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerItem {
    pub question_index: usize,
    pub selected: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmissionCreate {
    pub student_id: String,
    pub quiz_id: String,
    pub course_id: String,
    pub tenant_id: String,
    pub answers: Vec<AnswerItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "SubmissionWire")]
pub struct QuizSubmission {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub course_id: String,
    pub answers: Vec<AnswerItem>,
    pub obtained_marks: u32,
    pub total_marks: u32,
    pub percentage: f64,
    pub submitted_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    student_id: String,
    quiz_id: String,
    course_id: Option<String>,
    #[serde(default)]
    answers: Vec<AnswerItem>,
    obtained_marks: Option<u32>,
    total_marks: Option<u32>,
    percentage: Option<f64>,
    submitted_at: Option<String>,
}

impl TryFrom<SubmissionWire> for QuizSubmission {
    type Error = String;

    fn try_from(w: SubmissionWire) -> Result<Self, Self::Error> {
        Ok(QuizSubmission {
            id: w.mongo_id.or(w.id).filter(|id| !id.is_empty()).ok_or("submission without id")?,
            student_id: w.student_id,
            quiz_id: w.quiz_id,
            course_id: w.course_id.unwrap_or_default(),
            answers: w.answers,
            obtained_marks: w.obtained_marks.unwrap_or(0),
            total_marks: w.total_marks.unwrap_or(0),
            percentage: w.percentage.unwrap_or(0.0),
            submitted_at: w.submitted_at,
        })
    }
}

impl QuizSubmission {
    pub fn selected(&self, question_index: usize) -> Option<&str> {
        self.answers
            .iter()
            .find(|a| a.question_index == question_index)
            .map(|a| a.selected.as_str())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopScorer {
    pub student_id: String,
    #[serde(default)]
    pub student_name: Option<String>,
    pub obtained_marks: u32,
    pub percentage: f64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub quiz_id: String,
    pub total_submissions: u32,
    pub average_percentage: f64,
    #[serde(default)]
    pub highest_percentage: f64,
    #[serde(default)]
    pub lowest_percentage: f64,
    #[serde(default)]
    pub top_scorers: Vec<TopScorer>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalytics {
    pub student_id: String,
    pub total_quizzes: u32,
    pub average_percentage: f64,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub recent_attempts: Vec<QuizSubmission>,
}

#[derive(Serialize)]
struct Sort<'a> {
    sort: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SubmissionClient {
    api: ApiClient,
}

impl SubmissionClient {
    pub fn new(api: ApiClient) -> Self {
        SubmissionClient { api }
    }

    /// Submits and auto-grades.
    pub async fn submit(&self, submission: &QuizSubmissionCreate) -> Result<QuizSubmission, ApiError> {
        let req = self.api.request(Method::POST, &["quiz-submissions"]).json(submission);
        self.api.send_json(req).await
    }

    pub async fn by_quiz(&self, quiz_id: &str, sort: Option<&str>) -> Result<Vec<QuizSubmission>, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["quiz-submissions", "quiz", quiz_id])
            .query(&Sort { sort });
        self.api.send_json(req).await
    }

    pub async fn by_student(&self, student_id: &str, sort: Option<&str>) -> Result<Vec<QuizSubmission>, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["quiz-submissions", "student", student_id])
            .query(&Sort { sort });
        self.api.send_json(req).await
    }

    pub async fn delete(&self, submission_id: &str) -> Result<(), ApiError> {
        let req = self.api.request(Method::DELETE, &["quiz-submissions", submission_id]);
        self.api.send_unit(req).await
    }

    pub async fn summary(&self, quiz_id: &str, top_n: u32) -> Result<QuizSummary, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["quiz-submissions", "summary", "quiz", quiz_id])
            .query(&[("top_n", top_n)]);
        self.api.send_json(req).await
    }

    pub async fn student_analytics(&self, student_id: &str, recent: u32) -> Result<StudentAnalytics, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["quiz-submissions", "analytics", "student", student_id])
            .query(&[("recent", recent)]);
        self.api.send_json(req).await
    }
}

// --- student board ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueFilter {
    Upcoming,
    DuePassed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

pub fn score_band(percentage: f64) -> ScoreBand {
    if percentage >= 70.0 {
        ScoreBand::High
    } else if percentage >= 50.0 {
        ScoreBand::Medium
    } else {
        ScoreBand::Low
    }
}

/// A quiz as the student sees it, merged with their submission if any.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizCard {
    pub quiz: Quiz,
    pub status: AttemptStatus,
    pub submission_id: Option<String>,
    pub score: u32,
    pub percentage: f64,
    /// Selected option per question; empty when not answered.
    pub selected: Vec<String>,
}

impl QuizCard {
    pub fn is_due_passed(&self, now: DateTime<Utc>) -> bool {
        self.quiz.due_date < now
    }

    fn complete(&mut self, submission: &QuizSubmission) {
        self.status = AttemptStatus::Completed;
        self.submission_id = Some(submission.id.clone());
        self.score = submission.obtained_marks;
        self.percentage = submission.percentage;
        self.selected = (0..self.quiz.questions.len())
            .map(|i| submission.selected(i).unwrap_or_default().to_string())
            .collect();
    }
}

pub fn build_cards(quizzes: Vec<Quiz>, submissions: &[QuizSubmission]) -> Vec<QuizCard> {
    quizzes
        .into_iter()
        .map(|quiz| {
            let mut card = QuizCard {
                selected: vec![String::new(); quiz.questions.len()],
                quiz,
                status: AttemptStatus::Pending,
                submission_id: None,
                score: 0,
                percentage: 0.0,
            };
            if let Some(s) = submissions.iter().find(|s| s.quiz_id == card.quiz.id) {
                card.complete(s);
            }
            card
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub course: Option<String>,
    pub status: Option<AttemptStatus>,
    pub due: Option<DueFilter>,
    pub search: String,
}

pub fn filter_cards<'a>(cards: &'a [QuizCard], filter: &CardFilter, now: DateTime<Utc>) -> Vec<&'a QuizCard> {
    let search = filter.search.trim().to_lowercase();
    cards
        .iter()
        .filter(|c| filter.course.as_ref().map_or(true, |course| c.quiz.course_name == *course))
        .filter(|c| filter.status.map_or(true, |s| c.status == s))
        .filter(|c| match filter.due {
            None => true,
            // upcoming only lists what can still be attempted
            Some(DueFilter::Upcoming) => !c.is_due_passed(now) && c.status != AttemptStatus::Completed,
            Some(DueFilter::DuePassed) => c.is_due_passed(now),
        })
        .filter(|c| {
            search.is_empty()
                || c.quiz.display_number().contains(&search)
                || c.quiz.description.to_lowercase().contains(&search)
                || c.quiz.course_name.to_lowercase().contains(&search)
        })
        .collect()
}

#[derive(Error, Debug)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub struct StudentQuizBoard {
    quizzes: QuizClient,
    submissions: SubmissionClient,
    student_id: String,
    tenant_id: String,
    cards: Vec<QuizCard>,
}

impl StudentQuizBoard {
    pub fn new(api: ApiClient, student_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        StudentQuizBoard {
            quizzes: QuizClient::new(api.clone()),
            submissions: SubmissionClient::new(api),
            student_id: student_id.into(),
            tenant_id: tenant_id.into(),
            cards: Vec::new(),
        }
    }

    pub fn cards(&self) -> &[QuizCard] {
        &self.cards
    }

    /// Fetches quizzes and the student's submissions concurrently. Quizzes
    /// still show, all pending, when submissions fail to load.
    pub async fn load(&mut self) -> Result<&[QuizCard], ApiError> {
        let params = QuizListParams {
            tenant_id: Some(self.tenant_id.clone()),
            ..Default::default()
        };
        let (quizzes, submissions) = tokio::join!(
            self.quizzes.list(&params),
            self.submissions.by_student(&self.student_id, None)
        );
        let quizzes = quizzes?;
        let submissions = submissions.unwrap_or_else(|e| {
            tracing::warn!(student_id=%self.student_id, error=%e, "failed to load submissions");
            Vec::new()
        });
        self.cards = build_cards(quizzes, &submissions);
        tracing::info!(quizzes=self.cards.len(), submissions=submissions.len(), "quiz board loaded");
        Ok(&self.cards)
    }

    /// Distinct course names, first-seen order.
    pub fn course_options(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for c in &self.cards {
            if !names.contains(&c.quiz.course_name.as_str()) {
                names.push(&c.quiz.course_name);
            }
        }
        names
    }

    pub fn filtered(&self, filter: &CardFilter, now: DateTime<Utc>) -> Vec<&QuizCard> {
        filter_cards(&self.cards, filter, now)
    }

    fn card(&self, quiz_id: &str) -> Result<&QuizCard, ValidationError> {
        self.cards
            .iter()
            .find(|c| c.quiz.id == quiz_id)
            .ok_or_else(|| ValidationError::UnknownQuiz(quiz_id.to_string()))
    }

    /// Completed quizzes open read-only; past-due pending ones do not open.
    pub fn open(&self, quiz_id: &str, now: DateTime<Utc>) -> Result<&QuizCard, ValidationError> {
        let card = self.card(quiz_id)?;
        if card.status == AttemptStatus::Pending && card.is_due_passed(now) {
            return Err(ValidationError::DuePassed);
        }
        Ok(card)
    }

    /// `selected[i]` is the chosen option text for question `i`.
    pub async fn submit(
        &mut self,
        quiz_id: &str,
        selected: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<QuizSubmission, BoardError> {
        let course_id = self.open(quiz_id, now)?.quiz.course_id.clone();
        let payload = QuizSubmissionCreate {
            student_id: self.student_id.clone(),
            quiz_id: quiz_id.to_string(),
            course_id,
            tenant_id: self.tenant_id.clone(),
            answers: selected
                .into_iter()
                .enumerate()
                .map(|(question_index, selected)| AnswerItem { question_index, selected })
                .collect(),
        };
        match self.submissions.submit(&payload).await {
            Ok(submission) => {
                if let Some(card) = self.cards.iter_mut().find(|c| c.quiz.id == quiz_id) {
                    card.complete(&submission);
                }
                tracing::info!(%quiz_id, score=submission.obtained_marks, percentage=submission.percentage, "quiz submitted");
                Ok(submission)
            }
            Err(e) if e.is_duplicate_submission() => {
                tracing::warn!(%quiz_id, "already submitted, reloading board");
                if let Err(reload) = self.load().await {
                    tracing::error!(error=%reload, "failed to reload quiz board");
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
