use http::StatusCode;
use thiserror::Error;

use crate::bulk_upload::BulkUploadError;
use crate::models::LessonType;

/// Rejections raised locally, before anything is sent to the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must be at least {min} characters")]
    TitleTooShort { min: usize },
    #[error("duration {0:?} must be in MM:SS format")]
    MalformedDuration(String),
    #[error("{0} lesson requires content")]
    MissingContent(LessonType),
    #[error("document lesson requires a URL in upload mode")]
    MissingDocumentUrl,
    #[error("quiz lesson requires a selected quiz")]
    MissingQuizReference,
    #[error("module {0} not found")]
    UnknownModule(String),
    #[error("lesson {0} not found")]
    UnknownLesson(String),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
    #[error("unknown level {0:?}")]
    UnknownLevel(String),
    #[error("student {0} not found")]
    UnknownStudent(String),
    #[error("index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("reorder must list every existing id exactly once")]
    NotAPermutation,
    #[error("course must have at least one module to publish")]
    NoModules,
    #[error("course must have at least one lesson to publish")]
    NoLessons,
    #[error("course is already {0}")]
    AlreadyInState(crate::models::CourseStatus),
    #[error("quiz number must be a positive integer")]
    InvalidQuizNumber,
    #[error("please select a course")]
    MissingCourse,
    #[error("due date is required")]
    MissingDueDate,
    #[error("quiz must have at least one question")]
    NoQuestions,
    #[error("question {question} has an empty statement")]
    EmptyStatement { question: usize },
    #[error("question {question} must have between 2 and 4 options, found {count}")]
    OptionCount { question: usize, count: usize },
    #[error("question {question} option {option} is empty")]
    EmptyOption { question: usize, option: usize },
    #[error("question {question} has no valid correct answer")]
    InvalidAnswer { question: usize },
    #[error("questions and course are locked once students have submitted")]
    QuestionsLocked,
    #[error("no changes detected")]
    NoChanges,
    #[error("due date has passed, this quiz can no longer be attempted")]
    DuePassed,
    #[error("quiz {0} not found")]
    UnknownQuiz(String),
}

/// Failures of a backend round-trip.
#[derive(Error, Debug)]
pub enum ApiError {
    /// 401/403. The session has already been cleared when this is returned.
    #[error("session rejected by server ({status})")]
    Unauthorized { status: StatusCode },
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub const DUPLICATE_SUBMISSION_DETAIL: &str = "Student already submitted this quiz.";

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { status } | ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            ApiError::Decode(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn is_duplicate_submission(&self) -> bool {
        matches!(self, ApiError::Rejected { message, .. } if message == DUPLICATE_SUBMISSION_DETAIL)
    }
}

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    BulkUpload(#[from] BulkUploadError),
    #[error("no course loaded")]
    NoCourseLoaded,
}

impl BuilderError {
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            BuilderError::Validation(v) => Some(v),
            _ => None,
        }
    }
}
