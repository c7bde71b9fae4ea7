// Form-level validators for modules and lessons.

use crate::duration;
use crate::error::ValidationError;
use crate::models::{Lesson, LessonType, Module};

pub const MIN_TITLE_LEN: usize = 3;

pub fn check_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < MIN_TITLE_LEN {
        return Err(ValidationError::TitleTooShort { min: MIN_TITLE_LEN });
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDraft {
    pub title: String,
    pub description: String,
}

impl ModuleDraft {
    pub fn new(title: impl Into<String>) -> Self {
        ModuleDraft {
            title: title.into(),
            description: String::new(),
        }
    }

    /// Trimmed title and description, or the first rule broken.
    pub fn validate(&self) -> Result<ModulePatch, ValidationError> {
        check_title(&self.title)?;
        Ok(ModulePatch {
            title: Some(self.title.trim().to_string()),
            description: Some(self.description.trim().to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModulePatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ModulePatch {
    pub fn apply(self, module: &mut Module) {
        if let Some(title) = self.title {
            module.title = title;
        }
        if let Some(description) = self.description {
            module.description = description;
        }
    }
}

/// How a document lesson's content is supplied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentMode {
    #[default]
    Write,
    Upload,
}

/// Editing state of the lesson form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub kind: LessonType,
    pub duration: String,
    pub content: String,
    pub document_mode: DocumentMode,
    pub document_url: String,
    pub quiz_id: String,
}

impl LessonDraft {
    pub fn new(title: impl Into<String>, kind: LessonType) -> Self {
        LessonDraft {
            title: title.into(),
            kind,
            ..Default::default()
        }
    }

    pub fn from_lesson(lesson: &Lesson) -> Self {
        let mut draft = LessonDraft {
            title: lesson.title.clone(),
            kind: lesson.kind,
            duration: lesson.duration.clone().unwrap_or_default(),
            content: lesson.content.clone(),
            ..Default::default()
        };
        match lesson.kind {
            LessonType::Quiz => draft.quiz_id = lesson.content.clone(),
            LessonType::Document if lesson.content.starts_with("http") => {
                draft.document_mode = DocumentMode::Upload;
                draft.document_url = lesson.content.clone();
            }
            _ => {}
        }
        draft
    }

    /// Switching type discards everything typed for the previous type.
    pub fn set_kind(&mut self, kind: LessonType) {
        self.kind = kind;
        self.content.clear();
        self.quiz_id.clear();
        self.document_url.clear();
        self.document_mode = DocumentMode::Write;
    }

    pub fn set_document_mode(&mut self, mode: DocumentMode) {
        self.document_mode = mode;
        self.content.clear();
        self.document_url.clear();
    }

    pub fn validate(&self) -> Result<LessonPatch, ValidationError> {
        check_title(&self.title)?;
        let content = match (self.kind, self.document_mode) {
            (LessonType::Video, _) => required(&self.content, LessonType::Video)?,
            (LessonType::Quiz, _) => {
                if self.quiz_id.is_empty() {
                    return Err(ValidationError::MissingQuizReference);
                }
                self.quiz_id.clone()
            }
            (LessonType::Document, DocumentMode::Write) => required(&self.content, LessonType::Document)?,
            (LessonType::Document, DocumentMode::Upload) => {
                let url = self.document_url.trim();
                if url.is_empty() {
                    return Err(ValidationError::MissingDocumentUrl);
                }
                url.to_string()
            }
        };
        duration::validate_input(&self.duration)?;
        let duration = self.duration.trim();
        Ok(LessonPatch {
            title: Some(self.title.trim().to_string()),
            kind: Some(self.kind),
            duration: Some(Some(duration.to_string()).filter(|d| !d.is_empty())),
            content: Some(content),
        })
    }
}

fn required(content: &str, kind: LessonType) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingContent(kind));
    }
    Ok(trimmed.to_string())
}

/// Fields to merge into a lesson; `None` leaves the field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub kind: Option<LessonType>,
    pub duration: Option<Option<String>>,
    pub content: Option<String>,
}

impl LessonPatch {
    pub fn apply(self, lesson: &mut Lesson) {
        if let Some(title) = self.title {
            lesson.title = title;
        }
        if let Some(kind) = self.kind {
            lesson.kind = kind;
        }
        if let Some(duration) = self.duration {
            lesson.duration = duration;
        }
        if let Some(content) = self.content {
            lesson.content = content;
        }
    }
}

/// Rules a lesson must satisfy at rest, whatever form produced it.
pub fn check_lesson(lesson: &Lesson) -> Result<(), ValidationError> {
    check_title(&lesson.title)?;
    if let Some(d) = &lesson.duration {
        duration::validate_input(d)?;
    }
    if lesson.content.trim().is_empty() {
        return Err(match lesson.kind {
            LessonType::Quiz => ValidationError::MissingQuizReference,
            kind => ValidationError::MissingContent(kind),
        });
    }
    Ok(())
}
