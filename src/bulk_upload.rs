//! CSV import of modules and lessons.

use thiserror::Error;

use crate::ids::generate_id;
use crate::models::{Lesson, LessonType, Module};

pub const TEMPLATE: &str = "\
Module Title,Module Description,Lesson Title,Lesson Type,Lesson Duration,Lesson Content
Introduction to AI,Learn the basics of AI,What is Artificial Intelligence?,video,10:30,https://example.com/video1.mp4
Introduction to AI,Learn the basics of AI,History of AI,document,,This is a comprehensive guide...
Introduction to AI,Learn the basics of AI,AI Quiz,quiz,,quiz_id_123
Machine Learning Basics,Understanding ML fundamentals,Types of Machine Learning,video,15:45,https://example.com/video2.mp4
Machine Learning Basics,Understanding ML fundamentals,Supervised Learning Deep Dive,document,,Content about supervised learning...
";

pub const TEMPLATE_FILE_NAME: &str = "course_bulk_upload_template.csv";

/// Rows are numbered from 1, the header being row 1.
#[derive(Error, Debug)]
pub enum BulkUploadError {
    #[error("CSV must have at least a header row and one data row")]
    TooFewRows,
    #[error("row {row}: insufficient columns, expected at least 4")]
    InsufficientColumns { row: u64 },
    #[error("row {row}: module title and lesson title are required")]
    MissingTitle { row: u64 },
    #[error("row {row}: invalid lesson type {value:?}, must be video, document, or quiz")]
    InvalidLessonType { row: u64, value: String },
    #[error("no valid data found in CSV")]
    NoData,
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLesson {
    pub title: String,
    pub kind: LessonType,
    pub duration: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedModule {
    pub title: String,
    pub description: String,
    pub lessons: Vec<ParsedLesson>,
}

/// Groups rows by module title, keeping first-seen order.
pub fn parse(input: &str) -> Result<Vec<ParsedModule>, BulkUploadError> {
    let input = input.trim();
    if input.lines().count() < 2 {
        return Err(BulkUploadError::TooFewRows);
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut modules: Vec<ParsedModule> = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        if i == 0 || record.iter().all(str::is_empty) {
            continue;
        }
        let row = record.position().map(|p| p.line()).unwrap_or(i as u64 + 1);
        if record.len() < 4 {
            return Err(BulkUploadError::InsufficientColumns { row });
        }
        let field = |n: usize| record.get(n).unwrap_or_default();
        let (module_title, lesson_title) = (field(0), field(2));
        if module_title.is_empty() || lesson_title.is_empty() {
            return Err(BulkUploadError::MissingTitle { row });
        }
        let kind = match field(3) {
            "" => LessonType::Video,
            raw => LessonType::parse(&raw.to_lowercase()).ok_or_else(|| BulkUploadError::InvalidLessonType {
                row,
                value: raw.to_string(),
            })?,
        };
        let lesson = ParsedLesson {
            title: lesson_title.to_string(),
            kind,
            duration: Some(field(4).to_string()).filter(|d| !d.is_empty()),
            content: field(5).to_string(),
        };
        match modules.iter_mut().find(|m| m.title == module_title) {
            Some(m) => m.lessons.push(lesson),
            None => modules.push(ParsedModule {
                title: module_title.to_string(),
                description: field(1).to_string(),
                lessons: vec![lesson],
            }),
        }
    }
    if modules.is_empty() {
        return Err(BulkUploadError::NoData);
    }
    Ok(modules)
}

/// Materializes parsed modules with fresh ids, numbering from `first_order`.
pub fn into_modules(parsed: Vec<ParsedModule>, first_order: usize) -> Vec<Module> {
    parsed
        .into_iter()
        .enumerate()
        .map(|(i, pm)| Module {
            id: generate_id(),
            title: pm.title,
            description: pm.description,
            order: first_order + i,
            lessons: pm
                .lessons
                .into_iter()
                .enumerate()
                .map(|(j, pl)| Lesson {
                    id: generate_id(),
                    title: pl.title,
                    kind: pl.kind,
                    duration: pl.duration,
                    content: pl.content,
                    order: j,
                })
                .collect(),
            is_expanded: true,
        })
        .collect()
}
