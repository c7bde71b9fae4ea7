use serde::{Deserialize, Serialize};
use std::fmt;

pub const CATEGORY_OPTIONS: [&str; 10] = [
    "General",
    "Computer Science",
    "Mathematics",
    "Science",
    "Business",
    "Arts",
    "Language",
    "Health",
    "Engineering",
    "Other",
];

pub const LEVEL_OPTIONS: [&str; 3] = ["Beginner", "Intermediate", "Advanced"];

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CourseStatus::Draft => f.write_str("draft"),
            CourseStatus::Published => f.write_str("published"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    #[default]
    Video,
    Document,
    Quiz,
}

impl LessonType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "video" => Some(LessonType::Video),
            "document" => Some(LessonType::Document),
            "quiz" => Some(LessonType::Quiz),
            _ => None,
        }
    }
}

impl fmt::Display for LessonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonType::Video => f.write_str("video"),
            LessonType::Document => f.write_str("document"),
            LessonType::Quiz => f.write_str("quiz"),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    /// `MM:SS` or `HH:MM:SS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// URL for video, text or URL for document, quiz id for quiz.
    pub content: String,
    pub order: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: usize,
    pub lessons: Vec<Lesson>,
    pub is_expanded: bool,
}

/// The course aggregate: a course plus its full module/lesson tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "CourseWire")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub status: CourseStatus,
    pub is_public: bool,
    pub modules: Vec<Module>,
    pub enrolled_students: u32,
    pub total_lessons: usize,
    pub total_duration: String,
    pub thumbnail_url: String,
    pub teacher_id: String,
    pub tenant_id: String,
    pub course_code: Option<String>,
    pub is_free: bool,
    pub price: f64,
    pub currency: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Course {
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == module_id)
    }

    pub fn module_mut(&mut self, module_id: &str) -> Option<&mut Module> {
        self.modules.iter_mut().find(|m| m.id == module_id)
    }

    /// Recompute `total_lessons` and `total_duration` from the module tree.
    pub fn refresh_totals(&mut self) {
        self.total_lessons = crate::duration::total_lessons(&self.modules);
        self.total_duration = crate::duration::calculate_total_duration(&self.modules);
    }
}

// --- wire shapes ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LessonWire {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "type")]
    kind: Option<LessonType>,
    duration: Option<String>,
    content: Option<String>,
    order: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleWire {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    order: Option<usize>,
    lessons: Option<Vec<LessonWire>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    level: Option<String>,
    status: Option<CourseStatus>,
    is_public: Option<bool>,
    modules: Option<Vec<ModuleWire>>,
    enrolled_students: Option<u32>,
    thumbnail_url: Option<String>,
    teacher_id: Option<String>,
    tenant_id: Option<String>,
    course_code: Option<String>,
    is_free: Option<bool>,
    price: Option<f64>,
    currency: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn sort_by_order<T>(mut items: Vec<(usize, T)>) -> Vec<T> {
    items.sort_by_key(|(order, _)| *order);
    items.into_iter().map(|(_, item)| item).collect()
}

impl TryFrom<ModuleWire> for Module {
    type Error = String;

    fn try_from(w: ModuleWire) -> Result<Self, Self::Error> {
        let id = non_empty(w.id).ok_or("module without id")?;
        let lessons = w
            .lessons
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, l)| {
                let lesson_id = non_empty(l.id).ok_or_else(|| format!("lesson without id in module {id}"))?;
                let lesson = Lesson {
                    id: lesson_id,
                    title: non_empty(l.title).unwrap_or_else(|| format!("Lesson {}", idx + 1)),
                    kind: l.kind.unwrap_or_default(),
                    duration: non_empty(l.duration),
                    content: l.content.unwrap_or_default(),
                    order: l.order.unwrap_or(idx),
                };
                Ok((lesson.order, lesson))
            })
            .collect::<Result<Vec<_>, String>>()?;
        let mut lessons = sort_by_order(lessons);
        crate::ordering::renumber(&mut lessons);
        Ok(Module {
            id,
            title: non_empty(w.title).unwrap_or_default(),
            description: w.description.unwrap_or_default(),
            order: w.order.unwrap_or(usize::MAX),
            lessons,
            is_expanded: false,
        })
    }
}

impl TryFrom<CourseWire> for Course {
    type Error = String;

    fn try_from(w: CourseWire) -> Result<Self, Self::Error> {
        let id = non_empty(w.mongo_id)
            .or(non_empty(w.id))
            .ok_or("course without id")?;
        let modules = w
            .modules
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(idx, m)| {
                let mut module = Module::try_from(m)?;
                if module.order == usize::MAX {
                    module.order = idx;
                }
                if module.title.is_empty() {
                    module.title = format!("Module {}", idx + 1);
                }
                Ok((module.order, module))
            })
            .collect::<Result<Vec<_>, String>>()?;
        let mut modules = sort_by_order(modules);
        crate::ordering::renumber(&mut modules);
        if let Some(first) = modules.first_mut() {
            first.is_expanded = true;
        }

        let mut course = Course {
            id,
            title: w.title.unwrap_or_default(),
            description: w.description.unwrap_or_default(),
            category: non_empty(w.category).unwrap_or_else(|| "General".into()),
            level: non_empty(w.level).unwrap_or_else(|| "Beginner".into()),
            status: w.status.unwrap_or_default(),
            is_public: w.is_public.unwrap_or(true),
            modules,
            enrolled_students: w.enrolled_students.unwrap_or(0),
            total_lessons: 0,
            total_duration: String::new(),
            thumbnail_url: w.thumbnail_url.unwrap_or_default(),
            teacher_id: w.teacher_id.unwrap_or_default(),
            tenant_id: w.tenant_id.unwrap_or_default(),
            course_code: non_empty(w.course_code),
            is_free: w.is_free.unwrap_or(true),
            price: w.price.unwrap_or(0.0),
            currency: non_empty(w.currency).unwrap_or_else(|| DEFAULT_CURRENCY.into()),
            created_at: w.created_at,
            updated_at: w.updated_at,
        };
        course.refresh_totals();
        Ok(course)
    }
}

// --- outgoing payloads ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LessonPayload {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    pub duration: String,
    pub content: String,
    pub order: usize,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModulePayload {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: usize,
    pub lessons: Vec<LessonPayload>,
}

impl From<&Module> for ModulePayload {
    fn from(m: &Module) -> Self {
        ModulePayload {
            id: m.id.clone(),
            title: m.title.clone(),
            description: m.description.clone(),
            order: m.order,
            lessons: m
                .lessons
                .iter()
                .map(|l| LessonPayload {
                    id: l.id.clone(),
                    title: l.title.clone(),
                    kind: l.kind,
                    duration: l.duration.clone().unwrap_or_default(),
                    content: l.content.clone(),
                    order: l.order,
                })
                .collect(),
        }
    }
}

/// Body of `PUT /courses/{id}`. UI-only state never leaves the client.
#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub thumbnail_url: Option<String>,
    pub course_code: Option<String>,
    pub modules: Vec<ModulePayload>,
    pub is_public: bool,
    pub is_free: bool,
    pub price: f64,
    pub currency: String,
}

impl From<&Course> for CourseUpdate {
    fn from(c: &Course) -> Self {
        CourseUpdate {
            title: c.title.clone(),
            description: c.description.clone(),
            category: c.category.clone(),
            level: c.level.clone(),
            thumbnail_url: Some(c.thumbnail_url.clone()).filter(|t| !t.is_empty()),
            course_code: c.course_code.clone(),
            modules: c.modules.iter().map(ModulePayload::from).collect(),
            is_public: c.is_public,
            is_free: c.is_free,
            price: if c.is_free { 0.0 } else { c.price },
            currency: if c.currency.is_empty() {
                DEFAULT_CURRENCY.into()
            } else {
                c.currency.clone()
            },
        }
    }
}

/// Shallow patch applied over the course info fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseInfoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub level: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CourseCreate {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub level: String,
    pub status: Option<CourseStatus>,
    pub course_code: Option<String>,
    pub teacher_id: String,
    pub tenant_id: String,
    pub thumbnail_url: Option<String>,
    pub modules: Option<Vec<ModulePayload>>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct CourseFilters {
    pub search: Option<String>,
    pub status: Option<CourseStatus>,
    pub category: Option<String>,
    pub teacher_id: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

// --- enrolled students ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", try_from = "StudentWire")]
pub struct EnrolledStudent {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub enrolled_at: Option<String>,
    /// 0-100
    pub progress: f64,
    pub lessons_completed: u32,
    pub last_accessed: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudentWire {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
    email: Option<String>,
    enrolled_at: Option<String>,
    created_at: Option<String>,
    progress: Option<f64>,
    lessons_completed: Option<u32>,
    last_accessed: Option<String>,
    last_active: Option<String>,
}

impl TryFrom<StudentWire> for EnrolledStudent {
    type Error = String;

    fn try_from(w: StudentWire) -> Result<Self, Self::Error> {
        Ok(EnrolledStudent {
            id: non_empty(w.mongo_id).or(non_empty(w.id)).ok_or("student without id")?,
            full_name: non_empty(w.full_name)
                .or(non_empty(w.name))
                .unwrap_or_else(|| "Unknown".into()),
            email: w.email.unwrap_or_default(),
            enrolled_at: w.enrolled_at.or(w.created_at),
            progress: w.progress.unwrap_or(0.0),
            lessons_completed: w.lessons_completed.unwrap_or(0),
            last_accessed: w.last_accessed.or(w.last_active),
        })
    }
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO strings in UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|n| n.and_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp {raw:?}")))
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.to_rfc3339())
    }
}
