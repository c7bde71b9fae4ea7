//! The course builder: owns one course draft, applies structural edits
//! through the ordering and duration engines, and persists through a
//! [`CourseGateway`]. A failed write discards local state and reloads the
//! aggregate from the backend.

use crate::bulk_upload;
use crate::confirm::{Confirm, Prompt};
use crate::error::{ApiError, BuilderError, ValidationError};
use crate::gateway::CourseGateway;
use crate::ids::{generate_course_code, generate_id};
use crate::lifecycle;
use crate::models::{
    Course, CourseInfoPatch, CourseStatus, CourseUpdate, EnrolledStudent, Lesson, Module, CATEGORY_OPTIONS, LEVEL_OPTIONS,
};
use crate::ordering;
use crate::validation::{check_lesson, check_title, LessonDraft, LessonPatch, ModuleDraft, ModulePatch};

pub struct CourseBuilder<G> {
    gateway: G,
    course_id: String,
    tenant_id: String,
    course: Option<Course>,
    /// Last state the backend acknowledged.
    committed: Option<Course>,
    students: Vec<EnrolledStudent>,
}

impl<G: CourseGateway> CourseBuilder<G> {
    pub fn new(gateway: G, course_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        CourseBuilder {
            gateway,
            course_id: course_id.into(),
            tenant_id: tenant_id.into(),
            course: None,
            committed: None,
            students: Vec::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn students(&self) -> &[EnrolledStudent] {
        &self.students
    }

    pub async fn load(&mut self) -> Result<&Course, BuilderError> {
        let course = self.gateway.get(&self.course_id, &self.tenant_id).await.map_err(|e| {
            tracing::error!(course_id=%self.course_id, error=%e, "failed to load course");
            e
        })?;
        tracing::info!(course_id=%course.id, modules=course.modules.len(), "course loaded");
        self.committed = Some(course.clone());
        Ok(self.course.insert(course))
    }

    fn loaded(&self) -> Result<&Course, BuilderError> {
        self.course.as_ref().ok_or(BuilderError::NoCourseLoaded)
    }

    fn draft(&mut self) -> Result<&mut Course, BuilderError> {
        self.course.as_mut().ok_or(BuilderError::NoCourseLoaded)
    }

    fn module_mut(&mut self, module_id: &str) -> Result<&mut Module, BuilderError> {
        self.draft()?
            .module_mut(module_id)
            .ok_or_else(|| ValidationError::UnknownModule(module_id.to_string()).into())
    }

    // --- UI state (never persisted) ---

    /// Flips `is_expanded` and returns the new value.
    pub fn toggle_module(&mut self, module_id: &str) -> Result<bool, BuilderError> {
        let module = self.module_mut(module_id)?;
        module.is_expanded = !module.is_expanded;
        Ok(module.is_expanded)
    }

    pub fn collapse_all(&mut self) {
        if let Some(course) = self.course.as_mut() {
            for m in &mut course.modules {
                m.is_expanded = false;
            }
        }
    }

    // --- modules ---

    /// Appends a module and saves. Returns the new module's local id.
    pub async fn add_module(&mut self, draft: &ModuleDraft) -> Result<String, BuilderError> {
        let patch = draft.validate()?;
        let id = generate_id();
        let module = Module {
            id: id.clone(),
            title: patch.title.unwrap_or_default(),
            description: patch.description.unwrap_or_default(),
            order: 0,
            lessons: Vec::new(),
            is_expanded: true,
        };
        ordering::append(&mut self.draft()?.modules, module);
        self.save().await?;
        Ok(id)
    }

    pub async fn edit_module(&mut self, module_id: &str, mut patch: ModulePatch) -> Result<(), BuilderError> {
        if let Some(title) = patch.title.as_mut() {
            check_title(title)?;
            *title = title.trim().to_string();
        }
        patch.apply(self.module_mut(module_id)?);
        self.save().await
    }

    /// Returns `false` when the user declines.
    pub async fn delete_module(&mut self, module_id: &str, confirm: &mut impl Confirm) -> Result<bool, BuilderError> {
        let title = self
            .loaded()?
            .module(module_id)
            .map(|m| m.title.clone())
            .ok_or_else(|| ValidationError::UnknownModule(module_id.to_string()))?;
        if !confirm.confirm(&Prompt::delete(Some(&title))) {
            return Ok(false);
        }
        ordering::remove(&mut self.draft()?.modules, module_id);
        self.save().await?;
        Ok(true)
    }

    pub async fn move_module(&mut self, from: usize, to: usize) -> Result<bool, BuilderError> {
        let course = self.draft()?;
        if !ordering::move_item(&mut course.modules, from, to)? {
            return Ok(false);
        }
        self.persist_module_order().await?;
        Ok(true)
    }

    /// Applies a full module order given as ids.
    pub async fn reorder_modules(&mut self, module_ids: &[String]) -> Result<bool, BuilderError> {
        let course = self.draft()?;
        if !ordering::apply_id_order(&mut course.modules, module_ids)? {
            return Ok(false);
        }
        self.persist_module_order().await?;
        Ok(true)
    }

    async fn persist_module_order(&mut self) -> Result<(), BuilderError> {
        let course = self.draft()?;
        course.refresh_totals();
        let ids = ordering::ids(&course.modules);
        let result = self
            .gateway
            .reorder_modules(&self.course_id, &self.tenant_id, &ids)
            .await;
        self.settle(result.map(drop), "module order saved").await
    }

    // --- lessons ---

    pub async fn add_lesson(&mut self, module_id: &str, draft: &LessonDraft) -> Result<String, BuilderError> {
        let patch = draft.validate()?;
        let id = generate_id();
        let mut lesson = Lesson {
            id: id.clone(),
            title: String::new(),
            kind: draft.kind,
            duration: None,
            content: String::new(),
            order: 0,
        };
        patch.apply(&mut lesson);
        ordering::append(&mut self.module_mut(module_id)?.lessons, lesson);
        self.save().await?;
        Ok(id)
    }

    /// Merges `patch` into the lesson; the merged lesson must still be valid.
    pub async fn edit_lesson(&mut self, module_id: &str, lesson_id: &str, patch: LessonPatch) -> Result<(), BuilderError> {
        let module = self.module_mut(module_id)?;
        let lesson = module
            .lessons
            .iter_mut()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| ValidationError::UnknownLesson(lesson_id.to_string()))?;
        let mut merged = lesson.clone();
        patch.apply(&mut merged);
        check_lesson(&merged)?;
        *lesson = merged;
        self.save().await
    }

    pub async fn delete_lesson(
        &mut self,
        module_id: &str,
        lesson_id: &str,
        confirm: &mut impl Confirm,
    ) -> Result<bool, BuilderError> {
        let module = self
            .loaded()?
            .module(module_id)
            .ok_or_else(|| ValidationError::UnknownModule(module_id.to_string()))?;
        let title = module
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .map(|l| l.title.clone())
            .ok_or_else(|| ValidationError::UnknownLesson(lesson_id.to_string()))?;
        if !confirm.confirm(&Prompt::delete(Some(&title))) {
            return Ok(false);
        }
        ordering::remove(&mut self.module_mut(module_id)?.lessons, lesson_id);
        self.save().await?;
        Ok(true)
    }

    pub async fn move_lesson(&mut self, module_id: &str, from: usize, to: usize) -> Result<bool, BuilderError> {
        let module = self.module_mut(module_id)?;
        if !ordering::move_item(&mut module.lessons, from, to)? {
            return Ok(false);
        }
        self.persist_lesson_order(module_id).await?;
        Ok(true)
    }

    pub async fn reorder_lessons(&mut self, module_id: &str, lesson_ids: &[String]) -> Result<bool, BuilderError> {
        let module = self.module_mut(module_id)?;
        if !ordering::apply_id_order(&mut module.lessons, lesson_ids)? {
            return Ok(false);
        }
        self.persist_lesson_order(module_id).await?;
        Ok(true)
    }

    async fn persist_lesson_order(&mut self, module_id: &str) -> Result<(), BuilderError> {
        let course = self.draft()?;
        course.refresh_totals();
        let ids = course.module(module_id).map(|m| ordering::ids(&m.lessons)).unwrap_or_default();
        let result = self
            .gateway
            .reorder_lessons(&self.course_id, &self.tenant_id, module_id, &ids)
            .await;
        self.settle(result.map(drop), "lesson order saved").await
    }

    // --- bulk upload ---

    /// Appends every module in `csv` after the existing ones and saves.
    /// Returns the number of modules imported.
    pub async fn import_csv(&mut self, csv: &str) -> Result<usize, BuilderError> {
        let parsed = bulk_upload::parse(csv)?;
        let course = self.draft()?;
        let imported = bulk_upload::into_modules(parsed, course.modules.len());
        let count = imported.len();
        course.modules.extend(imported);
        self.save().await?;
        tracing::info!(count, "modules imported");
        Ok(count)
    }

    // --- course settings ---

    pub async fn set_free(&mut self, is_free: bool) -> Result<(), BuilderError> {
        let course = self.draft()?;
        course.is_free = is_free;
        if is_free {
            course.price = 0.0;
        }
        self.save().await
    }

    /// Ignored while the course is free. Returns whether the price changed.
    pub async fn set_price(&mut self, price: f64) -> Result<bool, BuilderError> {
        let course = self.draft()?;
        if course.is_free {
            course.price = 0.0;
            return Ok(false);
        }
        course.price = price;
        self.save().await?;
        Ok(true)
    }

    pub async fn toggle_visibility(&mut self, confirm: &mut impl Confirm) -> Result<bool, BuilderError> {
        let make_public = !self.loaded()?.is_public;
        if !confirm.confirm(&lifecycle::visibility_prompt(make_public)) {
            return Ok(false);
        }
        self.draft()?.is_public = make_public;
        self.save().await?;
        Ok(true)
    }

    /// Category and level must be one of the catalog options.
    pub async fn update_info(&mut self, patch: CourseInfoPatch) -> Result<(), BuilderError> {
        if let Some(title) = &patch.title {
            check_title(title)?;
        }
        if let Some(category) = patch.category.as_deref().filter(|c| !CATEGORY_OPTIONS.contains(c)) {
            return Err(ValidationError::UnknownCategory(category.to_string()).into());
        }
        if let Some(level) = patch.level.as_deref().filter(|l| !LEVEL_OPTIONS.contains(l)) {
            return Err(ValidationError::UnknownLevel(level.to_string()).into());
        }
        let course = self.draft()?;
        if let Some(title) = patch.title {
            course.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            course.description = description;
        }
        if let Some(category) = patch.category {
            course.category = category;
        }
        if let Some(level) = patch.level {
            course.level = level;
        }
        if let Some(thumbnail_url) = patch.thumbnail_url {
            course.thumbnail_url = thumbnail_url;
        }
        self.save().await
    }

    // --- lifecycle ---

    /// Moves the course to the requested state after confirmation. Local
    /// status only changes once the backend acknowledges.
    pub async fn set_published(&mut self, publish: bool, confirm: &mut impl Confirm) -> Result<bool, BuilderError> {
        let target = if publish { CourseStatus::Published } else { CourseStatus::Draft };
        let transition = lifecycle::plan(self.loaded()?, target)?;
        if !confirm.confirm(&transition.prompt) {
            return Ok(false);
        }
        let updated = self
            .gateway
            .set_publish_state(&self.course_id, &self.tenant_id, transition.publishes())
            .await
            .map_err(|e| {
                tracing::error!(course_id=%self.course_id, error=%e, "failed to update publish status");
                e
            })?;
        self.draft()?.status = updated.status;
        if let Some(committed) = self.committed.as_mut() {
            committed.status = updated.status;
        }
        tracing::info!(course_id=%self.course_id, status=%updated.status, "publish status updated");
        Ok(true)
    }

    pub async fn toggle_publish(&mut self, confirm: &mut impl Confirm) -> Result<bool, BuilderError> {
        let publish = self.loaded()?.status == CourseStatus::Draft;
        self.set_published(publish, confirm).await
    }

    // --- persistence ---

    /// Recomputes totals, fills in a course code if missing and sends the
    /// whole draft.
    pub async fn save(&mut self) -> Result<(), BuilderError> {
        let course = self.draft()?;
        course.refresh_totals();
        if course.course_code.is_none() {
            course.course_code = Some(generate_course_code(&course.title));
        }
        let update = CourseUpdate::from(&*course);
        let result = self.gateway.update(&self.course_id, &self.tenant_id, &update).await;
        self.settle(result.map(drop), "course saved").await
    }

    async fn settle(&mut self, result: Result<(), ApiError>, saved: &'static str) -> Result<(), BuilderError> {
        match result {
            Ok(()) => {
                self.committed = self.course.clone();
                tracing::info!(course_id=%self.course_id, "{}", saved);
                Ok(())
            }
            Err(e) => {
                tracing::error!(course_id=%self.course_id, error=%e, "write failed");
                self.reload_after_failure().await;
                Err(e.into())
            }
        }
    }

    async fn reload_after_failure(&mut self) {
        tracing::warn!(course_id=%self.course_id, "discarding local changes, reloading course");
        match self.gateway.get(&self.course_id, &self.tenant_id).await {
            Ok(course) => {
                self.committed = Some(course.clone());
                self.course = Some(course);
            }
            Err(e) => {
                tracing::error!(course_id=%self.course_id, error=%e, "reload failed, restoring last saved state");
                self.course = self.committed.clone();
            }
        }
    }

    // --- enrolled students ---

    /// A failed fetch is logged and leaves the list empty.
    pub async fn load_students(&mut self) -> &[EnrolledStudent] {
        self.students = match self
            .gateway
            .list_enrolled_students(&self.course_id, &self.tenant_id)
            .await
        {
            Ok(students) => students,
            Err(e) => {
                tracing::warn!(course_id=%self.course_id, error=%e, "failed to load enrolled students");
                Vec::new()
            }
        };
        &self.students
    }

    /// Case-insensitive match on name or email; a blank query matches all.
    pub fn filtered_students(&self, query: &str) -> Vec<&EnrolledStudent> {
        let query = query.trim().to_lowercase();
        self.students
            .iter()
            .filter(|s| {
                query.is_empty()
                    || s.full_name.to_lowercase().contains(&query)
                    || s.email.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub async fn unenroll(&mut self, student_id: &str, confirm: &mut impl Confirm) -> Result<bool, BuilderError> {
        self.loaded()?;
        let name = self
            .students
            .iter()
            .find(|s| s.id == student_id)
            .map(|s| s.full_name.clone())
            .ok_or_else(|| ValidationError::UnknownStudent(student_id.to_string()))?;
        if !confirm.confirm(&Prompt::unenroll(&name)) {
            return Ok(false);
        }
        self.gateway
            .unenroll(&self.course_id, &self.tenant_id, student_id)
            .await
            .map_err(|e| {
                tracing::error!(%student_id, error=%e, "failed to unenroll student");
                e
            })?;
        self.students.retain(|s| s.id != student_id);
        let course = self.draft()?;
        course.enrolled_students = course.enrolled_students.saturating_sub(1);
        if let Some(committed) = self.committed.as_mut() {
            committed.enrolled_students = committed.enrolled_students.saturating_sub(1);
        }
        tracing::info!(%student_id, "student unenrolled");
        Ok(true)
    }
}
