use crate::error::ApiError;
use crate::models::{Course, CourseUpdate, EnrolledStudent};

/// Durable store of course aggregates. Every call is tenant-scoped; tenant
/// isolation is enforced by the backend, not here.
#[allow(async_fn_in_trait)]
pub trait CourseGateway {
    async fn get(&self, course_id: &str, tenant_id: &str) -> Result<Course, ApiError>;

    /// Replaces the stored course and echoes back the authoritative state.
    async fn update(&self, course_id: &str, tenant_id: &str, update: &CourseUpdate) -> Result<Course, ApiError>;

    async fn reorder_modules(&self, course_id: &str, tenant_id: &str, module_ids: &[String]) -> Result<Course, ApiError>;

    async fn reorder_lessons(
        &self,
        course_id: &str,
        tenant_id: &str,
        module_id: &str,
        lesson_ids: &[String],
    ) -> Result<Course, ApiError>;

    async fn set_publish_state(&self, course_id: &str, tenant_id: &str, publish: bool) -> Result<Course, ApiError>;

    async fn list_enrolled_students(&self, course_id: &str, tenant_id: &str) -> Result<Vec<EnrolledStudent>, ApiError>;

    async fn unenroll(&self, course_id: &str, tenant_id: &str, student_id: &str) -> Result<(), ApiError>;
}
