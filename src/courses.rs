use reqwest::Method;
use serde::Serialize;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::gateway::CourseGateway;
use crate::models::{Course, CourseCreate, CourseFilters, CourseUpdate, EnrolledStudent};

/// `/courses` over HTTP.
#[derive(Debug, Clone)]
pub struct CourseClient {
    api: ApiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModuleOrder<'a> {
    module_ids: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LessonOrder<'a> {
    module_id: &'a str,
    lesson_ids: &'a [String],
}

#[derive(Serialize)]
struct Publish {
    publish: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tenant<'a> {
    tenant_id: &'a str,
}

#[derive(Serialize)]
struct ListQuery<'a> {
    #[serde(rename = "tenantId")]
    tenant_id: &'a str,
    #[serde(flatten)]
    filters: &'a CourseFilters,
}

impl CourseClient {
    pub fn new(api: ApiClient) -> Self {
        CourseClient { api }
    }

    pub async fn create_course(&self, course: &CourseCreate) -> Result<Course, ApiError> {
        let req = self.api.request(Method::POST, &["courses"]).json(course);
        let created: Course = self.api.send_json(req).await?;
        tracing::info!(course_id=%created.id, "course created");
        Ok(created)
    }

    pub async fn list_courses(&self, tenant_id: &str, filters: &CourseFilters) -> Result<Vec<Course>, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["courses"])
            .query(&ListQuery { tenant_id, filters });
        self.api.send_json(req).await
    }

    pub async fn delete_course(&self, course_id: &str, tenant_id: &str) -> Result<(), ApiError> {
        let req = self
            .api
            .request(Method::DELETE, &["courses", course_id])
            .query(&Tenant { tenant_id });
        self.api.send_unit(req).await?;
        tracing::info!(%course_id, "course deleted");
        Ok(())
    }
}

impl CourseGateway for CourseClient {
    async fn get(&self, course_id: &str, tenant_id: &str) -> Result<Course, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["courses", course_id])
            .query(&Tenant { tenant_id });
        self.api.send_json(req).await
    }

    async fn update(&self, course_id: &str, tenant_id: &str, update: &CourseUpdate) -> Result<Course, ApiError> {
        let req = self
            .api
            .request(Method::PUT, &["courses", course_id])
            .query(&Tenant { tenant_id })
            .json(update);
        self.api.send_json(req).await
    }

    async fn reorder_modules(&self, course_id: &str, tenant_id: &str, module_ids: &[String]) -> Result<Course, ApiError> {
        let req = self
            .api
            .request(Method::PATCH, &["courses", course_id, "reorder", "modules"])
            .query(&Tenant { tenant_id })
            .json(&ModuleOrder { module_ids });
        self.api.send_json(req).await
    }

    async fn reorder_lessons(
        &self,
        course_id: &str,
        tenant_id: &str,
        module_id: &str,
        lesson_ids: &[String],
    ) -> Result<Course, ApiError> {
        let req = self
            .api
            .request(Method::PATCH, &["courses", course_id, "reorder", "lessons"])
            .query(&Tenant { tenant_id })
            .json(&LessonOrder { module_id, lesson_ids });
        self.api.send_json(req).await
    }

    async fn set_publish_state(&self, course_id: &str, tenant_id: &str, publish: bool) -> Result<Course, ApiError> {
        let req = self
            .api
            .request(Method::POST, &["courses", course_id, "publish"])
            .query(&Tenant { tenant_id })
            .json(&Publish { publish });
        self.api.send_json(req).await
    }

    async fn list_enrolled_students(&self, course_id: &str, tenant_id: &str) -> Result<Vec<EnrolledStudent>, ApiError> {
        let req = self
            .api
            .request(Method::GET, &["courses", course_id, "students"])
            .query(&Tenant { tenant_id });
        self.api.send_json(req).await
    }

    async fn unenroll(&self, course_id: &str, tenant_id: &str, student_id: &str) -> Result<(), ApiError> {
        let req = self
            .api
            .request(Method::DELETE, &["courses", course_id, "students", student_id])
            .query(&Tenant { tenant_id });
        self.api.send_unit(req).await
    }
}
