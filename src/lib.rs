//! Client library for the EduVerse course platform: the course builder and
//! its ordering, duration and lifecycle engines, plus typed clients for
//! courses, quizzes, submissions and auth.

pub mod api;
pub mod auth;
pub mod builder;
pub mod bulk_upload;
pub mod config;
pub mod confirm;
pub mod courses;
pub mod duration;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod lifecycle;
pub mod models;
pub mod ordering;
pub mod quiz;
pub mod session;
pub mod submissions;
pub mod validation;

pub use api::ApiClient;
pub use builder::CourseBuilder;
pub use courses::CourseClient;
pub use error::{ApiError, BuilderError, ValidationError};
pub use gateway::CourseGateway;
pub use session::Session;
