//! Draft/published transitions and marketplace visibility.

use crate::confirm::Prompt;
use crate::error::ValidationError;
use crate::models::{Course, CourseStatus, Module};

/// `draft -> published` needs a module and at least one lesson somewhere.
pub fn check_publishable(modules: &[Module]) -> Result<(), ValidationError> {
    if modules.is_empty() {
        return Err(ValidationError::NoModules);
    }
    if !modules.iter().any(|m| !m.lessons.is_empty()) {
        return Err(ValidationError::NoLessons);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: CourseStatus,
    pub prompt: Prompt,
}

impl Transition {
    pub fn publishes(&self) -> bool {
        self.target == CourseStatus::Published
    }
}

/// Validates a move to `target` and builds the prompt describing its consequence.
pub fn plan(course: &Course, target: CourseStatus) -> Result<Transition, ValidationError> {
    if course.status == target {
        return Err(ValidationError::AlreadyInState(target));
    }
    let prompt = match target {
        CourseStatus::Published => {
            check_publishable(&course.modules)?;
            Prompt::warning(
                "Publish Course",
                format!(
                    "Publishing \"{}\" will make it available to students. Do you want to continue?",
                    course.title
                ),
            )
        }
        CourseStatus::Draft => Prompt::warning(
            "Unpublish Course",
            format!(
                "Unpublishing \"{}\" will hide it from new students. Enrolled students will \
                 still have access. Do you want to continue?",
                course.title
            ),
        ),
    };
    Ok(Transition { target, prompt })
}

/// Transition to whichever state the course is not in.
pub fn plan_toggle(course: &Course) -> Result<Transition, ValidationError> {
    let target = match course.status {
        CourseStatus::Draft => CourseStatus::Published,
        CourseStatus::Published => CourseStatus::Draft,
    };
    plan(course, target)
}

pub fn visibility_prompt(make_public: bool) -> Prompt {
    if make_public {
        Prompt::warning(
            "Make Course Public",
            "Making this course public will show it in the course marketplace (when published). Continue?",
        )
    } else {
        Prompt::warning(
            "Make Course Private",
            "Making this course private will hide it from the marketplace. Only enrolled \
             students can access it. Continue?",
        )
    }
}
