/// Tone of a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub confirm_text: String,
}

impl Prompt {
    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Prompt {
            kind: PromptKind::Warning,
            title: title.into(),
            message: message.into(),
            confirm_text: "Confirm".into(),
        }
    }

    pub fn delete(item_name: Option<&str>) -> Self {
        let message = match item_name {
            Some(name) => format!("Are you sure you want to delete \"{name}\"? This action cannot be undone."),
            None => "Are you sure you want to delete this item? This action cannot be undone.".into(),
        };
        Prompt {
            kind: PromptKind::Danger,
            title: "Delete Confirmation".into(),
            message,
            confirm_text: "Delete".into(),
        }
    }

    pub fn unenroll(full_name: &str) -> Self {
        Prompt::warning(
            "Unenroll Student",
            format!(
                "Are you sure you want to unenroll {full_name} from this course? \
                 They will lose access to all course content."
            ),
        )
    }
}

/// Interactive yes/no gate in front of destructive or visible changes.
pub trait Confirm {
    fn confirm(&mut self, prompt: &Prompt) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Confirm for Always {
    fn confirm(&mut self, _prompt: &Prompt) -> bool {
        self.0
    }
}

impl<F: FnMut(&Prompt) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &Prompt) -> bool {
        self(prompt)
    }
}
