//! Prompt items submitted in a batch

use serde::{Deserialize, Serialize};

/// One unit of work in a generation batch.
///
/// `id` is assigned by the caller and must be unique within a batch. The
/// position of a prompt in the submitted sequence is what maps backend
/// progress counts back to ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationPrompt {
    /// Caller-assigned identifier
    pub id: String,
    /// Prompt text
    pub prompt: String,
}

impl GenerationPrompt {
    /// Create a prompt with an explicit id.
    pub fn new(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
        }
    }

    /// Create a prompt with a fresh random id.
    pub fn anonymous(prompt: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), prompt)
    }
}

impl<I: Into<String>, P: Into<String>> From<(I, P)> for GenerationPrompt {
    fn from((id, prompt): (I, P)) -> Self {
        Self::new(id, prompt)
    }
}
