//! Quiz template domain types.
//!
//! A [`TemplateSnapshot`] is an owned, immutable copy of a quiz definition
//! embedded into a session at creation time. Later edits to the stored
//! template never reach an in-progress game: the snapshot is cloned out of
//! the template store once and the session keeps its own copy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One presentable slide of a quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    /// How long the slide is shown, in seconds.
    pub duration_secs: u32,
    /// The question prompt.
    pub prompt: String,
    /// Answer options in display order.
    pub options: Vec<String>,
    /// Indices into `options` that are correct.
    pub correct: Vec<usize>,
    /// Whether players may select more than one option.
    pub multiple_answer: bool,
}

/// An immutable copy of a quiz definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSnapshot {
    pub id: Uuid,
    pub name: String,
    pub slides: Vec<Slide>,
}

impl TemplateSnapshot {
    /// Number of slides in the quiz.
    #[must_use]
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }
}
