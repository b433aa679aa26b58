//! System prompt assembly from pluggable contributors.
//!
//! Contributors run in registration order; each may add a section or decline
//! for the current context. Sections are joined by blank lines.

use crate::types::ContributorContext;

/// One source of system-prompt content.
pub trait SystemPromptContributor: Send + Sync {
    /// Contributor name, for diagnostics.
    fn name(&self) -> &str;

    /// The section this contributor adds, or `None` to skip.
    fn contribute(&self, ctx: &ContributorContext) -> Option<String>;
}

/// A fixed-text contributor (base persona, standing instructions).
pub struct StaticContributor {
    name: String,
    text: String,
}

impl StaticContributor {
    /// Create a contributor that always emits `text`.
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

impl SystemPromptContributor for StaticContributor {
    fn name(&self) -> &str {
        &self.name
    }

    fn contribute(&self, _ctx: &ContributorContext) -> Option<String> {
        Some(self.text.clone())
    }
}

/// Assemble the system prompt in registration order.
#[must_use]
pub fn assemble_system_prompt(
    contributors: &[Box<dyn SystemPromptContributor>],
    ctx: &ContributorContext,
) -> String {
    contributors
        .iter()
        .filter_map(|contributor| contributor.contribute(ctx))
        .filter(|section| !section.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
