use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Source {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "system")]
    Directive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ContextSegment {
    #[serde(rename = "role")]
    pub source: Source,
    pub content: String,
}

/// The model input for one request: a directive followed by turns.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Context {
    pub items: Vec<ContextSegment>,
}

impl Context {
    /// Creates a Context that starts with the given system directive.
    pub fn new(directive: impl Into<String>) -> Self {
        Context {
            items: vec![ContextSegment {
                source: Source::Directive,
                content: directive.into(),
            }],
        }
    }

    /// Adds a new ContextSegment and returns a reference to it.
    pub fn add(&mut self, segment: ContextSegment) -> &ContextSegment {
        self.items.push(segment);
        self.items.last().expect("just pushed")
    }

    pub fn add_user_message(&mut self, content: String) -> &ContextSegment {
        self.add(ContextSegment {
            source: Source::User,
            content,
        })
    }
}

/// Effort level for reasoning tokens
/// Higher effort = more reasoning tokens = better quality but higher cost
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub enum Effort {
    /// Thorough analysis - model takes more time to reason
    #[serde(rename = "high")]
    High,
    /// Balanced reasoning
    #[serde(rename = "medium")]
    Medium,
    /// Quick thinking - faster but less thorough
    #[serde(rename = "low")]
    Low,
    /// Model decides whether and how much to reason (default)
    #[serde(rename = "auto")]
    #[default]
    Auto,
    /// Disables reasoning entirely
    #[serde(rename = "none")]
    None,
}

/// Represents a chunk of streamed content from the model.
#[derive(Debug, PartialEq)]
pub enum StreamChunk {
    Content(String),
    Thinking(String),
    /// The provider saw the end-of-response event.
    Completed,
}
