//! # Response Parser
//!
//! Pulls file blocks out of free-form model output and applies them.
//!
//! Three pattern families run over the whole text, one after another:
//!
//! ~~~text
//! 1. ```js // src/app.js          fence + optional language + comment path marker
//!    ...body...
//!    ```
//! 2. ```src/app.js                fence naming the file directly
//!    ...body...
//!    ```
//! 3. ## src/app.js                heading naming the file, body runs to the
//!    ...body...                   next Markdown heading outside a fence,
//!                                 or end of text
//! ~~~
//!
//! Matches are not deduplicated across families: the same span can produce
//! more than one block, and the same path can be written more than once.

use std::sync::LazyLock;

use log::{debug, error, info};
use regex::Regex;

use crate::core::applier::{
    AI_DESCRIPTION, FileApplier, FileOperation, OperationKind, resolve_path,
};
use crate::core::protocol::{Outbound, Outbox};
use crate::workspace::Workspace;

static COMMENT_MARKER_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"```(?:[\w+#-]+)?\s*(?://|<!--)[ \t]*([\w./\\-]+\.\w+)[ \t]*(?:-->)?[ \t]*\r?\n([\s\S]*?)```",
    )
    .expect("comment marker pattern is valid")
});

static NAMED_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```([\w./\\-]+\.\w+)[ \t]*\r?\n([\s\S]*?)```").expect("named fence pattern is valid")
});

static FILE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^#+[ \t]+[`*]*([\w./\\-]+\.[A-Za-z]\w*)[`*]*:?[ \t]*\r?$")
        .expect("file heading pattern is valid")
});

/// A Markdown ATX heading line. `#app {` and `#include` are not headings.
static MARKDOWN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{1,6}[ \t]+\S").expect("heading pattern is valid"));

/// A path and body lifted from model output, already trimmed and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlock {
    pub path: String,
    pub content: String,
}

impl FileBlock {
    fn candidate(raw_path: &str, raw_content: &str) -> Option<FileBlock> {
        let path = raw_path.trim();
        let content = raw_content.trim();
        if path.is_empty() || content.is_empty() {
            return None;
        }
        Some(FileBlock {
            path: path.to_string(),
            content: content.to_string(),
        })
    }
}

/// All file blocks in `text`, in pattern-family order.
pub fn extract(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();

    for re in [&*COMMENT_MARKER_FENCE, &*NAMED_FENCE] {
        blocks.extend(
            re.captures_iter(text)
                .filter_map(|c| FileBlock::candidate(&c[1], &c[2])),
        );
    }

    for caps in FILE_HEADING.captures_iter(text) {
        let Some(line) = caps.get(0) else { continue };
        let body_start = (line.end() + 1).min(text.len());
        let body_end = heading_body_end(text, body_start);
        let body = strip_fence(&text[body_start..body_end]);
        if let Some(block) = FileBlock::candidate(&caps[1], body) {
            blocks.push(block);
        }
    }

    debug!("Extracted {} file block(s) from response", blocks.len());
    blocks
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Where a heading body starting at `start` ends: the next Markdown heading
/// that is not inside a fenced block, or the end of `text`.
fn heading_body_end(text: &str, start: usize) -> usize {
    let mut in_fence = false;
    let mut offset = start;
    for line in text[start..].split_inclusive('\n') {
        if is_fence_line(line) {
            in_fence = !in_fence;
        } else if !in_fence && MARKDOWN_HEADING.is_match(line) {
            return offset;
        }
        offset += line.len();
    }
    text.len()
}

/// Keeps only the inside of the first code fence in a heading body. Prose
/// after the closing fence is dropped; an unfenced body is returned as is.
fn strip_fence(body: &str) -> &str {
    let Some(rest) = body.trim_start().strip_prefix("```") else {
        return body;
    };
    let Some(newline) = rest.find('\n') else {
        return body;
    };
    let inner = &rest[newline + 1..];
    let mut offset = 0;
    for line in inner.split_inclusive('\n') {
        if is_fence_line(line) {
            return &inner[..offset];
        }
        offset += line.len();
    }
    inner
}

/// What happened when a response was applied.
#[derive(Debug, Default)]
pub struct ApplySummary {
    /// Every operation dispatched, in order, whether or not it succeeded.
    pub operations: Vec<FileOperation>,
    /// True once at least one operation succeeded.
    pub files_processed: bool,
}

/// Extracts file blocks from `text` and applies each one, acknowledging
/// every outcome on `outbox`. A failed block does not stop the ones after it.
pub async fn apply_response(
    text: &str,
    workspace: &dyn Workspace,
    applier: &FileApplier,
    outbox: &Outbox,
) -> ApplySummary {
    let mut summary = ApplySummary::default();

    for block in extract(text) {
        let target_path = match resolve_path(workspace, &block.path) {
            Ok(p) => p,
            Err(e) => {
                error!("Cannot apply {}: {}", block.path, e);
                outbox.send(Outbound::error(&e)).await;
                break;
            }
        };

        let op = if workspace.exists(&target_path).await {
            FileOperation {
                target_path,
                content: block.content,
                kind: OperationKind::Modify,
                description: AI_DESCRIPTION.to_string(),
            }
        } else {
            FileOperation {
                target_path,
                content: block.content,
                kind: OperationKind::Create,
                description: String::new(),
            }
        };

        match applier.apply(&op).await {
            Ok(()) => {
                summary.files_processed = true;
                let ack = match op.kind {
                    OperationKind::Create => Outbound::file_created(&op.target_path),
                    OperationKind::Modify => Outbound::file_modified(&op.target_path),
                };
                outbox.send(ack).await;
            }
            Err(e) => {
                error!("Failed to apply {:?} to {}: {}", op.kind, op.target_path.display(), e);
                outbox.send(Outbound::error(&e)).await;
            }
        }
        summary.operations.push(op);
    }

    info!(
        "Applied response: {} operation(s), files_processed={}",
        summary.operations.len(),
        summary.files_processed
    );
    summary
}
