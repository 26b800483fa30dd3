//! # Chat
//!
//! One question, one model call. In execute mode the answer is also run
//! through the response parser and its file blocks are applied.
//!
//! ```text
//! chat(message, execute_mode)
//!   ├── directive (+ file block instructions in execute mode)
//!   ├── workspace summary: roots, open files, active file + its text
//!   ├── user message
//!   ├── collect_completion()          ── Err → error
//!   ├── execute_mode? apply_response() → fileCreated | fileModified | error ...
//!   └── chat { message, executeMode, filesProcessed }
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use log::{error, info};

use crate::core::applier::FileApplier;
use crate::core::error::CoreError;
use crate::core::parser::apply_response;
use crate::core::protocol::{Outbound, Outbox};
use crate::inference::{CompletionProvider, CompletionRequest, Context, Effort, collect_completion};
use crate::workspace::Workspace;

const EXECUTE_DIRECTIVE: &str = "You are in execute mode: your answer will be applied to the workspace. \
    Emit every file you create or change IN FULL as a fenced code block whose first line is a comment \
    naming its path relative to the workspace root, for example:\n\
    ```js\n// src/app.js\n...entire file...\n```\n\
    For HTML use `<!-- path/to/file.html -->` as the first line. \
    Never emit partial files or diffs.";

/// Active-file text beyond this many bytes is cut from the prompt.
const MAX_ACTIVE_FILE_BYTES: usize = 64 * 1024;

pub struct ChatService {
    provider: Arc<dyn CompletionProvider>,
    model_name: String,
    effort: Effort,
    system_prompt: String,
    workspace: Arc<dyn Workspace>,
    applier: Arc<FileApplier>,
}

impl ChatService {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        model_name: String,
        effort: Effort,
        system_prompt: String,
        workspace: Arc<dyn Workspace>,
        applier: Arc<FileApplier>,
    ) -> Self {
        Self {
            provider,
            model_name,
            effort,
            system_prompt,
            workspace,
            applier,
        }
    }

    /// Answers `message`, emitting any file acknowledgements and then the
    /// final `chat` message (or a single `error`) on `outbox`.
    pub async fn handle(&self, message: &str, execute_mode: bool, outbox: &Outbox) {
        let context = self.build_context(message, execute_mode).await;
        let request = CompletionRequest {
            context: &context,
            model: &self.model_name,
            effort: self.effort,
        };

        info!(
            "Chat request via {}: {} bytes, execute_mode={}",
            self.provider.name(),
            message.len(),
            execute_mode
        );

        let reply = match collect_completion(self.provider.as_ref(), request).await {
            Ok(text) => text,
            Err(e) => {
                let err = CoreError::from(e);
                error!("{}", err);
                outbox.send(Outbound::error(&err)).await;
                return;
            }
        };

        let files_processed = if execute_mode {
            apply_response(&reply, self.workspace.as_ref(), &self.applier, outbox)
                .await
                .files_processed
        } else {
            false
        };

        outbox
            .send(Outbound::Chat {
                message: reply,
                execute_mode,
                files_processed,
            })
            .await;
    }

    async fn build_context(&self, message: &str, execute_mode: bool) -> Context {
        let mut directive = self.system_prompt.clone();
        if execute_mode {
            directive.push_str("\n\n");
            directive.push_str(EXECUTE_DIRECTIVE);
        }
        directive.push_str("\n\n");
        directive.push_str(&self.workspace_summary().await);

        let mut context = Context::new(directive);
        context.add_user_message(message.to_string());
        context
    }

    async fn workspace_summary(&self) -> String {
        let mut summary = String::from("Workspace folders:\n");
        for root in self.workspace.roots() {
            let _ = writeln!(summary, "- {}", root.display());
        }

        let files = self.workspace.workspace_files();
        if !files.is_empty() {
            summary.push_str("Open files:\n");
            for f in &files {
                let marker = if f.is_active { " (active)" } else { "" };
                let _ = writeln!(summary, "- {} [{}]{}", f.path.display(), f.language_id, marker);
            }
        }

        if let Some(active) = files.iter().find(|f| f.is_active)
            && let Ok(text) = self.workspace.current_text(&active.path).await
        {
            let text = truncate_at_char_boundary(&text, MAX_ACTIVE_FILE_BYTES);
            let _ = write!(
                summary,
                "\nActive file {}:\n```{}\n{}\n```\n",
                active.path.display(),
                active.language_id,
                text
            );
        }
        summary
    }
}

fn truncate_at_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::snapshot::MemorySnapshotStore;
    use crate::inference::Source;
    use crate::test_support::ScriptedProvider;
    use crate::workspace::LocalWorkspace;

    struct Fixture {
        dir: tempfile::TempDir,
        ws: Arc<LocalWorkspace>,
        provider: Arc<ScriptedProvider>,
        service: ChatService,
    }

    fn fixture(provider: ScriptedProvider) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ws = Arc::new(LocalWorkspace::new(vec![dir.path().to_path_buf()]));
        let applier = Arc::new(FileApplier::new(
            ws.clone(),
            Arc::new(MemorySnapshotStore::default()),
        ));
        let provider = Arc::new(provider);
        let service = ChatService::new(
            provider.clone(),
            "test-model".into(),
            Effort::None,
            "You help.".into(),
            ws.clone(),
            applier,
        );
        Fixture {
            dir,
            ws,
            provider,
            service,
        }
    }

    fn drain(rx: &mut tokio::sync::mpsc::Receiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[tokio::test]
    async fn test_ask_mode_does_not_touch_files() {
        let f = fixture(ScriptedProvider::replying(vec!["```js // a.js\nx()\n```"]));
        let (outbox, mut rx) = Outbox::channel(16);

        f.service.handle("hi", false, &outbox).await;

        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Outbound::Chat { files_processed: false, execute_mode: false, .. }));
        assert!(!f.dir.path().join("a.js").exists());
    }

    #[tokio::test]
    async fn test_execute_mode_applies_blocks_before_reply() {
        let f = fixture(ScriptedProvider::replying(vec!["Done:\n```js // a.js\nx()\n```"]));
        let (outbox, mut rx) = Outbox::channel(16);

        f.service.handle("make a.js", true, &outbox).await;

        let out = drain(&mut rx);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], Outbound::FileCreated { success: true, .. }));
        assert!(matches!(&out[1], Outbound::Chat { files_processed: true, execute_mode: true, .. }));
        assert_eq!(std::fs::read_to_string(f.dir.path().join("a.js")).unwrap(), "x()");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_single_error() {
        let f = fixture(ScriptedProvider::failing("rate limited"));
        let (outbox, mut rx) = Outbox::channel(16);

        f.service.handle("hi", true, &outbox).await;

        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0], Outbound::Error { message } if message.contains("rate limited")));
    }

    #[tokio::test]
    async fn test_context_includes_active_file() {
        let f = fixture(ScriptedProvider::replying(vec!["ok"]));
        let file = f.dir.path().join("main.rs");
        std::fs::write(&file, "fn main() {}").unwrap();
        f.ws.open_document(&file).await.unwrap();
        let (outbox, _rx) = Outbox::channel(16);

        f.service.handle("explain", true, &outbox).await;

        let context = f.provider.last_context().unwrap();
        assert_eq!(context.items.len(), 2);
        assert_eq!(context.items[0].source, Source::Directive);
        assert!(context.items[0].content.contains("fn main() {}"));
        assert!(context.items[0].content.contains("(active)"));
        assert!(context.items[0].content.contains("execute mode"));
        assert_eq!(context.items[1].content, "explain");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        let text = "aé";
        assert_eq!(truncate_at_char_boundary(text, 2), "a");
        assert_eq!(truncate_at_char_boundary(text, 10), "aé");
    }
}
