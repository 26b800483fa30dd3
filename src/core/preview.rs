//! # Preview Renderer
//!
//! Turns a file into a self-contained HTML document, chosen by extension:
//!
//! - `tsx` / `jsx` / `ts` / `js`: an iframe onto the live-reload server
//! - `html`: the content itself
//! - `css`: the stylesheet applied to a page of sample elements
//! - `json`: pretty-printed and highlighted, or a warning plus the raw text
//!
//! Anything interpolated into generated markup goes through [`escape_html`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::core::error::CoreError;
use crate::core::protocol::PreviewKind;
use crate::core::reload::LiveReload;
use crate::workspace::{display_name, extension};

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewArtifact {
    pub path: PathBuf,
    pub display_name: String,
    pub content: String,
    pub kind: PreviewKind,
}

pub struct PreviewRenderer {
    reload: Arc<dyn LiveReload>,
}

impl PreviewRenderer {
    pub fn new(reload: Arc<dyn LiveReload>) -> Self {
        Self { reload }
    }

    pub async fn render(&self, path: &Path, content: &str) -> Result<PreviewArtifact, CoreError> {
        let ext = extension(path);
        let name = display_name(path);
        debug!("Rendering preview for {} ({})", path.display(), ext);

        let html = match ext.as_str() {
            "tsx" | "jsx" | "ts" | "js" => {
                let url = self.reload.ensure_running().await?;
                component_shell(&name, &url)
            }
            "html" => content.to_string(),
            "css" => css_preview(&name, content),
            "json" => json_preview(&name, content),
            _ => return Err(CoreError::UnsupportedPreview(format!(".{ext}"))),
        };

        Ok(PreviewArtifact {
            path: path.to_path_buf(),
            display_name: name,
            content: html,
            kind: PreviewKind::Html,
        })
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for text and attribute positions.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn component_shell(name: &str, url: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  html, body {{ margin: 0; padding: 0; height: 100%; }}
  iframe {{ border: none; width: 100%; height: 100%; }}
</style>
</head>
<body>
<iframe src="{src}" title="{title}"></iframe>
</body>
</html>"#,
        title = escape_html(name),
        src = escape_html(url),
    )
}

fn css_preview(name: &str, css: &str) -> String {
    // `</style>` inside the stylesheet would end the block early.
    let css = css.replace("</style", "<\\/style");
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
<h1>Heading 1</h1>
<h2>Heading 2</h2>
<p>This paragraph shows body text. It contains <a href="#">a link</a> and <strong>bold text</strong>.</p>
<button>Button</button>
<div class="box">A styled box</div>
</body>
</html>"##,
        title = escape_html(name),
    )
}

const JSON_STYLE: &str = r#"
  body { font-family: monospace; margin: 1em; }
  pre { white-space: pre-wrap; }
  .string { color: #a31515; }
  .number { color: #098658; }
  .boolean { color: #0000ff; }
  .null { color: #795e26; }
  .key { color: #001080; }
"#;

const JSON_HIGHLIGHT: &str = r#"
(function () {
  var pre = document.getElementById('json');
  var text = pre.textContent
    .replace(/&/g, '&amp;')
    .replace(/</g, '&lt;')
    .replace(/>/g, '&gt;');
  pre.innerHTML = text.replace(
    /("(\\u[a-fA-F0-9]{4}|\\[^u]|[^\\"])*"(\s*:)?|\b(true|false|null)\b|-?\d+(?:\.\d*)?(?:[eE][+\-]?\d+)?)/g,
    function (match) {
      var cls = 'number';
      if (/^"/.test(match)) {
        cls = /:$/.test(match) ? 'key' : 'string';
      } else if (/true|false/.test(match)) {
        cls = 'boolean';
      } else if (/null/.test(match)) {
        cls = 'null';
      }
      return '<span class="' + cls + '">' + match + '</span>';
    }
  );
})();
"#;

fn json_preview(name: &str, raw: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(value) => {
            // `to_string_pretty` indents with two spaces.
            let pretty = serde_json::to_string_pretty(&value).unwrap_or_else(|_| raw.to_string());
            format!(
                r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{JSON_STYLE}</style>
</head>
<body>
<pre id="json">{body}</pre>
<script>{JSON_HIGHLIGHT}</script>
</body>
</html>"#,
                title = escape_html(name),
                body = escape_html(&pretty),
            )
        }
        Err(e) => format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{JSON_STYLE}
  .warning {{ background: #fff4ce; border: 1px solid #e0b600; padding: 0.5em; margin-bottom: 1em; }}
</style>
</head>
<body>
<div class="warning">Invalid JSON: {error}</div>
<pre>{body}</pre>
</body>
</html>"#,
            title = escape_html(name),
            error = escape_html(&e.to_string()),
            body = escape_html(raw),
        ),
    }
}
