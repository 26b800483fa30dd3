//! # Core Application Logic
//!
//! Everything between an inbound UI message and the workspace. It knows
//! nothing about the transport; the server hands it raw text and an
//! [`protocol::Outbox`] to answer on.
//!
//! ```text
//!        raw JSON ──► router ──┬── applier ──► workspace (create / modify)
//!                              │      ▲
//!                              │      └── parser ◄── chat ◄── provider
//!                              ├── preview ──► reload (dev server)
//!                              ├── diff ◄── snapshot
//!                              └── workspace info / file content
//! ```
//!
//! ## Modules
//!
//! - [`router`]: parses and dispatches inbound messages
//! - [`applier`]: creates and modifies files, capturing baselines first
//! - [`snapshot`]: first-seen content per path
//! - [`parser`]: finds file blocks in model output
//! - [`preview`]: turns a file into a self-contained HTML document
//! - [`diff`]: baseline vs current content
//! - [`chat`]: one model call per chat message
//! - [`config`]: layered configuration

pub mod applier;
pub mod chat;
pub mod config;
pub mod diff;
pub mod error;
pub mod parser;
pub mod preview;
pub mod protocol;
pub mod reload;
pub mod router;
pub mod snapshot;

pub use error::CoreError;
