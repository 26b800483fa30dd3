//! Weave library exports for the binary and integration tests

use clap::ValueEnum;

pub mod core;
pub mod inference;
pub mod server;
pub mod workspace;

#[cfg(test)]
pub mod test_support;

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum Provider {
    #[default]
    OpenRouter,
    LmStudio,
}

impl Provider {
    /// The name used in config files and `WEAVE_PROVIDER`.
    pub fn config_name(&self) -> &'static str {
        match self {
            Provider::OpenRouter => "openrouter",
            Provider::LmStudio => "lmstudio",
        }
    }
}
