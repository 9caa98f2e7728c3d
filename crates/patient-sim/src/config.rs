//! Simulator configuration with sensible defaults.
//!
//! [`SimConfig`] captures the settings a session needs and turns them into
//! the pieces the [`ConversationController`] is built from.

use std::path::PathBuf;

use crate::controller::ConversationController;
use crate::error::SimError;
use crate::gateway::{GenerationGateway, OpenRouterGateway};
use crate::profile::{
    DiseaseContext, ProfileSelector, default_catalog, load_catalog, validate_catalog,
};
use crate::turn_log::TurnLogger;
use crate::{DEFAULT_LOG_PATH, DEFAULT_MODEL, OpenRouterClient};

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_KEY";

/// Configuration for one simulated conversation.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,
    /// Maximum tokens per generation call. Default: `512`.
    pub max_tokens: u32,
    /// Sampling temperature. Default: `0.7`.
    pub temperature: f32,
    /// Turn log path. Default: [`DEFAULT_LOG_PATH`].
    pub log_path: PathBuf,
    /// JSON disease catalog. `None` uses [`default_catalog`].
    pub catalog_path: Option<PathBuf>,
    /// Steering text for patient replies. Default: empty.
    pub instructions: String,
    /// Seed for profile selection. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 512,
            temperature: 0.7,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            catalog_path: None,
            instructions: String::new(),
            seed: None,
        }
    }
}

impl SimConfig {
    /// The disease catalog: loaded from `catalog_path` or the built-in one.
    pub fn load_catalog(&self) -> Result<Vec<DiseaseContext>, SimError> {
        match &self.catalog_path {
            Some(path) => load_catalog(path),
            None => {
                let catalog = default_catalog();
                validate_catalog(&catalog)?;
                Ok(catalog)
            }
        }
    }

    pub fn build_selector(&self) -> Result<ProfileSelector, SimError> {
        let catalog = self.load_catalog()?;
        Ok(match self.seed {
            Some(seed) => ProfileSelector::with_seed(catalog, seed),
            None => ProfileSelector::new(catalog),
        })
    }

    pub fn build_logger(&self) -> TurnLogger {
        TurnLogger::new(&self.log_path)
    }

    /// Gateway over the given client, using this config's model settings.
    pub fn build_gateway(&self, client: OpenRouterClient) -> OpenRouterGateway {
        OpenRouterGateway::new(client, &self.model)
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Read the API key from [`API_KEY_ENV`].
    pub fn api_key_from_env() -> Result<String, SimError> {
        std::env::var(API_KEY_ENV).map_err(|_| {
            SimError::configuration(format!("{API_KEY_ENV} environment variable is not set"))
        })
    }

    /// A controller wired with this config's catalog, log and instructions.
    pub fn build_controller<'a>(
        &self,
        gateway: &'a dyn GenerationGateway,
    ) -> Result<ConversationController<'a>, SimError> {
        Ok(
            ConversationController::new(gateway, self.build_selector()?, self.build_logger())
                .with_instructions(self.instructions.clone()),
        )
    }
}
