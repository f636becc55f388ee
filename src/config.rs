use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

use crate::extraction::ExtractionLimits;
use crate::summarization::{LengthBounds, SummaryLengths};

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARIZATION_MODEL: &str = "llama3.2";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarization pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Uploads larger than this many megabytes are rejected before extraction.
    pub max_document_size_mb: u64,
    /// Extracted text is cut to this many characters.
    pub max_extract_chars: usize,
    /// Documents with at most this many characters are summarized inline.
    pub auto_summary_max_chars: usize,
    /// Upper bound passed to the model for the short summary.
    pub summary_short_max_len: usize,
    /// Lower bound passed to the model for the short summary.
    pub summary_short_min_len: usize,
    /// Upper bound passed to the model for the detailed notes.
    pub summary_detailed_max_len: usize,
    /// Lower bound passed to the model for the detailed notes.
    pub summary_detailed_min_len: usize,
    /// Backend used to generate abstractive summaries.
    pub summarization_provider: SummarizationProvider,
    /// Model identifier passed to the provider.
    pub summarization_model: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Number of summary jobs executed concurrently by the worker pool.
    pub summary_workers: usize,
    /// Maximum wall-clock time a claimed job may spend generating.
    pub summary_job_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported summarization backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummarizationProvider {
    /// No model; the engine always runs the extractive fallback.
    None,
    /// Local Ollama runtime.
    Ollama,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            max_document_size_mb: load_parsed("MAX_DOCUMENT_SIZE_MB", 25)?,
            max_extract_chars: load_parsed("MAX_EXTRACT_CHAR", 60_000)?,
            auto_summary_max_chars: load_parsed("AUTO_SUMMARY_MAX_CHAR", 40_000)?,
            summary_short_max_len: load_parsed("SUMMARY_SHORT_MAX_LEN", 60)?,
            summary_short_min_len: load_parsed("SUMMARY_SHORT_MIN_LEN", 15)?,
            summary_detailed_max_len: load_parsed("SUMMARY_DETAILED_MAX_LEN", 180)?,
            summary_detailed_min_len: load_parsed("SUMMARY_DETAILED_MIN_LEN", 60)?,
            summarization_provider: load_env_optional("SUMMARIZATION_PROVIDER")
                .map(|value| {
                    value.parse().map_err(|()| {
                        ConfigError::InvalidValue("SUMMARIZATION_PROVIDER".to_string())
                    })
                })
                .transpose()?
                .unwrap_or(SummarizationProvider::None),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| DEFAULT_SUMMARIZATION_MODEL.to_string()),
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            summary_workers: load_parsed("SUMMARY_WORKERS", 2)?,
            summary_job_timeout_secs: load_parsed("SUMMARY_JOB_TIMEOUT_SECS", 300)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }

    /// Size and length limits applied by the extractor.
    pub fn extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            max_document_size_mb: self.max_document_size_mb,
            max_extract_chars: self.max_extract_chars,
        }
    }

    /// Model length bounds for both summary halves.
    pub fn summary_lengths(&self) -> SummaryLengths {
        SummaryLengths {
            short: LengthBounds {
                max_length: self.summary_short_max_len,
                min_length: self.summary_short_min_len,
            },
            detailed: LengthBounds {
                max_length: self.summary_detailed_max_len,
                min_length: self.summary_detailed_min_len,
            },
        }
    }

    /// Timeout applied to each asynchronous summary job.
    pub fn summary_job_timeout(&self) -> Duration {
        Duration::from_secs(self.summary_job_timeout_secs)
    }
}

fn load_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl FromStr for SummarizationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "fallback" => Ok(Self::None),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        max_document_size_mb = config.max_document_size_mb,
        max_extract_chars = config.max_extract_chars,
        auto_summary_max_chars = config.auto_summary_max_chars,
        provider = ?config.summarization_provider,
        model = %config.summarization_model,
        workers = config.summary_workers,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!(
            "Ollama".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::Ollama)
        );
        assert_eq!(
            "none".parse::<SummarizationProvider>(),
            Ok(SummarizationProvider::None)
        );
        assert!("openai".parse::<SummarizationProvider>().is_err());
    }

    fn set_env(key: &str, value: &str) {
        // SAFETY: every test in this module uses its own variable names.
        unsafe {
            env::set_var(key, value);
        }
    }

    #[test]
    fn parsed_values_fall_back_trim_and_reject_garbage() {
        assert_eq!(load_parsed("DOCSUM_TEST_UNSET_LIMIT", 25u64).expect("default"), 25);

        set_env("DOCSUM_TEST_BLANK_LIMIT", "   ");
        assert_eq!(load_parsed("DOCSUM_TEST_BLANK_LIMIT", 7usize).expect("blank"), 7);

        set_env("DOCSUM_TEST_PADDED_LIMIT", " 4096 \n");
        assert_eq!(
            load_parsed("DOCSUM_TEST_PADDED_LIMIT", 0usize).expect("trimmed"),
            4096
        );

        set_env("DOCSUM_TEST_BAD_LIMIT", "lots");
        let error = load_parsed("DOCSUM_TEST_BAD_LIMIT", 1usize).expect_err("invalid");
        assert!(
            matches!(error, ConfigError::InvalidValue(ref key) if key == "DOCSUM_TEST_BAD_LIMIT")
        );
    }

    #[test]
    fn summary_lengths_keep_bounds_independent() {
        let config = Config {
            max_document_size_mb: 25,
            max_extract_chars: 60_000,
            auto_summary_max_chars: 40_000,
            summary_short_max_len: 60,
            summary_short_min_len: 15,
            summary_detailed_max_len: 180,
            summary_detailed_min_len: 60,
            summarization_provider: SummarizationProvider::None,
            summarization_model: "test".into(),
            ollama_url: DEFAULT_OLLAMA_URL.into(),
            summary_workers: 1,
            summary_job_timeout_secs: 5,
            server_port: None,
        };

        let lengths = config.summary_lengths();
        assert_eq!(lengths.short.max_length, 60);
        assert_eq!(lengths.short.min_length, 15);
        assert_eq!(lengths.detailed.max_length, 180);
        assert_eq!(lengths.detailed.min_length, 60);
        assert_eq!(config.summary_job_timeout(), Duration::from_secs(5));
        assert_eq!(config.extraction_limits().max_extract_chars, 60_000);
    }
}
