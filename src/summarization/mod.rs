//! Mode-parameterized summarization over a pluggable text-to-text model.
//!
//! [`SummarizationEngine`] owns an injected [`ModelLoader`] and builds the model at most once,
//! on first non-empty request. When the loader fails the engine installs the deterministic
//! [`ExtractiveFallback`] and reports it through [`SummarizationEngine::backend`], so degraded
//! operation is visible to callers instead of silently masked.

mod fallback;
mod format;
mod ollama;
#[cfg(test)]
pub(crate) mod testing;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::config::{Config, SummarizationProvider};

pub use fallback::ExtractiveFallback;
pub use format::format_detailed_notes;
pub use ollama::{OllamaModelLoader, OllamaSummarizationClient};

/// Errors surfaced by summarization models.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by [`SummarizationEngine::summarize`].
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The model failed while generating one of the requested halves.
    #[error(transparent)]
    Generation(#[from] SummarizationClientError),
    /// The model returned only whitespace for a non-empty input.
    #[error("Model returned an empty summary")]
    EmptyResponse,
}

/// Length bounds passed to the model for a single generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    /// Upper bound on the generated length.
    pub max_length: usize,
    /// Lower bound on the generated length.
    pub min_length: usize,
}

/// Independent bounds for the short summary and the detailed notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLengths {
    /// Bounds for the short summary.
    pub short: LengthBounds,
    /// Bounds for the detailed notes, before bullet formatting.
    pub detailed: LengthBounds,
}

/// Which halves of the summary to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// Short summary only.
    Short,
    /// Detailed bullet notes only.
    Detailed,
    /// Both halves.
    #[default]
    Both,
}

impl SummaryMode {
    fn includes_short(self) -> bool {
        matches!(self, Self::Short | Self::Both)
    }

    fn includes_detailed(self) -> bool {
        matches!(self, Self::Detailed | Self::Both)
    }

    /// Lowercase wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Detailed => "detailed",
            Self::Both => "both",
        }
    }
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(Self::Short),
            "detailed" => Ok(Self::Detailed),
            "both" => Ok(Self::Both),
            other => Err(format!("Invalid summary mode: {other}")),
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated summary text. Halves that were not requested are empty, never absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryOutput {
    /// Brief overview.
    pub short_summary: String,
    /// Bullet-pointed notes, one `- ` line per sentence.
    pub detailed_notes: String,
}

/// Interface implemented by text-to-text summarization models.
#[async_trait]
pub trait SummarizationModel: Send + Sync {
    /// Summarize `text` within the supplied length bounds.
    async fn summarize(
        &self,
        text: &str,
        bounds: LengthBounds,
    ) -> Result<String, SummarizationClientError>;
}

/// Constructs the summarization model on first use.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Build a ready-to-use model, or explain why it is unavailable.
    async fn load(&self) -> Result<Arc<dyn SummarizationModel>, SummarizationClientError>;
}

/// Loader used when no provider is configured; always selects the fallback.
pub struct DisabledModelLoader;

#[async_trait]
impl ModelLoader for DisabledModelLoader {
    async fn load(&self) -> Result<Arc<dyn SummarizationModel>, SummarizationClientError> {
        Err(SummarizationClientError::ProviderUnavailable(
            "no summarization provider configured".into(),
        ))
    }
}

/// Loader that hands out an already-constructed model.
pub struct StaticModelLoader {
    model: Arc<dyn SummarizationModel>,
}

impl StaticModelLoader {
    /// Wrap `model` so an engine can own it.
    pub fn new(model: Arc<dyn SummarizationModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ModelLoader for StaticModelLoader {
    async fn load(&self) -> Result<Arc<dyn SummarizationModel>, SummarizationClientError> {
        Ok(self.model.clone())
    }
}

/// Build a model loader based on configuration.
pub fn get_model_loader(config: &Config) -> Box<dyn ModelLoader> {
    match config.summarization_provider {
        SummarizationProvider::None => Box::new(DisabledModelLoader),
        SummarizationProvider::Ollama => Box::new(OllamaModelLoader::new(
            config.ollama_url.clone(),
            config.summarization_model.clone(),
        )),
    }
}

/// Which implementation is serving summarization requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The loaded model.
    Model,
    /// The deterministic extractive fallback.
    Fallback,
}

struct LoadedModel {
    model: Arc<dyn SummarizationModel>,
    backend: Backend,
}

/// Summarization front end shared by the inline path, the job executor, and direct requests.
pub struct SummarizationEngine {
    loader: Box<dyn ModelLoader>,
    lengths: SummaryLengths,
    model: OnceCell<LoadedModel>,
}

impl SummarizationEngine {
    /// Create an engine that will build its model through `loader` on first use.
    pub fn new(loader: Box<dyn ModelLoader>, lengths: SummaryLengths) -> Self {
        Self {
            loader,
            lengths,
            model: OnceCell::new(),
        }
    }

    /// Create an engine wired to the configured provider.
    pub fn from_config(config: &Config) -> Self {
        Self::new(get_model_loader(config), config.summary_lengths())
    }

    /// Backend in use, or `None` until the first non-empty request has loaded the model.
    pub fn backend(&self) -> Option<Backend> {
        self.model.get().map(|loaded| loaded.backend)
    }

    /// Whether the engine degraded to the extractive fallback.
    pub fn is_fallback(&self) -> bool {
        self.backend() == Some(Backend::Fallback)
    }

    /// Generate the requested summary halves for `text`.
    pub async fn summarize(
        &self,
        text: &str,
        mode: SummaryMode,
    ) -> Result<SummaryOutput, SummarizationError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SummaryOutput::default());
        }

        let loaded = self.loaded_model().await;
        let mut output = SummaryOutput::default();

        if mode.includes_short() {
            output.short_summary = generate(loaded, text, self.lengths.short).await?;
        }
        if mode.includes_detailed() {
            let detailed = generate(loaded, text, self.lengths.detailed).await?;
            output.detailed_notes = format_detailed_notes(&detailed);
        }

        tracing::debug!(
            mode = %mode,
            backend = ?loaded.backend,
            input_chars = text.chars().count(),
            "Summary generated"
        );
        Ok(output)
    }

    async fn loaded_model(&self) -> &LoadedModel {
        self.model
            .get_or_init(|| async {
                match self.loader.load().await {
                    Ok(model) => {
                        tracing::info!("Summarization model loaded");
                        LoadedModel {
                            model,
                            backend: Backend::Model,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            error = %error,
                            "Summarization model unavailable; falling back to extractive summaries"
                        );
                        LoadedModel {
                            model: Arc::new(ExtractiveFallback),
                            backend: Backend::Fallback,
                        }
                    }
                }
            })
            .await
    }
}

async fn generate(
    loaded: &LoadedModel,
    text: &str,
    bounds: LengthBounds,
) -> Result<String, SummarizationError> {
    let summary = loaded.model.summarize(text, bounds).await?;
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(SummarizationError::EmptyResponse);
    }
    Ok(summary.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const LENGTHS: SummaryLengths = SummaryLengths {
        short: LengthBounds {
            max_length: 60,
            min_length: 15,
        },
        detailed: LengthBounds {
            max_length: 180,
            min_length: 60,
        },
    };

    #[derive(Default)]
    struct ScriptedModel {
        calls: Mutex<Vec<LengthBounds>>,
        fail: bool,
    }

    #[async_trait]
    impl SummarizationModel for ScriptedModel {
        async fn summarize(
            &self,
            _text: &str,
            bounds: LengthBounds,
        ) -> Result<String, SummarizationClientError> {
            self.calls.lock().expect("calls").push(bounds);
            if self.fail {
                return Err(SummarizationClientError::GenerationFailed("boom".into()));
            }
            if bounds == LENGTHS.short {
                Ok("A short overview.".into())
            } else {
                Ok("First point. Second point.  . Third point".into())
            }
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        model: Option<Arc<ScriptedModel>>,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self) -> Result<Arc<dyn SummarizationModel>, SummarizationClientError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            match &self.model {
                Some(model) => Ok(model.clone() as Arc<dyn SummarizationModel>),
                None => Err(SummarizationClientError::ProviderUnavailable(
                    "model missing".into(),
                )),
            }
        }
    }

    fn engine_with(model: Option<Arc<ScriptedModel>>) -> (SummarizationEngine, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = CountingLoader {
            loads: loads.clone(),
            model,
        };
        (SummarizationEngine::new(Box::new(loader), LENGTHS), loads)
    }

    #[tokio::test]
    async fn empty_input_skips_model_entirely() {
        let model = Arc::new(ScriptedModel::default());
        let (engine, loads) = engine_with(Some(model.clone()));

        let output = engine
            .summarize("   \n\t", SummaryMode::Both)
            .await
            .expect("summary");

        assert_eq!(output, SummaryOutput::default());
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert!(model.calls.lock().expect("calls").is_empty());
        assert_eq!(engine.backend(), None);
    }

    #[tokio::test]
    async fn short_mode_leaves_detailed_notes_empty() {
        let model = Arc::new(ScriptedModel::default());
        let (engine, _) = engine_with(Some(model.clone()));

        let output = engine
            .summarize("Some text.", SummaryMode::Short)
            .await
            .expect("summary");

        assert_eq!(output.short_summary, "A short overview.");
        assert_eq!(output.detailed_notes, "");
        assert_eq!(*model.calls.lock().expect("calls"), vec![LENGTHS.short]);
    }

    #[tokio::test]
    async fn detailed_mode_leaves_short_summary_empty() {
        let model = Arc::new(ScriptedModel::default());
        let (engine, _) = engine_with(Some(model.clone()));

        let output = engine
            .summarize("Some text.", SummaryMode::Detailed)
            .await
            .expect("summary");

        assert_eq!(output.short_summary, "");
        assert_eq!(
            output.detailed_notes,
            "- First point\n- Second point\n- Third point"
        );
        assert_eq!(*model.calls.lock().expect("calls"), vec![LENGTHS.detailed]);
    }

    #[tokio::test]
    async fn both_mode_populates_both_halves() {
        let model = Arc::new(ScriptedModel::default());
        let (engine, _) = engine_with(Some(model));

        let output = engine
            .summarize("Some text.", SummaryMode::Both)
            .await
            .expect("summary");

        assert!(!output.short_summary.is_empty());
        assert!(!output.detailed_notes.is_empty());
        assert_eq!(engine.backend(), Some(Backend::Model));
        assert!(!engine.is_fallback());
    }

    #[tokio::test]
    async fn model_errors_propagate() {
        let model = Arc::new(ScriptedModel {
            fail: true,
            ..Default::default()
        });
        let (engine, _) = engine_with(Some(model));

        let error = engine
            .summarize("Some text.", SummaryMode::Both)
            .await
            .expect_err("generation failure");
        assert!(matches!(error, SummarizationError::Generation(_)));
    }

    #[tokio::test]
    async fn loader_failure_switches_to_observable_fallback() {
        let (engine, loads) = engine_with(None);
        let text = "The pipeline extracts text. It then summarizes it. Finally it stores results.";

        let first = engine
            .summarize(text, SummaryMode::Both)
            .await
            .expect("fallback summary");
        let second = engine
            .summarize(text, SummaryMode::Both)
            .await
            .expect("fallback summary");

        assert_eq!(engine.backend(), Some(Backend::Fallback));
        assert!(engine.is_fallback());
        assert_eq!(first, second);
        assert_eq!(
            first.short_summary,
            "The pipeline extracts text.  It then summarizes it"
        );
        assert_eq!(
            first.detailed_notes,
            "- The pipeline extracts text\n- It then summarizes it"
        );
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn punctuation_only_input_still_populates_both_halves() {
        let engine = SummarizationEngine::new(Box::new(DisabledModelLoader), LENGTHS);

        let output = engine
            .summarize("...", SummaryMode::Both)
            .await
            .expect("fallback summary");

        assert!(!output.short_summary.is_empty());
        assert_eq!(output.detailed_notes, "- ");
    }

    #[tokio::test]
    async fn concurrent_first_use_loads_model_once() {
        let model = Arc::new(ScriptedModel::default());
        let (engine, loads) = engine_with(Some(model));
        let engine = Arc::new(engine);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.summarize("Some text.", SummaryMode::Short).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("summary");
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_loader_always_falls_back() {
        let engine = SummarizationEngine::new(Box::new(DisabledModelLoader), LENGTHS);
        let output = engine
            .summarize("One. Two. Three.", SummaryMode::Short)
            .await
            .expect("summary");
        assert_eq!(output.short_summary, "One.  Two");
        assert!(engine.is_fallback());
    }

    #[test]
    fn mode_parses_wire_names() {
        assert_eq!("short".parse::<SummaryMode>(), Ok(SummaryMode::Short));
        assert_eq!("DETAILED".parse::<SummaryMode>(), Ok(SummaryMode::Detailed));
        assert_eq!("both".parse::<SummaryMode>(), Ok(SummaryMode::Both));
        assert!("everything".parse::<SummaryMode>().is_err());
        assert_eq!(SummaryMode::default(), SummaryMode::Both);
    }
}
