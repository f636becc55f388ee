use async_trait::async_trait;

use super::{LengthBounds, SummarizationClientError, SummarizationModel};

/// Deterministic lead-sentence summarizer used when no model can be constructed.
///
/// Takes the first two `.`-delimited segments, joins them with `". "`, and cuts the result
/// to `max_length` characters. `min_length` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveFallback;

impl ExtractiveFallback {
    /// Apply the lead-sentence heuristic to `text`.
    pub fn lead_sentences(text: &str, max_length: usize) -> String {
        let lead = text.trim().split('.').take(2).collect::<Vec<_>>().join(". ");
        lead.chars().take(max_length).collect()
    }
}

#[async_trait]
impl SummarizationModel for ExtractiveFallback {
    async fn summarize(
        &self,
        text: &str,
        bounds: LengthBounds,
    ) -> Result<String, SummarizationClientError> {
        Ok(Self::lead_sentences(text, bounds.max_length))
    }
}
