use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    LengthBounds, StaticModelLoader, SummarizationClientError, SummarizationEngine,
    SummarizationModel, SummaryLengths,
};

pub(crate) const TEST_LENGTHS: SummaryLengths = SummaryLengths {
    short: LengthBounds {
        max_length: 60,
        min_length: 15,
    },
    detailed: LengthBounds {
        max_length: 180,
        min_length: 60,
    },
};

#[derive(Clone, Copy)]
pub(crate) enum Behavior {
    Succeed,
    Fail,
    Panic,
    Stall(Duration),
}

pub(crate) struct ScriptedModel {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub(crate) fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummarizationModel for ScriptedModel {
    async fn summarize(
        &self,
        text: &str,
        bounds: LengthBounds,
    ) -> Result<String, SummarizationClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => Ok(format!(
                "Covers {} chars. Bounded by {}.",
                text.chars().count(),
                bounds.max_length
            )),
            Behavior::Fail => Err(SummarizationClientError::GenerationFailed(
                "model exploded".into(),
            )),
            Behavior::Panic => panic!("model crashed"),
            Behavior::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Ok("Too late.".into())
            }
        }
    }
}

pub(crate) fn engine_for(model: Arc<ScriptedModel>) -> Arc<SummarizationEngine> {
    Arc::new(SummarizationEngine::new(
        Box::new(StaticModelLoader::new(model)),
        TEST_LENGTHS,
    ))
}
