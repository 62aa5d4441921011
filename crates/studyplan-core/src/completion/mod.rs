//! Text-completion collaborator interface.
//!
//! Nodes talk to the generative model only through [`TextCompletion`]. The
//! crate ships one concrete adapter, [`CommandCompletion`], which pipes the
//! prompt through an external command.

pub mod command;

use anyhow::Result;
use async_trait::async_trait;

pub use command::CommandCompletion;

/// An opaque, possibly failing text-completion service.
///
/// Object-safe so nodes can hold it as `Arc<dyn TextCompletion>`.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Complete `prompt`. `search_enabled` selects the search-augmented
    /// mode used for book discovery.
    async fn complete(&self, prompt: &str, temperature: f64, search_enabled: bool)
    -> Result<String>;
}

// Compile-time assertion: TextCompletion must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn TextCompletion) {}
};

/// Sampling settings for one kind of completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionProfile {
    pub temperature: f64,
    pub search_enabled: bool,
}

impl CompletionProfile {
    pub const ANALYSIS: Self = Self::baseline(0.7);
    pub const PLAN_STRUCTURING: Self = Self::baseline(0.7);
    pub const REPLANNING: Self = Self::baseline(0.6);
    pub const GLOBAL_VALIDATION: Self = Self::baseline(0.5);

    const fn baseline(temperature: f64) -> Self {
        Self {
            temperature,
            search_enabled: false,
        }
    }

    /// Search-augmented mode for book research.
    pub const fn search(temperature: f64) -> Self {
        Self {
            temperature,
            search_enabled: true,
        }
    }

    /// Issue `prompt` to `completion` with this profile's settings.
    pub async fn complete(&self, completion: &dyn TextCompletion, prompt: &str) -> Result<String> {
        completion
            .complete(prompt, self.temperature, self.search_enabled)
            .await
    }
}
