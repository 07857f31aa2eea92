use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// LanguageModel Trait
// =============================================================================

/// A text generation backend: one prompt in, one completion out.
///
/// Every provider adapter implements this; callers hold a list of
/// `Arc<dyn LanguageModel>` and never see provider wire formats.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Display name, stable across calls.
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String>;
}
