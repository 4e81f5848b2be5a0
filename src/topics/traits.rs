// Entity extractor trait — swap-ready abstraction.
//
// Messages are annotated with named entities after they're written. The
// default implementation runs TF-IDF locally; a hosted natural-language API
// could slot in behind the same trait.

use anyhow::Result;

use crate::chat::models::Entity;

/// Trait for extracting weighted entities from a single message's text.
pub trait EntityExtractor: Send + Sync {
    /// Analyze one message and return its entities, most salient first.
    fn extract(&self, text: &str) -> Result<Vec<Entity>>;
}
