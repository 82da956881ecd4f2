//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The same provider must be used for ingestion and querying: distances are
/// only comparable inside one embedding space. The default
/// [`embed_batch`](EmbeddingProvider::embed_batch) calls
/// [`embed`](EmbeddingProvider::embed) sequentially; backends with native
/// batching should override it.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Identifier of the embedding model, used in logs.
    fn model_name(&self) -> &str;
}

/// Cut `text` down to roughly `max_tokens` tokens, keeping the leading text.
///
/// Tokens are estimated as whitespace-separated words, with a hard cap of eight
/// characters per token so long unbroken strings are bounded too.
pub fn truncate_for_embedding(text: &str, max_tokens: usize) -> &str {
    let mut end = text.len();
    let mut words = 0usize;
    let mut in_word = false;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_word = false;
            continue;
        }
        if !in_word {
            if words == max_tokens {
                end = idx;
                break;
            }
            words += 1;
            in_word = true;
        }
    }

    if let Some((idx, _)) = text.char_indices().nth(max_tokens.saturating_mul(8)) {
        end = end.min(idx);
    }

    text[..end].trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(truncate_for_embedding("the court held", 10), "the court held");
    }

    #[test]
    fn keeps_leading_words() {
        assert_eq!(truncate_for_embedding("one two three four five", 3), "one two three");
    }

    #[test]
    fn caps_unbroken_text_by_characters() {
        let text = "x".repeat(100);
        assert_eq!(truncate_for_embedding(&text, 5).len(), 40);
    }

    #[test]
    fn respects_multibyte_boundaries() {
        let text = "§".repeat(50);
        let cut = truncate_for_embedding(&text, 2);
        assert_eq!(cut.chars().count(), 16);
    }
}
