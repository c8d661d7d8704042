//! Content generation service
//!
//! The entitlement flow only needs to know whether a generation succeeded.
//! [`Generator`] is the seam where a real completion backend plugs in;
//! [`EchoGenerator`] is the bundled deterministic implementation.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::time::Duration;

/// A service that turns a prompt into generated content
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generator that builds a fixed outline from the prompt
///
/// Useful for local runs and tests; it never calls out to the network.
#[derive(Debug, Clone, Default)]
pub struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bail!("Prompt is empty");
        }

        Ok(format!(
            "Lesson plan: {prompt}\n\
             1. Warm-up\n\
             2. Introduction of {prompt}\n\
             3. Guided practice\n\
             4. Independent practice\n\
             5. Reflection"
        ))
    }
}

/// Why a generation produced no output
#[derive(Debug)]
pub enum GenerationFailure {
    /// The generator did not answer within the configured timeout
    TimedOut(Duration),
    Failed(anyhow::Error),
}

impl std::fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationFailure::TimedOut(limit) => {
                write!(f, "Generation timed out after {}ms", limit.as_millis())
            }
            GenerationFailure::Failed(e) => write!(f, "Generation failed: {e}"),
        }
    }
}

impl std::error::Error for GenerationFailure {}

/// Run `generator` with an upper bound on how long it may take
pub async fn generate_with_timeout(
    generator: &dyn Generator,
    prompt: &str,
    limit: Duration,
) -> std::result::Result<String, GenerationFailure> {
    match tokio::time::timeout(limit, generator.generate(prompt)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(GenerationFailure::Failed(e)),
        Err(_) => Err(GenerationFailure::TimedOut(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator(Duration);

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            tokio::time::sleep(self.0).await;
            Ok("late".into())
        }
    }

    #[test]
    fn test_echo_generator_mentions_prompt() {
        let output = tokio_test::block_on(EchoGenerator.generate("fractions"));
        let output = tokio_test::assert_ok!(output);
        assert!(output.contains("fractions"));
    }

    #[test]
    fn test_echo_generator_rejects_blank_prompt() {
        tokio_test::assert_err!(tokio_test::block_on(EchoGenerator.generate("   ")));
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let generator = SlowGenerator(Duration::from_secs(5));
        let result =
            generate_with_timeout(&generator, "anything", Duration::from_millis(10)).await;
        assert!(matches!(result, Err(GenerationFailure::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_generator_error_is_reported() {
        let result =
            generate_with_timeout(&EchoGenerator, "", Duration::from_secs(1)).await;
        match result {
            Err(GenerationFailure::Failed(e)) => assert!(e.to_string().contains("empty")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
