//! Bounded retries with exponential backoff.
//!
//! A [`RetryPolicy`] is plain configuration. [`execute`] and [`execute_if`] run a unit of work
//! under a policy: the work is invoked, and on failure it is retried after
//! `initial_delay * backoff_multiplier^(attempt - 1)` until `max_attempts` is reached. The error
//! of the last attempt is returned unchanged.
//!
//! Retrying does not make the work safe to repeat. Callers using this for writes are responsible
//! for deduplication (i.e. upserts keyed by a stable id).
//!
//! # Example
//!
//! ```
//! # use std::time::Duration;
//! # use ragline_core::retry::{self, RetryPolicy};
//! # #[tokio::main]
//! # async fn main() {
//! let policy = RetryPolicy::new(3, Duration::from_millis(10), 2.0);
//! let result: Result<u32, String> = retry::execute(&policy, || async { Ok(42) }).await;
//! assert_eq!(result.unwrap(), 42);
//! # }
//! ```
use std::{fmt::Display, future::Future, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::{
    errors::LanguageModelError,
    indexing_traits::{DescribeImage, EmbeddingModel, ImageData, SimplePrompt},
    prompt::Prompt,
    Embeddings,
};

/// How often and how patiently to retry a failing call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Factor applied to the delay for every subsequent attempt.
    pub backoff_multiplier: f64,
    /// Optional overall budget. A retry that would start after the deadline is not scheduled.
    #[serde(default)]
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            deadline: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A policy that tries exactly once.
    pub fn no_retries() -> Self {
        Self::new(1, Duration::ZERO, 1.0)
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// The delay slept after the failure of `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.backoff_multiplier.max(0.0).powi(exponent);

        Duration::try_from_secs_f64(self.initial_delay.as_secs_f64() * factor)
            .unwrap_or(Duration::MAX)
    }

    /// Sum of all delays when every attempt fails and no deadline interferes.
    pub fn total_delay(&self) -> Duration {
        (1..self.attempts())
            .map(|attempt| self.delay_for(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    fn schedule(&self) -> Schedule {
        Schedule {
            policy: *self,
            failures: 0,
            started: Instant::now(),
        }
    }
}

/// Mutable counterpart of a policy for a single `execute` call.
#[derive(Debug)]
struct Schedule {
    policy: RetryPolicy,
    failures: u32,
    started: Instant,
}

impl Schedule {
    /// Records a failure and returns the delay before the next attempt, or `None` if the policy
    /// is exhausted or the delay would end past the deadline.
    fn next_delay(&mut self) -> Option<Duration> {
        self.failures += 1;

        if self.failures >= self.policy.attempts() {
            return None;
        }

        let delay = self.policy.delay_for(self.failures);

        if let Some(deadline) = self.policy.deadline {
            if self.started.elapsed().saturating_add(delay) > deadline {
                tracing::debug!(
                    failures = self.failures,
                    ?delay,
                    ?deadline,
                    "Retry deadline reached"
                );
                return None;
            }
        }

        Some(delay)
    }
}

/// Runs `work` until it succeeds or the policy is exhausted.
///
/// # Errors
///
/// Returns the error of the final attempt, unchanged.
pub async fn execute<T, E, F, Fut>(policy: &RetryPolicy, work: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    execute_if(policy, work, |_| true).await
}

/// Like [`execute`], but stops immediately on errors for which `should_retry` returns false.
///
/// `work` is only invoked for the next attempt once the backoff delay has elapsed.
///
/// # Errors
///
/// Returns the first non-retryable error, or the error of the final attempt, unchanged.
pub async fn execute_if<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    mut work: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut schedule = policy.schedule();

    loop {
        let err = match work().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !should_retry(&err) {
            return Err(err);
        }

        let Some(delay) = schedule.next_delay() else {
            return Err(err);
        };

        tracing::warn!(
            attempt = schedule.failures,
            ?delay,
            error = %err,
            "Attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Decorates a model client so every call is retried under a [`RetryPolicy`].
///
/// Only [`LanguageModelError::TransientError`] is retried; permanent and context length errors
/// are returned on the first occurrence.
#[derive(Debug, Clone)]
pub struct WithRetry<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> WithRetry<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: SimplePrompt> SimplePrompt for WithRetry<P> {
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        execute_if(
            &self.policy,
            || self.inner.prompt(prompt.clone()),
            LanguageModelError::is_transient,
        )
        .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: EmbeddingModel> EmbeddingModel for WithRetry<P> {
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
        execute_if(
            &self.policy,
            || self.inner.embed(input.clone()),
            LanguageModelError::is_transient,
        )
        .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: DescribeImage> DescribeImage for WithRetry<P> {
    async fn describe_image(
        &self,
        prompt: Prompt,
        image: ImageData,
    ) -> Result<String, LanguageModelError> {
        execute_if(
            &self.policy,
            || self.inner.describe_image(prompt.clone(), image.clone()),
            LanguageModelError::is_transient,
        )
        .await
    }
}
