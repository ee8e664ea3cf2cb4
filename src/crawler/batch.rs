//! Bounded-concurrency batch dispatch
//!
//! Items are split into chunks of `batch_size`. Items within a chunk run
//! concurrently; chunks run one after another. A failing item never aborts
//! its chunk or the run, it just becomes a [`BatchOutcome::Failed`].

use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;

/// Result of processing one item
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<T, R> {
    Completed { input: T, output: R },
    Failed { error: String, original_input: T },
}

impl<T, R> BatchOutcome<T, R> {
    pub fn is_completed(&self) -> bool {
        matches!(self, BatchOutcome::Completed { .. })
    }

    pub fn input(&self) -> &T {
        match self {
            BatchOutcome::Completed { input, .. } => input,
            BatchOutcome::Failed { original_input, .. } => original_input,
        }
    }
}

/// Counts over a finished batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_outcomes<T, R>(outcomes: &[BatchOutcome<T, R>]) -> Self {
        let successful = outcomes.iter().filter(|o| o.is_completed()).count();
        Self {
            total: outcomes.len(),
            successful,
            failed: outcomes.len() - successful,
        }
    }

    /// Fraction of completed items, 0 for an empty run
    pub fn success_rate(&self) -> f64 {
        match self.total {
            0 => 0.0,
            n => self.successful as f64 / n as f64,
        }
    }
}

/// Runs `worker` over every item, at most `batch_size` at a time
///
/// The returned outcomes are in input order and there is exactly one per
/// item. A `batch_size` of zero is treated as one.
pub async fn run_batches<T, R, E, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    worker: F,
) -> Vec<BatchOutcome<T, R>>
where
    T: Clone,
    E: Display,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let batch_size = batch_size.max(1);
    let mut outcomes = Vec::with_capacity(items.len());

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        tracing::debug!(batch = index + 1, size = chunk.len(), "Dispatching batch");

        let tasks = chunk.iter().cloned().map(|input| {
            let task = worker(input.clone());
            async move {
                match task.await {
                    Ok(output) => BatchOutcome::Completed { input, output },
                    Err(e) => BatchOutcome::Failed {
                        error: e.to_string(),
                        original_input: input,
                    },
                }
            }
        });

        outcomes.extend(join_all(tasks).await);
    }

    outcomes
}
