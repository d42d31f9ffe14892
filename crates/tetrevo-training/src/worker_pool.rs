//! Batch-parallel evaluation with scoped threads.

use std::{num::NonZero, thread};

use tetrevo_engine::GameField;
use tetrevo_evaluator::{
    fitness::{EvaluationContext, FitnessEvaluator},
    genotype::Genotype,
};
use tracing::warn;

use crate::EvaluationError;

/// Splits work into contiguous, non-overlapping batches, one scoped thread each.
///
/// Batches hold at least `min_batch` items, so small populations run on fewer
/// threads than `workers`. Every batch owns its worker state (a [`GameField`]
/// for fitness evaluation); nothing is shared between batches except read-only
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
    min_batch: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, NonZero::get);
        Self::new(workers, Self::DEFAULT_MIN_BATCH)
    }
}

impl WorkerPool {
    pub const DEFAULT_MIN_BATCH: usize = 50;

    /// Both values are raised to at least 1.
    #[must_use]
    pub fn new(workers: usize, min_batch: usize) -> Self {
        Self {
            workers: workers.max(1),
            min_batch: min_batch.max(1),
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Items per batch for `len` items.
    #[must_use]
    pub fn batch_size(&self, len: usize) -> usize {
        len.div_ceil(self.workers).max(self.min_batch)
    }

    /// Writes the fitness of `genotypes[i]` to `scores[i]`.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn evaluate(
        &self,
        evaluator: &FitnessEvaluator,
        context: &EvaluationContext,
        genotypes: &[Genotype],
        scores: &mut [f32],
    ) -> Result<(), EvaluationError> {
        self.run(
            genotypes,
            scores,
            || evaluator.new_field(context),
            |field: &mut GameField, genotype| evaluator.evaluate(genotype, context, field).fitness,
        )
    }

    /// Maps `items` into `outputs` batch by batch.
    ///
    /// `init` creates the per-batch state once; `f` is then called for every
    /// item of the batch with that state. A panicking batch is reported as
    /// [`EvaluationError::WorkerPanicked`] after all batches have joined; its
    /// outputs are left partially written.
    ///
    /// # Panics
    ///
    /// Panics if the slices differ in length.
    pub fn run<T, O, S, I, F>(
        &self,
        items: &[T],
        outputs: &mut [O],
        init: I,
        f: F,
    ) -> Result<(), EvaluationError>
    where
        T: Sync,
        O: Send,
        I: Fn() -> S + Sync,
        F: Fn(&mut S, &T) -> O + Sync,
    {
        assert_eq!(items.len(), outputs.len());
        if items.is_empty() {
            return Ok(());
        }
        let batch = self.batch_size(items.len());
        let (init, f) = (&init, &f);

        thread::scope(|s| {
            let handles: Vec<_> = items
                .chunks(batch)
                .zip(outputs.chunks_mut(batch))
                .enumerate()
                .map(|(i, (items, outputs))| {
                    let start = i * batch;
                    let end = start + items.len();
                    let handle = s.spawn(move || {
                        let mut state = init();
                        for (item, output) in items.iter().zip(outputs) {
                            *output = f(&mut state, item);
                        }
                    });
                    (start, end, handle)
                })
                .collect();

            let mut result = Ok(());
            for (start, end, handle) in handles {
                if handle.join().is_err() {
                    warn!("evaluation worker for genotypes {start}..{end} panicked");
                    if result.is_ok() {
                        result = Err(EvaluationError::WorkerPanicked { start, end });
                    }
                }
            }
            result
        })
    }
}
