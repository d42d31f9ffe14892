use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tetrevo_engine::RuleSettings;
use tetrevo_evaluator::{
    fitness::{Evaluation, EvaluationContext, FitnessEvaluator, FitnessWeights},
    genotype::Genotype,
};

/// Saved outcome of a `search` or `anneal` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub rules: RuleSettings,
    /// Weights the recorded evaluations were computed with.
    pub fitness_weights: FitnessWeights,
    /// One entry per round, in play order.
    pub rounds: Vec<RoundResult>,
}

/// Best sequence of one round, with everything needed to play it again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundResult {
    pub evaluation: Evaluation,
    pub genotype: Genotype,
    /// Bag seed, bag size and start grid of the round.
    pub context: EvaluationContext,
}

impl SearchResult {
    pub fn new(seed: u64, evaluator: &FitnessEvaluator) -> Self {
        Self {
            created_at: Utc::now(),
            seed,
            rules: evaluator.settings().clone(),
            fitness_weights: *evaluator.weights(),
            rounds: vec![],
        }
    }

    pub fn evaluator(&self) -> FitnessEvaluator {
        FitnessEvaluator::new(self.rules.clone(), self.fitness_weights)
    }

    /// Evaluates `genotype` and appends it as the next round.
    pub fn push_round(
        &mut self,
        evaluator: &FitnessEvaluator,
        genotype: Genotype,
        context: EvaluationContext,
    ) -> &RoundResult {
        let mut field = evaluator.new_field(&context);
        let evaluation = evaluator.evaluate(&genotype, &context, &mut field);
        self.rounds.push(RoundResult {
            evaluation,
            genotype,
            context,
        });
        &self.rounds[self.rounds.len() - 1]
    }
}
