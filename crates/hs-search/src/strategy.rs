//! Search strategies: candidate generation behind an opaque-state contract.
//!
//! The scheduler only ever calls the trait operations and threads the
//! returned state forward; it never inspects a strategy's state contents.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};
use tracing::debug;

use hs_types::{
    Candidate, ConfigError, History, HistoryEntry, ParamKind, ParamMap, ParamSpace, ParamValue,
    SweepResult,
};

use crate::select::SelectionRule;

/// Common trait for all search strategies.
pub trait SearchStrategy: Send + Sync {
    /// Human-readable strategy name; stored in the config snapshot.
    fn name(&self) -> &str;

    /// Validate inputs and produce the initial generator state.
    fn setup(
        &self,
        base: &ParamMap,
        space: &ParamSpace,
        budget: usize,
        verbose: bool,
    ) -> SweepResult<Value>;

    /// Propose up to `remaining` new candidates given the history so far.
    /// An empty batch signals exhaustion. Returns the batch and the updated
    /// generator state.
    fn generate(
        &self,
        base: &ParamMap,
        history: &History,
        state: Value,
        remaining: usize,
        verbose: bool,
    ) -> SweepResult<(Vec<Candidate>, Value)>;

    /// Budget to use when the configuration leaves it unset.
    fn default_budget(&self, space: &ParamSpace) -> usize;

    /// Extra fields merged into a freshly evaluated entry, computed with the
    /// history-so-far at hand (running statistics and the like).
    fn extras(&self, history: &History, state: &Value, entry: &HistoryEntry) -> Map<String, Value> {
        let _ = (history, state, entry);
        Map::new()
    }

    /// Strategy-specific fields for the final report.
    fn summary(&self, history: &History, state: &Value) -> Map<String, Value> {
        let _ = state;
        let mut fields = Map::new();
        fields.insert("strategy".to_string(), json!(self.name()));
        fields.insert("evaluated".to_string(), json!(history.len()));
        fields
    }

    /// Whether the strategy can work with the given selection rule.
    fn supports(&self, rule: &dyn SelectionRule) -> bool {
        let _ = rule;
        true
    }
}

fn state_u64(state: &Value, key: &str) -> u64 {
    state.get(key).and_then(Value::as_u64).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Grid search
// ---------------------------------------------------------------------------

/// Exhaustive sweep over the cartesian grid of the search space, with a
/// fixed number of steps for continuous dimensions.
///
/// The grid is materialized once at setup and carried in the generator
/// state along with the cursor, so a resumed search continues exactly where
/// it left off without regenerating a point.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    /// Number of steps for continuous dimensions.
    pub float_steps: usize,
}

impl GridStrategy {
    pub fn new(float_steps: usize) -> Self {
        Self { float_steps }
    }

    fn build_grid(&self, space: &ParamSpace) -> Vec<ParamMap> {
        let mut axes: Vec<Vec<(&str, ParamValue)>> = Vec::new();

        for param in &space.parameters {
            let values: Vec<ParamValue> = match &param.kind {
                ParamKind::FloatRange { low, high } => {
                    let steps = self.float_steps.max(2);
                    (0..steps)
                        .map(|i| {
                            let t = i as f64 / (steps - 1) as f64;
                            ParamValue::Float(low + t * (high - low))
                        })
                        .collect()
                }
                ParamKind::IntRange { low, high } => {
                    (*low..=*high).map(ParamValue::Int).collect()
                }
                ParamKind::LogUniform { low, high } => {
                    let steps = self.float_steps.max(2);
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (0..steps)
                        .map(|i| {
                            let t = i as f64 / (steps - 1) as f64;
                            ParamValue::Float((log_low + t * (log_high - log_low)).exp())
                        })
                        .collect()
                }
                ParamKind::Choice { values } => values
                    .iter()
                    .map(|v| ParamValue::Json(v.clone()))
                    .collect(),
            };
            axes.push(
                values
                    .into_iter()
                    .map(|v| (param.name.as_str(), v))
                    .collect(),
            );
        }

        // Cartesian product
        let mut result: Vec<ParamMap> = vec![ParamMap::new()];
        for axis in &axes {
            let mut next = Vec::with_capacity(result.len() * axis.len());
            for existing in &result {
                for (name, value) in axis {
                    let mut combo = existing.clone();
                    combo.insert(name.to_string(), value.clone());
                    next.push(combo);
                }
            }
            result = next;
        }

        result
    }

    fn grid_points(&self, space: &ParamSpace) -> usize {
        space.parameters.iter().fold(1usize, |acc, param| {
            let dim = match &param.kind {
                ParamKind::IntRange { low, high } => (high - low + 1) as usize,
                ParamKind::Choice { values } => values.len(),
                _ => self.float_steps.max(2),
            };
            acc.saturating_mul(dim)
        })
    }
}

impl Default for GridStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl SearchStrategy for GridStrategy {
    fn name(&self) -> &str {
        "grid"
    }

    fn setup(
        &self,
        _base: &ParamMap,
        space: &ParamSpace,
        budget: usize,
        verbose: bool,
    ) -> SweepResult<Value> {
        if space.is_empty() {
            return Err(ConfigError::EmptySpace.into());
        }
        let combos = self.build_grid(space);
        if verbose {
            debug!(budget, grid_points = combos.len(), "grid strategy ready");
        }
        Ok(json!({ "cursor": 0, "combos": combos }))
    }

    fn generate(
        &self,
        _base: &ParamMap,
        _history: &History,
        state: Value,
        remaining: usize,
        verbose: bool,
    ) -> SweepResult<(Vec<Candidate>, Value)> {
        let cursor = state_u64(&state, "cursor") as usize;
        let combos: Vec<ParamMap> = match state.get("combos") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => Vec::new(),
        };

        let end = (cursor + remaining).min(combos.len());
        let batch: Vec<Candidate> = combos[cursor.min(end)..end]
            .iter()
            .cloned()
            .map(Candidate::Plain)
            .collect();
        if verbose {
            debug!(cursor, end, "grid batch generated");
        }

        let new_state = json!({ "cursor": end, "combos": combos });
        Ok((batch, new_state))
    }

    fn default_budget(&self, space: &ParamSpace) -> usize {
        self.grid_points(space)
    }

    fn summary(&self, history: &History, state: &Value) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("strategy".to_string(), json!(self.name()));
        fields.insert("evaluated".to_string(), json!(history.len()));
        fields.insert("cursor".to_string(), json!(state_u64(state, "cursor")));
        fields
    }
}

// ---------------------------------------------------------------------------
// Random search
// ---------------------------------------------------------------------------

/// Independent random sampling across the search space.
///
/// Each draw is seeded by `seed + draw_index`, so the candidate stream is a
/// pure function of the seed: extending a search continues the exact
/// sequence the original run would have produced.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    pub seed: u64,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn sample_one(&self, space: &ParamSpace, draw: u64) -> ParamMap {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(draw));
        let mut params = ParamMap::new();

        for param in &space.parameters {
            let value = match &param.kind {
                ParamKind::FloatRange { low, high } => {
                    ParamValue::Float(rng.gen_range(*low..=*high))
                }
                ParamKind::IntRange { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
                ParamKind::LogUniform { low, high } => {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    let log_val: f64 = rng.gen_range(log_low..=log_high);
                    ParamValue::Float(log_val.exp())
                }
                ParamKind::Choice { values } => {
                    let idx = rng.gen_range(0..values.len());
                    ParamValue::Json(values[idx].clone())
                }
            };
            params.insert(param.name.clone(), value);
        }

        params
    }
}

impl SearchStrategy for RandomStrategy {
    fn name(&self) -> &str {
        "random"
    }

    fn setup(
        &self,
        _base: &ParamMap,
        space: &ParamSpace,
        _budget: usize,
        _verbose: bool,
    ) -> SweepResult<Value> {
        if space.is_empty() {
            return Err(ConfigError::EmptySpace.into());
        }
        Ok(json!({ "space": space, "drawn": 0 }))
    }

    fn generate(
        &self,
        _base: &ParamMap,
        _history: &History,
        state: Value,
        remaining: usize,
        _verbose: bool,
    ) -> SweepResult<(Vec<Candidate>, Value)> {
        let drawn = state_u64(&state, "drawn");
        let space: ParamSpace = match state.get("space") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => ParamSpace::new(),
        };
        if space.is_empty() {
            return Ok((Vec::new(), state));
        }

        let batch: Vec<Candidate> = (0..remaining as u64)
            .map(|i| {
                let draw = drawn + i;
                Candidate::Annotated(self.sample_one(&space, draw), json!({ "draw": draw }))
            })
            .collect();

        let new_state = json!({ "space": space, "drawn": drawn + remaining as u64 });
        Ok((batch, new_state))
    }

    fn default_budget(&self, space: &ParamSpace) -> usize {
        let _ = space;
        100
    }

    fn extras(&self, history: &History, state: &Value, entry: &HistoryEntry) -> Map<String, Value> {
        let _ = (state, entry);
        let mut fields = Map::new();
        fields.insert("history_size_at_eval".to_string(), json!(history.len()));
        fields
    }
}
