//! Dice and other stateless randomness.
//!
//! Every draw goes through [`RandomPort`] so tests can script the faces.

use std::sync::Arc;

use serde::Serialize;

use questkeep_domain::value_objects::{pick_weighted, DiceParseError};
use questkeep_domain::{DiceFormula, DiceRollResult};

use crate::infrastructure::ports::RandomPort;
use crate::use_cases::validation::ValidationError;

/// Upper bound on repeated rolls of one formula per call.
pub const MAX_REPEATS: u32 = 100;
/// Formula used by `roll_stats` when none is given.
pub const DEFAULT_STAT_METHOD: &str = "4d6kh3";
const STAT_COUNT: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum DiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Dice error: {0}")]
    Parse(#[from] DiceParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollOutcome {
    pub notation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub rolls: Vec<DiceRollResult>,
    /// Human-readable line per roll, e.g. "2d6 [3, 5] +1 = 9"
    pub details: Vec<String>,
    pub sum: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoinFace {
    Heads,
    Tails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoinFlip {
    pub result: CoinFace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PercentileRoll {
    pub value: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatArray {
    pub method: String,
    pub scores: Vec<i64>,
    pub total: i64,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRoll {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub index: usize,
    pub chosen: String,
    pub from_options: usize,
}

pub struct DiceOps {
    random: Arc<dyn RandomPort>,
}

impl DiceOps {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }

    /// Roll `notation` once, or `times` times.
    pub fn roll(
        &self,
        notation: &str,
        times: Option<u32>,
        reason: Option<String>,
    ) -> Result<RollOutcome, DiceError> {
        let times = times.unwrap_or(1);
        if times == 0 || times > MAX_REPEATS {
            return Err(ValidationError::Invalid {
                field_name: "times",
                reason: format!("must be between 1 and {}", MAX_REPEATS),
            }
            .into());
        }
        let formula = DiceFormula::parse(notation)?;
        let rolls: Vec<DiceRollResult> = (0..times).map(|_| self.roll_formula(&formula)).collect();

        tracing::debug!(notation = %formula, times, "Dice rolled");
        Ok(RollOutcome {
            notation: formula.to_string(),
            reason,
            details: rolls.iter().map(DiceRollResult::breakdown).collect(),
            sum: rolls.iter().map(|r| r.total).sum(),
            rolls,
        })
    }

    pub fn coin_flip(&self, reason: Option<String>) -> CoinFlip {
        let result = if self.random.gen_range(0, 1) == 0 {
            CoinFace::Heads
        } else {
            CoinFace::Tails
        };
        CoinFlip { result, reason }
    }

    pub fn percentile(&self, reason: Option<String>) -> PercentileRoll {
        let value = self.random.gen_range(1, 100).clamp(1, 100) as u32;
        PercentileRoll { value, reason }
    }

    /// Six ability scores, by default each the best three of 4d6.
    pub fn roll_stats(&self, method: Option<&str>) -> Result<StatArray, DiceError> {
        let formula = DiceFormula::parse(method.unwrap_or(DEFAULT_STAT_METHOD))?;
        let rolls: Vec<DiceRollResult> = (0..STAT_COUNT)
            .map(|_| self.roll_formula(&formula))
            .collect();
        let scores: Vec<i64> = rolls.iter().map(|r| r.total).collect();
        Ok(StatArray {
            method: formula.to_string(),
            total: scores.iter().sum(),
            scores,
            details: rolls.iter().map(DiceRollResult::breakdown).collect(),
        })
    }

    /// Pick one option. Without weights every option is equally likely.
    pub fn random_table(
        &self,
        options: Vec<String>,
        weights: Option<Vec<u32>>,
        table: Option<String>,
    ) -> Result<TableRoll, DiceError> {
        if options.is_empty() {
            return Err(ValidationError::Empty {
                field_name: "options",
            }
            .into());
        }
        let weights = match weights {
            Some(w) if w.len() != options.len() => {
                return Err(ValidationError::Invalid {
                    field_name: "weights",
                    reason: format!("expected {} weights, got {}", options.len(), w.len()),
                }
                .into());
            }
            Some(w) => w,
            None => vec![1; options.len()],
        };

        let total: u64 = weights.iter().map(|w| u64::from(*w)).sum();
        let top = i32::try_from(total)
            .ok()
            .filter(|t| *t > 0)
            .ok_or_else(|| ValidationError::Invalid {
                field_name: "weights",
                reason: "total weight must be between 1 and 2147483647".into(),
            })?;
        let roll = self.random.gen_range(1, top).clamp(1, top) as u32;
        let index = pick_weighted(&weights, roll).ok_or_else(|| ValidationError::Invalid {
            field_name: "weights",
            reason: "no option has a positive weight".into(),
        })?;

        let from_options = options.len();
        let chosen = options.into_iter().nth(index).unwrap_or_default();
        Ok(TableRoll {
            table,
            index,
            chosen,
            from_options,
        })
    }

    fn roll_formula(&self, formula: &DiceFormula) -> DiceRollResult {
        formula.roll(|size| self.random.gen_range(1, size as i32).max(1) as u32)
    }
}
