//! Dice rolling value objects and parsing
//!
//! Supports dice formulas like "1d20+5", "2d6-1", "4d6kh3", "4d6kl1", "d20adv" and
//! "d20dis". Randomness is injected by the caller as a closure returning a face in
//! `1..=die_size`, so the domain stays free of an RNG dependency.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest number of dice a single formula may roll.
pub const MAX_DICE: u32 = 100;
/// Largest die size a formula may use.
pub const MAX_DIE_SIZE: u32 = 1000;

/// Error when parsing a dice formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The formula string is empty
    #[error("Empty dice formula")]
    Empty,
    /// Invalid format - expected XdY, XdYkhN or XdY+Z
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    /// Dice count must be within 1..=MAX_DICE
    #[error("Dice count must be between 1 and 100")]
    InvalidDiceCount,
    /// Die size must be within 2..=MAX_DIE_SIZE
    #[error("Die size must be between 2 and 1000")]
    InvalidDieSize,
    /// Keep count must be within 1..=dice count
    #[error("Keep count must be between 1 and the number of dice")]
    InvalidKeepCount,
}

/// Which dice survive a keep clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "count", rename_all = "snake_case")]
pub enum Keep {
    Highest(u32),
    Lowest(u32),
}

/// A parsed dice formula like "4d6kh3+1"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY)
    pub dice_count: u32,
    /// Size of each die (Y in XdY)
    pub die_size: u32,
    /// Optional keep-highest / keep-lowest clause
    pub keep: Option<Keep>,
    /// Modifier to add/subtract after rolling (+Z or -Z)
    pub modifier: i32,
}

impl DiceFormula {
    /// Create a new dice formula
    pub fn new(
        dice_count: u32,
        die_size: u32,
        keep: Option<Keep>,
        modifier: i32,
    ) -> Result<Self, DiceParseError> {
        if dice_count == 0 || dice_count > MAX_DICE {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if !(2..=MAX_DIE_SIZE).contains(&die_size) {
            return Err(DiceParseError::InvalidDieSize);
        }
        if let Some(Keep::Highest(n) | Keep::Lowest(n)) = keep {
            if n == 0 || n > dice_count {
                return Err(DiceParseError::InvalidKeepCount);
            }
        }
        Ok(Self {
            dice_count,
            die_size,
            keep,
            modifier,
        })
    }

    /// Parse a dice formula string.
    ///
    /// Supported formats:
    /// - "XdY" / "dY" - Roll X (default 1) dice of size Y
    /// - "XdY+Z" / "XdY-Z" - Add or subtract a modifier
    /// - "XdYkhN" / "XdYkN" - Keep the highest N dice
    /// - "XdYklN" - Keep the lowest N dice
    /// - "dYadv" / "dYdis" - Advantage or disadvantage: two dice, keep one
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let mut input: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let mut forced: Option<(u32, Keep)> = None;
        for (suffix, keep) in [("adv", Keep::Highest(1)), ("dis", Keep::Lowest(1))] {
            if let Some(pos) = input.find(suffix) {
                input.replace_range(pos..pos + suffix.len(), "");
                forced = Some((2, keep));
            }
        }

        let d_pos = input.find('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("Missing 'd' separator in '{}'", input))
        })?;

        let count_str = &input[..d_pos];
        let mut dice_count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("Invalid dice count: '{}'", count_str))
            })?
        };

        // Split "Y[kN][+/-Z]" into its parts.
        let rest = &input[d_pos + 1..];
        let (body, modifier) = match rest.find(|c: char| c == '+' || c == '-') {
            Some(pos) => {
                let mod_str = &rest[pos..];
                let modifier: i32 = mod_str.parse().map_err(|_| {
                    DiceParseError::InvalidFormat(format!("Invalid modifier: '{}'", mod_str))
                })?;
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        let (size_str, mut keep) = match body.find('k') {
            Some(pos) => {
                let clause = &body[pos + 1..];
                let (mode, count_str) = match clause.chars().next() {
                    Some('h') => ("h", &clause[1..]),
                    Some('l') => ("l", &clause[1..]),
                    _ => ("h", clause),
                };
                let n: u32 = count_str.parse().map_err(|_| {
                    DiceParseError::InvalidFormat(format!("Invalid keep clause: 'k{}'", clause))
                })?;
                let keep = if mode == "l" {
                    Keep::Lowest(n)
                } else {
                    Keep::Highest(n)
                };
                (&body[..pos], Some(keep))
            }
            None => (body, None),
        };

        let die_size: u32 = size_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("Invalid die size: '{}'", size_str))
        })?;

        if let Some((count, forced_keep)) = forced {
            dice_count = dice_count.max(count);
            keep = Some(forced_keep);
        }

        Self::new(dice_count, die_size, keep, modifier)
    }

    /// Roll the formula. `roll_die` receives the die size and must return a face in
    /// `1..=die_size`; out-of-range faces are clamped.
    pub fn roll(&self, mut roll_die: impl FnMut(u32) -> u32) -> DiceRollResult {
        let all: Vec<u32> = (0..self.dice_count)
            .map(|_| roll_die(self.die_size).clamp(1, self.die_size))
            .collect();

        let (kept, dropped) = match self.keep {
            Some(keep) => {
                let mut sorted = all.clone();
                let n = match keep {
                    Keep::Highest(n) => {
                        sorted.sort_unstable_by(|a, b| b.cmp(a));
                        n
                    }
                    Keep::Lowest(n) => {
                        sorted.sort_unstable();
                        n
                    }
                };
                let dropped = sorted.split_off(n as usize);
                (sorted, dropped)
            }
            None => (all.clone(), Vec::new()),
        };

        let dice_total: i64 = kept.iter().map(|r| i64::from(*r)).sum();
        DiceRollResult {
            notation: self.to_string(),
            rolled: all,
            kept,
            dropped,
            modifier: self.modifier,
            total: dice_total + i64::from(self.modifier),
        }
    }

    /// Get the minimum possible roll
    pub fn min_roll(&self) -> i64 {
        i64::from(self.kept_count()) + i64::from(self.modifier)
    }

    /// Get the maximum possible roll
    pub fn max_roll(&self) -> i64 {
        i64::from(self.kept_count()) * i64::from(self.die_size) + i64::from(self.modifier)
    }

    fn kept_count(&self) -> u32 {
        match self.keep {
            Some(Keep::Highest(n) | Keep::Lowest(n)) => n,
            None => self.dice_count,
        }
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.dice_count, self.die_size)?;
        match self.keep {
            Some(Keep::Highest(n)) => write!(f, "kh{}", n)?,
            Some(Keep::Lowest(n)) => write!(f, "kl{}", n)?,
            None => {}
        }
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

/// Result of rolling dice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollResult {
    /// Canonical notation that was rolled
    pub notation: String,
    /// Every die rolled, in roll order
    pub rolled: Vec<u32>,
    /// Dice counted toward the total
    pub kept: Vec<u32>,
    /// Dice discarded by a keep clause
    pub dropped: Vec<u32>,
    /// Modifier that was applied
    pub modifier: i32,
    /// Final total (kept dice + modifier)
    pub total: i64,
}

impl DiceRollResult {
    /// Format as a breakdown string (e.g., "4d6kh3 [6, 4, 3] +1 = 14")
    pub fn breakdown(&self) -> String {
        let kept: Vec<String> = self.kept.iter().map(|r| r.to_string()).collect();
        let mut out = format!("{} [{}]", self.notation, kept.join(", "));
        if !self.dropped.is_empty() {
            let dropped: Vec<String> = self.dropped.iter().map(|r| r.to_string()).collect();
            out.push_str(&format!(" dropped [{}]", dropped.join(", ")));
        }
        if self.modifier > 0 {
            out.push_str(&format!(" +{}", self.modifier));
        } else if self.modifier < 0 {
            out.push_str(&format!(" {}", self.modifier));
        }
        out.push_str(&format!(" = {}", self.total));
        out
    }
}

/// Pick an index from a weighted table given a roll in `1..=sum(weights)`.
///
/// Returns `None` when the table is empty or every weight is zero.
pub fn pick_weighted(weights: &[u32], roll: u32) -> Option<usize> {
    let mut remaining = roll;
    for (idx, weight) in weights.iter().enumerate() {
        if *weight == 0 {
            continue;
        }
        if remaining <= *weight {
            return Some(idx);
        }
        remaining -= weight;
    }
    None
}
