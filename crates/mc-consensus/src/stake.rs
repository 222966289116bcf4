use std::collections::BTreeMap;

use crate::ConsensusError;

/// Validator identifier → staked amount.
///
/// Iteration is in identifier order, which fixes the walk order used by
/// stake-weighted selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StakeTable {
    stakes: BTreeMap<String, f64>,
}

impl StakeTable {
    /// Build a table from `(validator, stake)` pairs.  Later duplicates
    /// overwrite earlier ones.
    pub fn new<I, K>(entries: I) -> Result<Self, ConsensusError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let mut table = Self::default();
        for (validator, stake) in entries {
            table.insert(validator, stake)?;
        }
        Ok(table)
    }

    /// Set `validator`'s stake, returning the previous value.
    ///
    /// The stake must be finite and non-negative, and the table total must
    /// stay finite once it is added.
    pub fn insert(
        &mut self,
        validator: impl Into<String>,
        stake: f64,
    ) -> Result<Option<f64>, ConsensusError> {
        let validator = validator.into();
        if !(stake >= 0.0 && stake.is_finite()) {
            return Err(ConsensusError::InvalidStake { validator, stake });
        }
        let previous = self.stakes.insert(validator.clone(), stake);
        if !self.total().is_finite() {
            match previous {
                Some(old) => self.stakes.insert(validator.clone(), old),
                None => self.stakes.remove(&validator),
            };
            return Err(ConsensusError::StakeOverflow { validator, stake });
        }
        Ok(previous)
    }

    pub fn get(&self, validator: &str) -> Option<f64> {
        self.stakes.get(validator).copied()
    }

    pub fn contains(&self, validator: &str) -> bool {
        self.stakes.contains_key(validator)
    }

    /// Sum of all stakes.
    pub fn total(&self) -> f64 {
        self.stakes.values().sum()
    }

    pub fn len(&self) -> usize {
        self.stakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stakes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.stakes.iter().map(|(id, stake)| (id.as_str(), *stake))
    }

    /// Multiply `validator`'s stake by `factor` in place.  Returns the
    /// `(before, after)` stakes, or `None` for an unknown validator.
    pub(crate) fn scale(&mut self, validator: &str, factor: f64) -> Option<(f64, f64)> {
        let stake = self.stakes.get_mut(validator)?;
        let before = *stake;
        *stake = before * factor;
        Some((before, *stake))
    }
}

/// Validator identifier → number of times it has been slashed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashingRecord {
    offenses: BTreeMap<String, u32>,
}

impl SlashingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offense count for `validator`; zero if it was never slashed.
    pub fn offenses(&self, validator: &str) -> u32 {
        self.offenses.get(validator).copied().unwrap_or(0)
    }

    /// Add one offense for `validator` and return the new count.
    pub fn record(&mut self, validator: &str) -> u32 {
        let count = self.offenses.entry(validator.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn len(&self) -> usize {
        self.offenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offenses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.offenses.iter().map(|(id, count)| (id.as_str(), *count))
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for SlashingRecord {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self {
            offenses: iter.into_iter().map(|(id, n)| (id.into(), n)).collect(),
        }
    }
}
