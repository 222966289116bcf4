use mc_blockchain::Block;
use rand::Rng;
use tracing::{info, warn};

use crate::{Consensus, MiningOutcome, SlashingRecord, StakeTable, SLASHED_STAKE_RETAINED};

/// Proof-of-stake with slashing.
///
/// Validators are picked by a stake-weighted roulette draw.  Validation is
/// deliberately non-deterministic: every call makes a fresh draw (unrelated
/// to whoever produced the block) and flips a fair coin to simulate a
/// misbehaving validator, which is then slashed.
///
/// The stake table and slashing record are handed in by the caller and can be
/// inspected at any time through [`ProofOfStake::stakes`] and
/// [`ProofOfStake::slashing_record`].
#[derive(Debug, Clone, Default)]
pub struct ProofOfStake {
    stakes: StakeTable,
    slashing: SlashingRecord,
    last_validator: Option<String>,
}

impl ProofOfStake {
    pub fn new(stakes: StakeTable, slashing: SlashingRecord) -> Self {
        Self {
            stakes,
            slashing,
            last_validator: None,
        }
    }

    pub fn stakes(&self) -> &StakeTable {
        &self.stakes
    }

    pub fn slashing_record(&self) -> &SlashingRecord {
        &self.slashing
    }

    /// The validator credited with the most recently forged block.
    pub fn last_validator(&self) -> Option<&str> {
        self.last_validator.as_deref()
    }

    /// Hand the stake table and slashing record back to the caller.
    pub fn into_parts(self) -> (StakeTable, SlashingRecord) {
        (self.stakes, self.slashing)
    }

    /// Stake-weighted draw using a fresh thread-local RNG.
    pub fn select_validator(&self) -> Option<String> {
        self.select_validator_with(&mut rand::thread_rng())
    }

    /// Draw `r` uniformly from `[0, total_stake)` and return the first
    /// validator whose cumulative stake reaches `r`.
    ///
    /// Returns `None` when the table is empty or holds no stake.
    pub fn select_validator_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<String> {
        let total = self.stakes.total();
        if total <= 0.0 {
            return None;
        }

        let draw = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        for (validator, stake) in self.stakes.iter() {
            cumulative += stake;
            if cumulative >= draw {
                return Some(validator.to_string());
            }
        }
        None
    }

    /// [`Consensus::mine`] with an explicit RNG.
    pub fn mine_with<R: Rng + ?Sized>(
        &mut self,
        block: &mut Block,
        rng: &mut R,
    ) -> MiningOutcome {
        match self.select_validator_with(rng) {
            Some(validator) => {
                // No puzzle in proof-of-stake; a zero-difficulty pass just
                // refreshes the hash.
                block.mine(0);
                info!(%validator, hash = %block.hash(), "Block forged by validator");
                self.last_validator = Some(validator.clone());
                MiningOutcome::Sealed {
                    validator: Some(validator),
                }
            }
            None => {
                warn!("No validator selected for this block");
                MiningOutcome::NoValidator
            }
        }
    }

    /// [`Consensus::validate_block`] with an explicit RNG.
    pub fn validate_block_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let selected = self.select_validator_with(rng);
        let malicious = rng.gen_bool(0.5);

        if malicious {
            if let Some(validator) = &selected {
                warn!(%validator, "Validator acted maliciously");
                self.slash_validator(validator);
            }
            return false;
        }

        selected.is_some_and(|validator| self.stakes.contains(&validator))
    }

    /// Scale `validator`'s stake by [`SLASHED_STAKE_RETAINED`] and record the
    /// offense.  Unknown validators are ignored and `false` is returned.
    pub fn slash_validator(&mut self, validator: &str) -> bool {
        let Some((before, after)) = self.stakes.scale(validator, SLASHED_STAKE_RETAINED) else {
            return false;
        };
        let offenses = self.slashing.record(validator);
        info!(
            %validator,
            slashed = before - after,
            stake = after,
            offenses,
            "Validator slashed"
        );
        true
    }
}

impl Consensus for ProofOfStake {
    fn mine(&mut self, block: &mut Block, _difficulty: usize) -> MiningOutcome {
        self.mine_with(block, &mut rand::thread_rng())
    }

    fn validate_block(&mut self, _block: &Block, _difficulty: usize) -> bool {
        self.validate_block_with(&mut rand::thread_rng())
    }
}

#[cfg(test)]
mod tests {
    use mc_transaction::Transaction;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn block() -> Block {
        Block::new(vec![Transaction::new("Alice", "Bob", 100.0).unwrap()], "0")
    }

    fn two_validators() -> ProofOfStake {
        let stakes = StakeTable::new([("V1", 100.0), ("V2", 50.0)]).unwrap();
        ProofOfStake::new(stakes, SlashingRecord::new())
    }

    #[test]
    fn empty_table_selects_nobody() {
        let pos = ProofOfStake::default();
        assert_eq!(pos.select_validator(), None);
    }

    #[test]
    fn zero_total_stake_selects_nobody() {
        let stakes = StakeTable::new([("V1", 0.0), ("V2", 0.0)]).unwrap();
        let pos = ProofOfStake::new(stakes, SlashingRecord::new());
        assert_eq!(pos.select_validator(), None);
    }

    #[test]
    fn huge_finite_stakes_still_select_someone() {
        let stakes = StakeTable::new([("A", f64::MAX / 2.0), ("B", f64::MAX / 4.0)]).unwrap();
        let pos = ProofOfStake::new(stakes, SlashingRecord::new());
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let selected = pos.select_validator_with(&mut rng);
            assert!(matches!(selected.as_deref(), Some("A" | "B")), "got {selected:?}");
        }
    }

    #[test]
    fn mine_without_validator_leaves_block_untouched() {
        let mut pos = ProofOfStake::default();
        let mut b = block();
        let before = b.clone();

        assert_eq!(pos.mine(&mut b, 0), MiningOutcome::NoValidator);
        assert_eq!(b, before);
        assert_eq!(pos.last_validator(), None);
    }

    #[test]
    fn mine_records_selected_validator() {
        let mut pos = two_validators();
        let mut b = block();
        let outcome = pos.mine(&mut b, 5);

        let validator = outcome.validator().unwrap().to_string();
        assert!(pos.stakes().contains(&validator));
        assert_eq!(pos.last_validator(), Some(validator.as_str()));
        assert_eq!(b.hash(), b.compute_hash());
    }

    #[test]
    fn selection_is_weighted_by_stake() {
        let pos = two_validators();
        let mut rng = StdRng::seed_from_u64(7);
        let mut v1 = 0u32;
        let mut v2 = 0u32;
        for _ in 0..1000 {
            match pos.select_validator_with(&mut rng).as_deref() {
                Some("V1") => v1 += 1,
                Some("V2") => v2 += 1,
                other => panic!("unexpected selection {other:?}"),
            }
        }
        let ratio = f64::from(v1) / f64::from(v2);
        assert!((1.6..=2.5).contains(&ratio), "ratio was {ratio}");
    }

    #[test]
    fn slash_cuts_stake_by_a_fifth_and_counts_offense() {
        let mut pos = two_validators();
        assert!(pos.slash_validator("V1"));
        assert_eq!(pos.stakes().get("V1"), Some(80.0));
        assert_eq!(pos.slashing_record().offenses("V1"), 1);

        assert!(pos.slash_validator("V1"));
        assert_eq!(pos.stakes().get("V1"), Some(64.0));
        assert_eq!(pos.slashing_record().offenses("V1"), 2);
        assert_eq!(pos.stakes().get("V2"), Some(50.0));
    }

    #[test]
    fn slashing_unknown_validator_is_ignored() {
        let mut pos = two_validators();
        assert!(!pos.slash_validator("ghost"));
        assert!(pos.slashing_record().is_empty());
    }

    #[test]
    fn failed_validation_slashes_exactly_one_validator() {
        let stakes = StakeTable::new([("V1", 100.0)]).unwrap();
        let mut pos = ProofOfStake::new(stakes, SlashingRecord::new());
        let mut rng = StdRng::seed_from_u64(42);

        let mut rejected = false;
        for _ in 0..64 {
            let stake_before = pos.stakes().get("V1").unwrap();
            let offenses_before = pos.slashing_record().offenses("V1");

            if pos.validate_block_with(&mut rng) {
                assert_eq!(pos.stakes().get("V1"), Some(stake_before));
                continue;
            }

            assert_eq!(pos.stakes().get("V1"), Some(stake_before * 0.8));
            assert_eq!(pos.slashing_record().offenses("V1"), offenses_before + 1);
            rejected = true;
            break;
        }
        assert!(rejected, "a fair coin should come up malicious within 64 flips");
    }

    #[test]
    fn validation_with_empty_table_never_passes() {
        let mut pos = ProofOfStake::default();
        let b = block();
        for _ in 0..20 {
            assert!(!pos.validate_block(&b, 0));
        }
        assert!(pos.slashing_record().is_empty());
    }

    #[test]
    fn pre_seeded_record_keeps_counting() {
        let stakes = StakeTable::new([("V1", 10.0)]).unwrap();
        let record: SlashingRecord = [("V1", 2)].into_iter().collect();
        let mut pos = ProofOfStake::new(stakes, record);

        pos.slash_validator("V1");
        let (stakes, record) = pos.into_parts();
        assert_eq!(record.offenses("V1"), 3);
        assert_eq!(stakes.get("V1"), Some(8.0));
    }
}
