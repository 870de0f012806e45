//! Pure timeslot/round arithmetic (spec §4.1).
//!
//! Genesis occupies timeslot 0, which is defined to be the *last*
//! timeslot of era 0 (its FINAL round); era 1 begins at timeslot 1. Every
//! function here is a pure function of `(timeslot, params)`.

use aeon_api::ConsensusParams;
use aeon_types::Round;

/// The wall-clock timeslot number for a unix timestamp, given the
/// deployment's genesis timestamp and block time.
pub fn timeslot_of(timestamp: u32, params: &ConsensusParams) -> u64 {
    timestamp.saturating_sub(params.genesis_timestamp) as u64 / params.block_time_secs as u64
}

/// The era (interchangeably "epoch") number containing `timeslot`.
pub fn epoch_number_of(timeslot: u64, params: &ConsensusParams) -> u64 {
    if timeslot == 0 {
        return 0;
    }
    (timeslot - 1) / params.era_length() + 1
}

/// The zero-based offset of `timeslot` within its era, `0..era_length`.
pub fn in_epoch_block_number(timeslot: u64, params: &ConsensusParams) -> u64 {
    if timeslot == 0 {
        return params.era_length() - 1;
    }
    (timeslot - 1) % params.era_length()
}

/// The round label `timeslot` falls in.
pub fn round_of(timeslot: u64, params: &ConsensusParams) -> Round {
    let offset = in_epoch_block_number(timeslot, params);
    let idx = offset / params.round_duration;
    Round::from_index(idx).expect("offset is always within one era's worth of rounds")
}

/// `true` exactly at the first timeslot of a new era — the one moment
/// `accept_tops_as_epoch_hashes` must fire.
pub fn is_new_epoch_upcoming(timeslot: u64, params: &ConsensusParams) -> bool {
    in_epoch_block_number(timeslot, params) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ConsensusParams {
        ConsensusParams::default()
    }

    #[test]
    fn genesis_timeslot_is_era_zero_final_round() {
        let p = params();
        assert_eq!(epoch_number_of(0, &p), 0);
        assert_eq!(round_of(0, &p), Round::Final);
        assert_eq!(in_epoch_block_number(0, &p), p.era_length() - 1);
    }

    #[test]
    fn era_one_begins_at_timeslot_one() {
        let p = params();
        assert_eq!(epoch_number_of(1, &p), 1);
        assert!(is_new_epoch_upcoming(1, &p));
        assert_eq!(round_of(1, &p), Round::Public);
    }

    #[test]
    fn rounds_advance_in_order_across_an_era() {
        let p = params();
        let mut rounds = Vec::new();
        for offset in 0..p.era_length() {
            rounds.push(round_of(1 + offset, &p));
        }
        assert_eq!(
            rounds,
            vec![
                Round::Public,
                Round::Public,
                Round::SecretShare,
                Round::SecretShare,
                Round::Commit,
                Round::Commit,
                Round::Reveal,
                Round::Reveal,
                Round::Private,
                Round::Private,
                Round::Final,
                Round::Final,
            ]
        );
    }

    #[test]
    fn only_first_timeslot_of_era_is_upcoming() {
        let p = params();
        assert!(!is_new_epoch_upcoming(2, &p));
        assert!(is_new_epoch_upcoming(1 + p.era_length(), &p));
    }
}
