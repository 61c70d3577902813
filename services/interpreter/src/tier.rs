//! Packed tier reports
//!
//! A report holds eight 32-bit times, tier 1 in the lowest bits. A time of
//! `0xFFFFFFFF` means the tier was never reached.

use alloy_primitives::U256;

pub const TIERS: usize = 8;
pub const NEVER: u32 = u32::MAX;

/// Report with every tier unreached.
pub const NEVER_REPORT: U256 = U256::MAX;

/// How SELECT_LTE combines reports per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    Every,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Min,
    Max,
    First,
}

pub fn time_at(report: U256, tier: usize) -> u32 {
    let shifted = report >> (tier * 32);
    u32::try_from(shifted & U256::from(u32::MAX)).unwrap_or(NEVER)
}

pub fn with_time_at(report: U256, tier: usize, time: u32) -> U256 {
    let shift = tier * 32;
    let mask = U256::from(u32::MAX) << shift;
    (report & !mask) | (U256::from(time) << shift)
}

/// Per-tier `newer - older`, clamped at zero.
pub fn saturating_diff(newer: U256, older: U256) -> U256 {
    (0..TIERS).fold(U256::ZERO, |acc, tier| {
        let diff = time_at(newer, tier).saturating_sub(time_at(older, tier));
        with_time_at(acc, tier, diff)
    })
}

/// Set tiers `start..end` to `time`.
pub fn update_times_for_tier_range(report: U256, start: usize, end: usize, time: u32) -> U256 {
    (start..end.min(TIERS)).fold(report, |acc, tier| with_time_at(acc, tier, time))
}

/// Combine `reports` tier by tier, keeping only times at or before `at`.
pub fn select_lte(reports: &[U256], at: u32, logic: Logic, mode: Mode) -> U256 {
    (0..TIERS).fold(NEVER_REPORT, |acc, tier| {
        let times: Vec<u32> = reports.iter().map(|r| time_at(*r, tier)).collect();
        let reached: Vec<u32> = times.iter().copied().filter(|t| *t <= at).collect();
        let qualifies = match logic {
            Logic::Every => !reached.is_empty() && reached.len() == times.len(),
            Logic::Any => !reached.is_empty(),
        };
        if !qualifies {
            return acc;
        }
        let picked = match mode {
            Mode::Min => reached.iter().copied().min(),
            Mode::Max => reached.iter().copied().max(),
            Mode::First => reached.first().copied(),
        };
        with_time_at(acc, tier, picked.unwrap_or(NEVER))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(times: [u32; TIERS]) -> U256 {
        times
            .iter()
            .enumerate()
            .fold(U256::ZERO, |acc, (tier, time)| with_time_at(acc, tier, *time))
    }

    #[test]
    fn test_time_round_trip() {
        let r = with_time_at(NEVER_REPORT, 3, 77);
        assert_eq!(time_at(r, 3), 77);
        assert_eq!(time_at(r, 2), NEVER);
        assert_eq!(time_at(r, 4), NEVER);
    }

    #[test]
    fn test_saturating_diff() {
        let newer = report([10, 20, 30, 40, 50, 60, 70, 80]);
        let older = report([5, 25, 30, 0, 0, 0, 0, 0]);
        let diff = saturating_diff(newer, older);
        assert_eq!(time_at(diff, 0), 5);
        assert_eq!(time_at(diff, 1), 0);
        assert_eq!(time_at(diff, 2), 0);
        assert_eq!(time_at(diff, 7), 80);
    }

    #[test]
    fn test_update_range_leaves_other_tiers() {
        let updated = update_times_for_tier_range(NEVER_REPORT, 2, 5, 1000);
        assert_eq!(time_at(updated, 1), NEVER);
        assert_eq!(time_at(updated, 2), 1000);
        assert_eq!(time_at(updated, 4), 1000);
        assert_eq!(time_at(updated, 5), NEVER);
    }

    #[test]
    fn test_select_lte_every_vs_any() {
        let a = report([1, 1, 50, NEVER, NEVER, NEVER, NEVER, NEVER]);
        let b = report([2, 60, 3, NEVER, NEVER, NEVER, NEVER, NEVER]);

        let every = select_lte(&[a, b], 10, Logic::Every, Mode::Max);
        assert_eq!(time_at(every, 0), 2);
        assert_eq!(time_at(every, 1), NEVER);
        assert_eq!(time_at(every, 2), NEVER);

        let any = select_lte(&[a, b], 10, Logic::Any, Mode::First);
        assert_eq!(time_at(any, 0), 1);
        assert_eq!(time_at(any, 1), 1);
        assert_eq!(time_at(any, 2), 3);
        assert_eq!(time_at(any, 3), NEVER);
    }
}
