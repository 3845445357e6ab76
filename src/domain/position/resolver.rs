//! Matches a requested range against a wallet's existing positions

use solana_sdk::pubkey::Pubkey;

use crate::domain::tick::{resolve_tick_range, TickRange};
use crate::shared::errors::ComposeResult;
use crate::shared::types::{PoolSnapshot, Position, PriceRange};

/// Identity a deposit is matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub whirlpool: Pubkey,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub owner: Pubkey,
}

impl PositionKey {
    pub fn new(pool: &PoolSnapshot, ticks: TickRange, owner: Pubkey) -> Self {
        Self {
            whirlpool: pool.address,
            tick_lower: ticks.tick_lower,
            tick_upper: ticks.tick_upper,
            owner,
        }
    }

    pub fn matches(&self, position: &Position) -> bool {
        position.whirlpool == self.whirlpool
            && position.tick_lower_index == self.tick_lower
            && position.tick_upper_index == self.tick_upper
            && position.owner == self.owner
    }
}

/// Outcome of resolving a deposit target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Existing(Position),
    New(TickRange),
}

impl Resolution {
    pub fn tick_range(&self) -> TickRange {
        match self {
            Resolution::Existing(position) => TickRange {
                tick_lower: position.tick_lower_index,
                tick_upper: position.tick_upper_index,
            },
            Resolution::New(ticks) => *ticks,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Resolution::Existing(_))
    }
}

/// Resolve against already aligned ticks
///
/// When several positions share the key, the one with the smallest address wins so
/// the decision does not depend on the order the source returned them in.
pub fn resolve_ticks(
    wallet: &Pubkey,
    pool: &PoolSnapshot,
    ticks: TickRange,
    positions: &[Position],
) -> Resolution {
    let key = PositionKey::new(pool, ticks, *wallet);
    positions
        .iter()
        .filter(|position| key.matches(position))
        .min_by_key(|position| position.address)
        .cloned()
        .map(Resolution::Existing)
        .unwrap_or(Resolution::New(ticks))
}

/// Resolve a price range for `wallet` in `pool`
pub fn resolve(
    wallet: &Pubkey,
    pool: &PoolSnapshot,
    range: &PriceRange,
    positions: &[Position],
) -> ComposeResult<Resolution> {
    let ticks = resolve_tick_range(
        range,
        pool.token_a.decimals,
        pool.token_b.decimals,
        pool.tick_spacing,
    )?;
    Ok(resolve_ticks(wallet, pool, ticks, positions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::{sample_pool, sample_position, wallet};
    use proptest::prelude::*;

    #[test]
    fn test_resolves_existing_position() {
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 1_000);
        let range = PriceRange::new(120.0, 132.0).unwrap();
        let resolution = resolve(&wallet(), &pool, &range, &[position.clone()]).unwrap();
        assert_eq!(resolution, Resolution::Existing(position));
    }

    #[test]
    fn test_other_owner_or_pool_is_not_matched() {
        let pool = sample_pool(126.0);
        let mut foreign = sample_position(&pool, 120.0, 132.0, 1_000);
        foreign.owner = Pubkey::new_unique();
        let mut other_pool = sample_position(&pool, 120.0, 132.0, 1_000);
        other_pool.whirlpool = Pubkey::new_unique();

        let range = PriceRange::new(120.0, 132.0).unwrap();
        let resolution = resolve(&wallet(), &pool, &range, &[foreign, other_pool]).unwrap();
        assert!(!resolution.is_existing());
    }

    #[test]
    fn test_format_variants_resolve_identically() {
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 1_000);
        let a = PriceRange::parse("120", "132").unwrap();
        let b = PriceRange::parse("120.0", "132.00").unwrap();
        assert_eq!(
            resolve(&wallet(), &pool, &a, &[position.clone()]).unwrap(),
            resolve(&wallet(), &pool, &b, &[position]).unwrap()
        );
    }

    #[test]
    fn test_scenario_c_unrelated_deposit_does_not_change_decision() {
        let pool = sample_pool(126.0);
        let range = PriceRange::new(120.0, 132.0).unwrap();
        let mut positions = vec![sample_position(&pool, 100.0, 110.0, 1_000)];

        let before = resolve(&wallet(), &pool, &range, &positions).unwrap();
        positions[0].liquidity += 5_000;
        positions.push(sample_position(&pool, 140.0, 150.0, 2_000));
        let after = resolve(&wallet(), &pool, &range, &positions).unwrap();

        assert!(!before.is_existing());
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_matches_pick_smallest_address() {
        let pool = sample_pool(126.0);
        let first = sample_position(&pool, 120.0, 132.0, 1);
        let second = sample_position(&pool, 120.0, 132.0, 2);
        let expected = if first.address < second.address { first.clone() } else { second.clone() };
        let ticks = Resolution::Existing(first.clone()).tick_range();

        let forward = resolve_ticks(&wallet(), &pool, ticks, &[first.clone(), second.clone()]);
        let backward = resolve_ticks(&wallet(), &pool, ticks, &[second, first]);
        assert_eq!(forward, Resolution::Existing(expected));
        assert_eq!(forward, backward);
    }

    proptest! {
        #[test]
        fn prop_resolve_is_deterministic(lower in 50.0f64..125.0, width in 1.01f64..1.3) {
            let pool = sample_pool(126.0);
            let upper = lower * width;
            let positions = vec![sample_position(&pool, lower, upper, 10)];
            let range = PriceRange::new(lower, upper).unwrap();
            let reparsed = PriceRange::parse(&format!("{:.12}", lower), &format!("{:.12}", upper)).unwrap();

            let first = resolve(&wallet(), &pool, &range, &positions).unwrap();
            let second = resolve(&wallet(), &pool, &reparsed, &positions).unwrap();
            prop_assert!(first.is_existing());
            prop_assert_eq!(first, second);
        }
    }
}
