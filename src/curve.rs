//! Key price curve.
//!
//! Price per key rises linearly with keys already sold: the first key costs
//! [`BASE_KEY_PRICE`] lamports and every subsequent key costs one lamport
//! more. Integrating that line gives the pot level as a function of keys
//! sold, and inverting the integral gives keys received for a deposit:
//!
//! ```text
//! keys_at(pot)  = isqrt(base^2 + 2 * pot) - base
//! keys_received = keys_at(pot + amount) - keys_at(pot)
//! ```
//!
//! Earlier buyers in a round therefore always pay less per key than later
//! buyers, and the curve is deterministic given the pot level alone.

use crate::math::{TryAdd, TryMul, TrySqrt, TrySub};
use solana_program::program_error::ProgramError;

/// Lamports per key at an empty pot.
pub const BASE_KEY_PRICE: u128 = 75_000;

/// Total whole keys the curve has sold once `pot` lamports have been paid in.
pub fn keys_at(pot: u128) -> Result<u128, ProgramError> {
    let base_sq = BASE_KEY_PRICE.try_mul(BASE_KEY_PRICE)?;
    base_sq
        .try_add(pot.try_mul(2)?)?
        .try_sqrt()?
        .try_sub(BASE_KEY_PRICE)
}

/// Whole keys received for depositing `amount` lamports into a pot currently
/// holding `pot` lamports. Fractional keys round down and their cost stays in
/// the pot.
pub fn keys_received(pot: u128, amount: u128) -> Result<u128, ProgramError> {
    keys_at(pot.try_add(amount)?)?.try_sub(keys_at(pot)?)
}

/// Marginal price of the next key at the given pot level.
pub fn current_key_price(pot: u128) -> Result<u128, ProgramError> {
    let base_sq = BASE_KEY_PRICE.try_mul(BASE_KEY_PRICE)?;
    base_sq.try_add(pot.try_mul(2)?)?.try_sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_program::native_token::LAMPORTS_PER_SOL;

    #[test]
    fn first_key_costs_base_price() {
        assert_eq!(keys_received(0, BASE_KEY_PRICE).unwrap(), 1);
        assert_eq!(keys_received(0, BASE_KEY_PRICE - 1).unwrap(), 0);
    }

    #[test]
    fn zero_amount_buys_nothing() {
        assert_eq!(keys_received(0, 0).unwrap(), 0);
        assert_eq!(keys_received(LAMPORTS_PER_SOL as u128, 0).unwrap(), 0);
    }

    #[test]
    fn price_is_monotone_non_decreasing() {
        let amount = LAMPORTS_PER_SOL as u128;
        let mut pot = 0u128;
        let mut last_keys = u128::MAX;
        for _ in 0..50 {
            let keys = keys_received(pot, amount).unwrap();
            // same spend buys fewer (or equal) keys as the pot grows
            assert!(keys <= last_keys);
            assert!(keys > 0);
            last_keys = keys;
            pot += amount;
        }
    }

    #[test]
    fn marginal_price_tracks_pot() {
        let cheap = current_key_price(0).unwrap();
        let dear = current_key_price(1_000 * LAMPORTS_PER_SOL as u128).unwrap();
        assert_eq!(cheap, BASE_KEY_PRICE);
        assert!(dear > cheap);
    }

    #[test]
    fn purchases_compose() {
        // buying in two steps never yields more keys than buying at once
        let a = keys_received(0, 600_000).unwrap();
        let b1 = keys_received(0, 300_000).unwrap();
        let b2 = keys_received(300_000, 300_000).unwrap();
        assert!(b1 + b2 <= a + 1);
        assert!(b1 + b2 + 1 >= a);
    }
}
