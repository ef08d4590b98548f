//! The game state machine.
//!
//! Every function here is pure: it validates an incoming operation against
//! deserialized record state, mutates the records in place, and reports the
//! asset movement the caller must perform. Nothing here touches accounts or
//! CPIs, so every transition is unit-testable and a failed transaction can
//! never leave records half-written (the runtime discards the whole
//! transaction on error).
//!
//! Bookkeeping model: a round's `accum_*` fields are gross lifetime totals
//! that are never reduced by player payouts; `withdrawn_*` masks on the
//! round and player records track what has already left the pot. The pot
//! invariant checked after every mutation is therefore exact at all times:
//!
//! ```text
//! accum_sol_pot == community + airdrop + next_round + aff + p3d + f3d
//!                + still_in_play + final_prize
//! ```

use solana_program::entrypoint::ProgramResult;
use solana_program::native_token::LAMPORTS_PER_SOL;
use solana_program::program_error::ProgramError;

use crate::curve::keys_received;
use crate::error::GameError;
use crate::math::{TryAdd, TryCast, TryDiv, TryMul, TrySub};
use crate::state::{
    GameState, PlayerRoundState, RoundState, Team, AIRDROP_MIN_PURCHASE, EARLY_ROUND_PLAYER_CAP,
    EARLY_ROUND_POT_CAP,
};

/// Fixed purchase cuts, in percent. The community, airdrop and next-round
/// cuts plus the affiliate commission total 14%; the team fee split carves
/// f3d/p3d out of the rest and whatever remains stays in play.
const COMMUNITY_CUT_DIVISOR: u128 = 50; // 2%
const AIRDROP_CUT_DIVISOR: u128 = 100; // 1%
const NEXT_ROUND_CUT_DIVISOR: u128 = 100; // 1%
const AFFILIATE_CUT_DIVISOR: u128 = 10; // 10%

/// Scale factor for the per-key dividend masks. Large enough that the
/// per-key rounding loss on a whole round's f3d bucket stays below one
/// lamport per player.
pub const DIVIDEND_PRECISION: u128 = 1_000_000_000_000_000_000;

#[derive(Debug)]
pub struct PurchaseOutcome {
    /// Lamports actually taken, after the early-round limiter clamp. This is
    /// the amount the caller must move into the pot.
    pub accepted_amount: u128,
    pub new_keys: u128,
    /// Airdrop lottery prize credited to the buyer, zero when the draw lost.
    pub airdrop_prize: u128,
}

/// Applies a key purchase to the round and player records.
///
/// `lottery_ticket` is the caller-supplied entropy draw in `[0, 1000)`;
/// `affiliate` must be the record of `player.last_affiliate_pk` whenever the
/// player has one.
pub fn purchase_keys(
    game: &GameState,
    round: &mut RoundState,
    player: &mut PlayerRoundState,
    affiliate: Option<&mut PlayerRoundState>,
    amount: u128,
    team: Team,
    lottery_ticket: u128,
    now: i64,
) -> Result<PurchaseOutcome, ProgramError> {
    if round.ended {
        return Err(GameError::RoundEnded.into());
    }
    if now > round.end_time {
        return Err(GameError::RoundExpired.into());
    }
    if amount == 0 {
        return Err(GameError::PurchaseTooSmall.into());
    }
    if player.has_affiliate() && affiliate.is_none() {
        return Err(ProgramError::NotEnoughAccountKeys);
    }

    // --------------------------------------- clamp + price
    // while the pot is small each player may only contribute 1 SOL total
    let accepted_amount = if round.accum_sol_pot < EARLY_ROUND_POT_CAP
        && player.accum_sol_added.try_add(amount)? > EARLY_ROUND_PLAYER_CAP
    {
        EARLY_ROUND_PLAYER_CAP.try_sub(player.accum_sol_added)?
    } else {
        amount
    };

    // Purchases below one whole key are rejected. In the original game on
    // Ethereum fractional keys existed; with integer math the minimum ticket
    // is 75_000 lamports at round start, rising with the pot.
    let new_keys = keys_received(round.accum_sol_pot, accepted_amount)?;
    if new_keys < 1 {
        return Err(GameError::PurchaseTooSmall.into());
    }

    // --------------------------------------- airdrop lottery
    // each qualifying purchase raises the hit chance by 0.1%
    let mut airdrop_prize = 0u128;
    if accepted_amount > AIRDROP_MIN_PURCHASE {
        round.airdrop_tracker.try_self_add(1)?;

        if lottery_ticket < round.airdrop_tracker as u128 {
            let pool = round.accum_airdrop_share;
            airdrop_prize = if accepted_amount > (LAMPORTS_PER_SOL as u128).try_mul(10)? {
                // 10+ sol buy-in wins 75% of the accumulated airdrop pot
                pool.try_mul(75)?.try_floor_div(100)?
            } else if accepted_amount > LAMPORTS_PER_SOL as u128 {
                // 1-10 sol wins 50%
                pool.try_mul(50)?.try_floor_div(100)?
            } else {
                // 0.1-1 sol wins 25%
                pool.try_mul(25)?.try_floor_div(100)?
            };

            // the prize stays in the pot until withdrawn; it moves from the
            // airdrop bucket into assigned prizes
            round.accum_airdrop_share.try_self_sub(airdrop_prize)?;
            round.final_prize_share.try_self_add(airdrop_prize)?;
            player.accum_winnings.try_self_add(airdrop_prize)?;
            round.airdrop_tracker = 0;
        }
    }

    // --------------------------------------- split the purchase
    let community_share = accepted_amount.try_floor_div(COMMUNITY_CUT_DIVISOR)?;
    let airdrop_share = accepted_amount.try_floor_div(AIRDROP_CUT_DIVISOR)?;
    let next_round_share = accepted_amount.try_floor_div(NEXT_ROUND_CUT_DIVISOR)?;
    let mut affiliate_share = accepted_amount.try_floor_div(AFFILIATE_CUT_DIVISOR)?;

    let fee_split = team.fee_split();
    let mut p3d_share = accepted_amount
        .try_mul(fee_split.p3d as u128)?
        .try_floor_div(100)?;
    let f3d_share = accepted_amount
        .try_mul(fee_split.f3d as u128)?
        .try_floor_div(100)?;

    // the commission goes to the referrer when one is listed, to p3d
    // holders otherwise
    if let Some(affiliate) = affiliate {
        affiliate.accum_aff.try_self_add(affiliate_share)?;
    } else {
        p3d_share.try_self_add(affiliate_share)?;
        affiliate_share = 0;
    }

    let still_in_play = accepted_amount
        .try_sub(community_share)?
        .try_sub(airdrop_share)?
        .try_sub(next_round_share)?
        .try_sub(affiliate_share)?
        .try_sub(p3d_share)?
        .try_sub(f3d_share)?;

    // --------------------------------------- update round state
    round.lead_player_pk = player.player_pk;
    round.lead_player_team = team;
    round.end_time = extended_deadline(game, round)?;
    round.accum_keys.try_self_add(new_keys)?;

    // Dividend masks: the new keys are offset against the per-key total as
    // it stood before this purchase, then this purchase's f3d is folded in
    // over all keys (buyer included). Both masks only ever grow, so every
    // player's accrued dividend is monotone and the payouts can never
    // overdraw the f3d bucket.
    player.dividend_mask.try_self_add(
        round
            .dividend_mask
            .try_mul(new_keys)?
            .try_floor_div(DIVIDEND_PRECISION)?,
    )?;
    if f3d_share > 0 {
        round.dividend_mask.try_self_add(
            f3d_share
                .try_mul(DIVIDEND_PRECISION)?
                .try_floor_div(round.accum_keys)?,
        )?;
    }

    round.accum_sol_pot.try_self_add(accepted_amount)?;
    round.accum_community_share.try_self_add(community_share)?;
    round.accum_airdrop_share.try_self_add(airdrop_share)?;
    round
        .accum_next_round_share
        .try_self_add(next_round_share)?;
    round.accum_aff_share.try_self_add(affiliate_share)?;
    round.accum_p3d_share.try_self_add(p3d_share)?;
    round.accum_f3d_share.try_self_add(f3d_share)?;
    round.still_in_play.try_self_add(still_in_play)?;

    // --------------------------------------- update player state
    player.accum_keys.try_self_add(new_keys)?;
    player.accum_sol_added.try_self_add(accepted_amount)?;

    verify_round_state(round)?;

    Ok(PurchaseOutcome {
        accepted_amount,
        new_keys,
        airdrop_prize,
    })
}

/// Pays out everything a player can currently claim from a round: airdrop
/// and grand-prize winnings, affiliate commission, and the pro-rata f3d
/// dividend, each net of what was already withdrawn. The masks advance in
/// the same transition, so a repeat call finds nothing.
///
/// Valid against live rounds too: airdrop winnings and dividends do not wait
/// for the round to end.
pub fn withdraw_player(
    round: &RoundState,
    player: &mut PlayerRoundState,
) -> Result<u128, ProgramError> {
    let winnings = player
        .accum_winnings
        .try_sub(player.withdrawn_winnings)?;
    let aff = player.accum_aff.try_sub(player.withdrawn_aff)?;
    let f3d = earned_f3d(round, player)?.try_sub(player.withdrawn_f3d)?;

    let total = winnings.try_add(aff)?.try_add(f3d)?;
    if total == 0 {
        return Err(GameError::NothingToWithdraw.into());
    }

    player.withdrawn_winnings.try_self_add(winnings)?;
    player.withdrawn_aff.try_self_add(aff)?;
    player.withdrawn_f3d.try_self_add(f3d)?;

    Ok(total)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommunityRecipient {
    Community,
    P3d,
}

/// Pays out the community (or p3d) bucket of a round, net of prior payouts.
pub fn withdraw_community(
    round: &mut RoundState,
    recipient: CommunityRecipient,
) -> Result<u128, ProgramError> {
    let amount = match recipient {
        CommunityRecipient::Community => round
            .accum_community_share
            .try_sub(round.withdrawn_com)?,
        CommunityRecipient::P3d => round.accum_p3d_share.try_sub(round.withdrawn_p3d)?,
    };
    if amount == 0 {
        return Err(GameError::NothingToWithdraw.into());
    }
    match recipient {
        CommunityRecipient::Community => round.withdrawn_com.try_self_add(amount)?,
        CommunityRecipient::P3d => round.withdrawn_p3d.try_self_add(amount)?,
    }
    Ok(amount)
}

/// A player's lifetime f3d earnings in this round:
/// `keys * dividend_mask / precision - offset`.
///
/// The round mask accumulates f3d-per-key at each purchase and the player
/// offset cancels out the per-key total that predates their keys, so the
/// result only ever grows. In particular it can never fall below the
/// player's `withdrawn_f3d` (a naive `keys / total_keys` snapshot can,
/// once later buyers dilute the ratio), and summed over all players it
/// never exceeds the f3d bucket.
pub fn earned_f3d(
    round: &RoundState,
    player: &PlayerRoundState,
) -> Result<u128, ProgramError> {
    round
        .dividend_mask
        .try_mul(player.accum_keys)?
        .try_floor_div(DIVIDEND_PRECISION)?
        .try_sub(player.dividend_mask)
}

/// Checks that the pot total equals the sum of all share buckets. Gross
/// accumulators never shrink on payout, so this holds at every point in a
/// round's life, not just before the first withdrawal.
pub fn verify_round_state(round: &RoundState) -> ProgramResult {
    let supposed = round
        .accum_community_share
        .try_add(round.accum_airdrop_share)?
        .try_add(round.accum_next_round_share)?
        .try_add(round.accum_aff_share)?
        .try_add(round.accum_p3d_share)?
        .try_add(round.accum_f3d_share)?
        .try_add(round.still_in_play)?
        .try_add(round.final_prize_share)?;
    if round.accum_sol_pot != supposed {
        return Err(GameError::PotImbalance.into());
    }
    Ok(())
}

/// New deadline after a purchase: one increment further out, never past the
/// round ceiling and never earlier than it already was.
fn extended_deadline(game: &GameState, round: &RoundState) -> Result<i64, ProgramError> {
    let inc: i64 = game.round_inc_time.try_cast()?;
    let max: i64 = game.round_max_time.try_cast()?;
    let bumped = round
        .end_time
        .checked_add(inc)
        .ok_or(GameError::Overflow)?;
    let ceiling = round
        .start_time
        .checked_add(max)
        .ok_or(GameError::Overflow)?;
    Ok(bumped.min(ceiling))
}

// --------------------------------------- tests
