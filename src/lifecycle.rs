//! Round lifecycle policy: opening rounds, rolling the next-round share
//! forward, and ending rounds. Sequencing rules live here so the state
//! machine proper only ever sees a well-ordered round.

use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

use crate::error::GameError;
use crate::machine::{verify_round_state, DIVIDEND_PRECISION};
use crate::math::{TryAdd, TryCast, TryDiv, TryMul, TrySub};
use crate::state::{GameState, PlayerRoundState, RoundState, Team};

/// A round is over once its deadline passes, whether or not `EndRound` has
/// frozen it yet.
pub fn round_is_over(round: &RoundState, now: i64) -> bool {
    round.ended || now > round.end_time
}

/// Opens the next round for this game.
///
/// Round numbers are handed out strictly in sequence: the new round is
/// always `game.round_id + 1`. For every round after the first the caller
/// must supply the previous round, which must already be frozen; its
/// accumulated next-round share is moved (not copied) into the new round, so
/// the pot invariant keeps holding on both records.
///
/// Returns the new round record and the carried amount the caller must move
/// between the two pots.
pub fn open_round(
    game: &mut GameState,
    prev: Option<&mut RoundState>,
    now: i64,
) -> Result<(RoundState, u128), ProgramError> {
    let mut carried = 0u128;

    match prev {
        None => {
            if game.round_id >= 1 {
                return Err(GameError::MissingPreviousRound.into());
            }
        }
        Some(prev) => {
            if prev.round_id != game.round_id {
                return Err(GameError::PdaMismatch.into());
            }
            if !prev.ended {
                return Err(GameError::RoundNotEnded.into());
            }
            carried = prev.accum_next_round_share;
            prev.accum_next_round_share = 0;
            prev.accum_sol_pot.try_self_sub(carried)?;
            verify_round_state(prev)?;
        }
    }

    game.round_id.try_self_add(1)?;

    let init: i64 = game.round_init_time.try_cast()?;
    let round = RoundState {
        round_id: game.round_id,
        lead_player_pk: Pubkey::default(),
        lead_player_team: Team::Whale,
        start_time: now,
        end_time: now.checked_add(init).ok_or(GameError::Overflow)?,
        ended: false,
        accum_keys: 0,
        // the carried share arrives earmarked for rollover again; purchases
        // feed the playable pot
        accum_sol_pot: carried,
        accum_f3d_share: 0,
        accum_p3d_share: 0,
        accum_community_share: 0,
        accum_next_round_share: carried,
        accum_airdrop_share: 0,
        accum_aff_share: 0,
        still_in_play: 0,
        final_prize_share: 0,
        withdrawn_com: 0,
        withdrawn_p3d: 0,
        dividend_mask: 0,
        airdrop_tracker: 0,
    };
    verify_round_state(&round)?;

    Ok((round, carried))
}

#[derive(Debug)]
pub struct EndRoundOutcome {
    pub grand_prize: u128,
    pub community_share: u128,
    pub p3d_share: u128,
    pub f3d_share: u128,
    pub next_round_share: u128,
}

/// Freezes a round and splits its jackpot.
///
/// The undistributed `still_in_play` pool breaks down as: 2% community, the
/// leading team's pot split to f3d/p3d, `50% - f3d - p3d` to the next round,
/// and the remainder (48% plus rounding dust) as the leader's grand prize.
///
/// Callable by anyone once the deadline has passed; the game creator's
/// signature force-ends a round early (`forced`).
pub fn end_round(
    round: &mut RoundState,
    winner: Option<&mut PlayerRoundState>,
    now: i64,
    forced: bool,
) -> Result<EndRoundOutcome, ProgramError> {
    if round.ended {
        return Err(GameError::RoundEnded.into());
    }
    if now <= round.end_time && !forced {
        return Err(GameError::RoundStillActive.into());
    }

    let pool = round.still_in_play;

    let pot_split = round.lead_player_team.pot_split();
    let next_round_percent = 50u128
        .try_sub(pot_split.p3d as u128)?
        .try_sub(pot_split.f3d as u128)?;

    let community_share = pool.try_floor_div(50)?;
    let p3d_share = pool.try_mul(pot_split.p3d as u128)?.try_floor_div(100)?;
    let f3d_share = pool.try_mul(pot_split.f3d as u128)?.try_floor_div(100)?;
    let next_round_share = pool.try_mul(next_round_percent)?.try_floor_div(100)?;

    let grand_prize = pool
        .try_sub(community_share)?
        .try_sub(p3d_share)?
        .try_sub(f3d_share)?
        .try_sub(next_round_share)?;

    match winner {
        Some(winner) => {
            if winner.player_pk != round.lead_player_pk {
                return Err(GameError::PdaMismatch.into());
            }
            winner.accum_winnings.try_self_add(grand_prize)?;
        }
        None => {
            // only a round nobody bought into has no winner record
            if grand_prize > 0 {
                return Err(ProgramError::NotEnoughAccountKeys);
            }
        }
    }

    round.ended = true;
    round.accum_community_share.try_self_add(community_share)?;
    round.accum_p3d_share.try_self_add(p3d_share)?;
    round.accum_f3d_share.try_self_add(f3d_share)?;
    // the jackpot's f3d slice is distributed over all keys sold
    if f3d_share > 0 {
        round.dividend_mask.try_self_add(
            f3d_share
                .try_mul(DIVIDEND_PRECISION)?
                .try_floor_div(round.accum_keys)?,
        )?;
    }
    round
        .accum_next_round_share
        .try_self_add(next_round_share)?;
    round.final_prize_share.try_self_add(grand_prize)?;
    round.still_in_play = 0;
    verify_round_state(round)?;

    Ok(EndRoundOutcome {
        grand_prize,
        community_share,
        p3d_share,
        f3d_share,
        next_round_share,
    })
}

// --------------------------------------- tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{purchase_keys, tests::fresh_player, tests::test_game};
    use crate::state::ROUND_INIT_TIME;

    const NOW: i64 = 1_600_000_000;
    const HALF_SOL: u128 = 500_000_000;

    fn played_round(game: &mut GameState) -> (RoundState, PlayerRoundState) {
        let (mut round, _) = open_round(game, None, NOW).unwrap();
        let mut player = fresh_player(round.round_id);
        purchase_keys(
            game,
            &mut round,
            &mut player,
            None,
            HALF_SOL,
            Team::Bear,
            999,
            NOW,
        )
        .unwrap();
        (round, player)
    }

    #[test]
    fn first_round_opens_empty() {
        let mut game = test_game(7);
        let (round, carried) = open_round(&mut game, None, NOW).unwrap();

        assert_eq!(game.round_id, 1);
        assert_eq!(round.round_id, 1);
        assert_eq!(carried, 0);
        assert_eq!(round.start_time, NOW);
        assert_eq!(round.end_time, NOW + ROUND_INIT_TIME as i64);
        assert!(!round.ended);
    }

    #[test]
    fn second_round_requires_previous() {
        let mut game = test_game(7);
        let (_, _) = open_round(&mut game, None, NOW).unwrap();
        assert_eq!(
            open_round(&mut game, None, NOW).unwrap_err(),
            GameError::MissingPreviousRound.into()
        );
    }

    #[test]
    fn rollover_requires_ended_round() {
        let mut game = test_game(7);
        let (mut round, _) = played_round(&mut game);

        assert_eq!(
            open_round(&mut game, Some(&mut round), NOW).unwrap_err(),
            GameError::RoundNotEnded.into()
        );
    }

    #[test]
    fn rollover_moves_the_next_round_share() {
        let mut game = test_game(7);
        let (mut round, mut player) = played_round(&mut game);
        let after = round.end_time + 1;
        end_round(&mut round, Some(&mut player), after, false).unwrap();

        let expected = round.accum_next_round_share;
        assert!(expected > 0);
        let pot_before = round.accum_sol_pot;

        let later = round.end_time + 10;
        let (next, carried) = open_round(&mut game, Some(&mut round), later).unwrap();

        assert_eq!(carried, expected);
        assert_eq!(round.accum_next_round_share, 0);
        assert_eq!(round.accum_sol_pot, pot_before - expected);
        assert_eq!(next.round_id, 2);
        assert_eq!(next.accum_sol_pot, expected);
        assert_eq!(next.accum_next_round_share, expected);
        verify_round_state(&round).unwrap();
        verify_round_state(&next).unwrap();
    }

    #[test]
    fn end_before_deadline_needs_force() {
        let mut game = test_game(7);
        let (mut round, mut player) = played_round(&mut game);
        let snapshot = round.clone();

        let err = end_round(&mut round, Some(&mut player), NOW + 10, false).unwrap_err();
        assert_eq!(err, GameError::RoundStillActive.into());
        assert_eq!(round, snapshot);

        // game creator force-ends early
        end_round(&mut round, Some(&mut player), NOW + 10, true).unwrap();
        assert!(round.ended);
    }

    #[test]
    fn end_round_splits_the_jackpot() {
        let mut game = test_game(7);
        let (mut round, mut player) = played_round(&mut game);
        let pool = round.still_in_play;
        assert!(pool > 0);

        let after = round.end_time + 1;
        let outcome = end_round(&mut round, Some(&mut player), after, false).unwrap();

        // bear pot split: 25% f3d, 0% p3d, 25% next round, ~48% winner
        assert_eq!(outcome.community_share, pool / 50);
        assert_eq!(outcome.f3d_share, pool * 25 / 100);
        assert_eq!(outcome.p3d_share, 0);
        assert_eq!(outcome.next_round_share, pool * 25 / 100);
        assert!(outcome.grand_prize >= pool * 48 / 100);
        assert_eq!(
            outcome.grand_prize,
            pool - outcome.community_share
                - outcome.f3d_share
                - outcome.next_round_share
        );
        assert_eq!(player.accum_winnings, outcome.grand_prize);
        assert_eq!(round.still_in_play, 0);
        verify_round_state(&round).unwrap();
    }

    #[test]
    fn ending_twice_is_rejected() {
        let mut game = test_game(7);
        let (mut round, mut player) = played_round(&mut game);
        let after = round.end_time + 1;
        end_round(&mut round, Some(&mut player), after, false).unwrap();

        let err = end_round(&mut round, Some(&mut player), after + 1, false).unwrap_err();
        assert_eq!(err, GameError::RoundEnded.into());
    }

    #[test]
    fn untouched_round_ends_without_winner() {
        let mut game = test_game(7);
        let (mut round, _) = open_round(&mut game, None, NOW).unwrap();

        let after = round.end_time + 1;
        let outcome = end_round(&mut round, None, after, false).unwrap();
        assert_eq!(outcome.grand_prize, 0);
        assert!(round.ended);
    }

    #[test]
    fn wrong_winner_record_is_rejected() {
        let mut game = test_game(7);
        let (mut round, _) = played_round(&mut game);
        let mut impostor = fresh_player(round.round_id);

        let after = round.end_time + 1;
        let err = end_round(&mut round, Some(&mut impostor), after, false).unwrap_err();
        assert_eq!(err, GameError::PdaMismatch.into());
    }
}
