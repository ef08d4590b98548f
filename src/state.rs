//! Persistent record layout.
//!
//! Three record kinds live at program-derived addresses: one [`GameState`]
//! per game version, one [`RoundState`] + pot token account per round, and
//! one [`PlayerRoundState`] per (player, round). All integers are
//! fixed-width little-endian borsh; every record has a fixed byte width so a
//! buffer of the wrong length is rejected before deserialization.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::native_token::LAMPORTS_PER_SOL;
use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

use crate::error::GameError;

// --------------------------------------- protocol constants

/// Initial round clock, seconds.
pub const ROUND_INIT_TIME: u64 = 3_600;
/// Seconds added to the round clock per key purchase.
pub const ROUND_INC_TIME: u64 = 30;
/// Ceiling on the round clock, seconds past `start_time`.
pub const ROUND_MAX_TIME: u64 = 86_400;

/// While the pot is below this, each player may contribute at most
/// [`EARLY_ROUND_PLAYER_CAP`] in total.
pub const EARLY_ROUND_POT_CAP: u128 = 100 * LAMPORTS_PER_SOL as u128;
pub const EARLY_ROUND_PLAYER_CAP: u128 = LAMPORTS_PER_SOL as u128;

/// Purchases above this take part in the airdrop lottery.
pub const AIRDROP_MIN_PURCHASE: u128 = (LAMPORTS_PER_SOL / 10) as u128;

/// 2 types of splits exist:
///  1) when keys are purchased, the fee is split between the pot / f3d
///     holders / p3d holders,
///  2) when the round is over, the jackpot is split between the next round /
///     f3d holders / p3d holders.
/// f3d and p3d percentages are noted below; the remaining element is deduced
/// from the fixed community/airdrop/next-round/affiliate cuts.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSplit {
    pub f3d: u64,
    pub p3d: u64,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PotSplit {
    pub f3d: u64,
    pub p3d: u64,
}

pub const WHALE_FEE_SPLIT: FeeSplit = FeeSplit { f3d: 30, p3d: 6 };
pub const BEAR_FEE_SPLIT: FeeSplit = FeeSplit { f3d: 43, p3d: 0 };
pub const SNEK_FEE_SPLIT: FeeSplit = FeeSplit { f3d: 56, p3d: 10 };
pub const BULL_FEE_SPLIT: FeeSplit = FeeSplit { f3d: 43, p3d: 8 };

pub const WHALE_POT_SPLIT: PotSplit = PotSplit { f3d: 15, p3d: 10 };
pub const BEAR_POT_SPLIT: PotSplit = PotSplit { f3d: 25, p3d: 0 };
pub const SNEK_POT_SPLIT: PotSplit = PotSplit { f3d: 20, p3d: 20 };
pub const BULL_POT_SPLIT: PotSplit = PotSplit { f3d: 30, p3d: 10 };

/// Team affiliation of a buyer. Stored as a single byte.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Team {
    Whale,
    Bear,
    Snek,
    Bull,
}

impl Team {
    pub fn from_byte(byte: u8) -> Result<Self, ProgramError> {
        match byte {
            0 => Ok(Team::Whale),
            1 => Ok(Team::Bear),
            2 => Ok(Team::Snek),
            3 => Ok(Team::Bull),
            _ => Err(GameError::InvalidTeam.into()),
        }
    }

    pub fn fee_split(&self) -> FeeSplit {
        match self {
            Team::Whale => WHALE_FEE_SPLIT,
            Team::Bear => BEAR_FEE_SPLIT,
            Team::Snek => SNEK_FEE_SPLIT,
            Team::Bull => BULL_FEE_SPLIT,
        }
    }

    pub fn pot_split(&self) -> PotSplit {
        match self {
            Team::Whale => WHALE_POT_SPLIT,
            Team::Bear => BEAR_POT_SPLIT,
            Team::Snek => SNEK_POT_SPLIT,
            Team::Bull => BULL_POT_SPLIT,
        }
    }
}

// --------------------------------------- game state

/// One per game version. Never destroyed, only superseded by a new version.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct GameState {
    /// Current round sequence number; 0 until the first round opens.
    pub round_id: u64,
    pub round_init_time: u64,
    pub round_inc_time: u64,
    pub round_max_time: u64,
    /// Protocol/schema version; also baked into every PDA seed.
    pub version: u8,
    /// Settlement asset mint every pot is denominated in.
    pub mint: Pubkey,
    pub game_creator: Pubkey,
    pub community_wallet: Pubkey,
    pub p3d_wallet: Pubkey,
}

pub const GAME_STATE_SIZE: usize = 8 * 4 + 1 + 32 * 4; //161

impl GameState {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() != GAME_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(Self::try_from_slice(data)?)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() != GAME_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(self.serialize(&mut &mut dst[..])?)
    }
}

// --------------------------------------- round state

/// One per (game version, round number). Frozen by `EndRound`, retained
/// forever for historical withdrawal.
///
/// The `accum_*` fields are gross lifetime totals: they are never reduced by
/// player withdrawals (the `withdrawn_*` masks here and on
/// [`PlayerRoundState`] track payouts), so at all times
/// `accum_sol_pot` equals the sum of the eight share buckets.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct RoundState {
    pub round_id: u64,
    /// Current leading buyer; wins the grand prize at round end.
    pub lead_player_pk: Pubkey,
    pub lead_player_team: Team,
    pub start_time: i64,
    /// Deadline; extended per purchase, capped at `start_time + round_max_time`.
    pub end_time: i64,
    pub ended: bool,
    pub accum_keys: u128,
    /// Lifetime lamports paid into this round's pot (net of carry-out).
    pub accum_sol_pot: u128,
    pub accum_f3d_share: u128,
    pub accum_p3d_share: u128,
    pub accum_community_share: u128,
    pub accum_next_round_share: u128,
    pub accum_airdrop_share: u128,
    pub accum_aff_share: u128,
    /// Undistributed jackpot portion; split at round end.
    pub still_in_play: u128,
    /// Prizes already assigned to player records (airdrops + grand prize).
    pub final_prize_share: u128,
    pub withdrawn_com: u128,
    pub withdrawn_p3d: u128,
    /// Cumulative f3d earnings per key, scaled by `DIVIDEND_PRECISION`.
    /// Only ever grows; each player's record carries a matching offset so
    /// dividends accrue monotonically per player.
    pub dividend_mask: u128,
    pub airdrop_tracker: u64,
}

pub const ROUND_STATE_SIZE: usize = 8 + 32 + 1 + 8 + 8 + 1 + 16 * 13 + 8; //274

impl RoundState {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() != ROUND_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(Self::try_from_slice(data)?)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() != ROUND_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(self.serialize(&mut &mut dst[..])?)
    }
}

// --------------------------------------- player-round state

/// One per (player, round, game version). Created lazily on the player's
/// first purchase; a residual zero balance after full withdrawal is valid
/// terminal state.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq)]
pub struct PlayerRoundState {
    pub player_pk: Pubkey,
    pub round_id: u64,
    /// Whoever referred the player; all-zero when nobody did. A weak
    /// reference: the referrer's record is looked up, never owned.
    pub last_affiliate_pk: Pubkey,
    pub accum_keys: u128,
    /// Lamports the player has added to the round; early-round limiter input.
    pub accum_sol_added: u128,
    /// Airdrop and grand-prize credits.
    pub accum_winnings: u128,
    /// Affiliate commission credits.
    pub accum_aff: u128,
    pub withdrawn_winnings: u128,
    pub withdrawn_aff: u128,
    pub withdrawn_f3d: u128,
    /// Dividend offset paired with the round's `dividend_mask`: the portion
    /// of the per-key total this player's keys were too late to earn. Bumped
    /// on every purchase so freshly bought keys start earning from that
    /// purchase onward, not retroactively.
    pub dividend_mask: u128,
}

pub const PLAYER_ROUND_STATE_SIZE: usize = 32 + 8 + 32 + 16 * 8; //200

impl PlayerRoundState {
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        if data.len() != PLAYER_ROUND_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(Self::try_from_slice(data)?)
    }

    pub fn pack(&self, dst: &mut [u8]) -> Result<(), ProgramError> {
        if dst.len() != PLAYER_ROUND_STATE_SIZE {
            return Err(GameError::StateSizeMismatch.into());
        }
        Ok(self.serialize(&mut &mut dst[..])?)
    }

    pub fn has_affiliate(&self) -> bool {
        self.last_affiliate_pk != Pubkey::default()
    }
}

// --------------------------------------- tests

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_game() -> GameState {
        GameState {
            round_id: 7,
            round_init_time: ROUND_INIT_TIME,
            round_inc_time: ROUND_INC_TIME,
            round_max_time: ROUND_MAX_TIME,
            version: 3,
            mint: Pubkey::new_unique(),
            game_creator: Pubkey::new_unique(),
            community_wallet: Pubkey::new_unique(),
            p3d_wallet: Pubkey::new_unique(),
        }
    }

    fn sample_round() -> RoundState {
        RoundState {
            round_id: 7,
            lead_player_pk: Pubkey::new_unique(),
            lead_player_team: Team::Bull,
            start_time: 1_600_000_000,
            end_time: 1_600_003_600,
            ended: false,
            accum_keys: 123,
            accum_sol_pot: 456,
            accum_f3d_share: 1,
            accum_p3d_share: 2,
            accum_community_share: 3,
            accum_next_round_share: 4,
            accum_airdrop_share: 5,
            accum_aff_share: 6,
            still_in_play: 435,
            final_prize_share: 0,
            withdrawn_com: 0,
            withdrawn_p3d: 0,
            dividend_mask: 77,
            airdrop_tracker: 9,
        }
    }

    fn sample_player_round() -> PlayerRoundState {
        PlayerRoundState {
            player_pk: Pubkey::new_unique(),
            round_id: 7,
            last_affiliate_pk: Pubkey::default(),
            accum_keys: 10,
            accum_sol_added: 20,
            accum_winnings: 30,
            accum_aff: 40,
            withdrawn_winnings: 1,
            withdrawn_aff: 2,
            withdrawn_f3d: 3,
            dividend_mask: 4,
        }
    }

    #[test]
    fn game_state_round_trips() {
        let state = sample_game();
        let mut buf = vec![0u8; GAME_STATE_SIZE];
        state.pack(&mut buf).unwrap();
        assert_eq!(GameState::unpack(&buf).unwrap(), state);
    }

    #[test]
    fn round_state_round_trips() {
        let state = sample_round();
        let mut buf = vec![0u8; ROUND_STATE_SIZE];
        state.pack(&mut buf).unwrap();
        assert_eq!(RoundState::unpack(&buf).unwrap(), state);
    }

    #[test]
    fn player_round_state_round_trips() {
        let state = sample_player_round();
        let mut buf = vec![0u8; PLAYER_ROUND_STATE_SIZE];
        state.pack(&mut buf).unwrap();
        assert_eq!(PlayerRoundState::unpack(&buf).unwrap(), state);
    }

    #[test]
    fn wrong_buffer_length_is_rejected() {
        let state = sample_round();
        let mut buf = vec![0u8; ROUND_STATE_SIZE];
        state.pack(&mut buf).unwrap();

        assert_eq!(
            RoundState::unpack(&buf[..ROUND_STATE_SIZE - 1]).unwrap_err(),
            GameError::StateSizeMismatch.into()
        );
        let mut long = buf.clone();
        long.push(0);
        assert_eq!(
            RoundState::unpack(&long).unwrap_err(),
            GameError::StateSizeMismatch.into()
        );
    }

    #[test]
    fn team_bytes() {
        for byte in 0..4u8 {
            let team = Team::from_byte(byte).unwrap();
            let enc = borsh::to_vec(&team).unwrap();
            assert_eq!(enc, vec![byte]);
        }
        assert!(Team::from_byte(4).is_err());
    }

    #[test]
    fn zeroed_buffer_decodes_as_fresh_record() {
        // freshly created PDAs hand the processor all-zero data
        let round = RoundState::unpack(&vec![0u8; ROUND_STATE_SIZE]).unwrap();
        assert_eq!(round.round_id, 0);
        assert!(!round.ended);
        assert_eq!(round.lead_player_team, Team::Whale);
    }
}
