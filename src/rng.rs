//! Airdrop lottery draw.

use crate::math::TryRem;
use solana_program::clock::Clock;
use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

/// Generates a pseudo-random lottery ticket in the `[0, 1000)` range.
///
/// (!) NOT A REAL RANDOM NUMBER GENERATOR
///     Real randomness would come from an off-chain oracle. This draw hashes
///     the buyer's key with clock-derived entropy and is predictable by a
///     determined block producer; the original Ethereum protocol had exactly
///     this weakness. It is kept as a protocol parameter, not a security
///     boundary: the airdrop pays out a bounded side-pot only.
pub fn lottery_ticket(player_pk: &Pubkey, clock: &Clock) -> Result<u128, ProgramError> {
    let mut data = vec![];

    let temporal = clock.unix_timestamp as u64
        + clock.epoch
        + clock.slot
        + clock.epoch_start_timestamp as u64
        + clock.leader_schedule_epoch;

    data.extend_from_slice(&player_pk.to_bytes());
    data.extend_from_slice(&temporal.to_le_bytes());

    let hash = solana_program::keccak::hash(&data).to_bytes();
    let mut short_hash = [0u8; 16];
    short_hash.copy_from_slice(&hash[..16]);
    u128::from_le_bytes(short_hash).try_rem(1000)
}
