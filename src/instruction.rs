//! Instruction wire format: a one-byte discriminant followed by a fixed,
//! tag-specific payload. The codec only validates shape; referenced-record
//! consistency is the processor's job.

use solana_program::program_error::ProgramError;
use solana_program::pubkey::Pubkey;

use crate::error::GameError;
use crate::state::Team;

#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseKeysParams {
    /// Lamports of the settlement asset to spend.
    pub amount: u128,
    pub team: Team,
    /// Newly declared referrer, if the buyer names one with this purchase.
    pub affiliate: Option<Pubkey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithdrawParams {
    pub round_id: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameInstruction {
    /// Creates the per-version game record.
    /// Accounts expected:
    /// 0. `[signer]` Game creator, pays for the record
    /// 1. `[writable]` Game state account (PDA `["game", version]`)
    /// 2. `[]` Community wallet (token account of the mint)
    /// 3. `[]` P3d wallet (token account of the mint)
    /// 4. `[]` Settlement asset mint
    /// 5. `[]` System program
    InitGame { version: u8 },

    /// Opens round `round_id + 1` and its pot.
    /// Accounts expected:
    /// 0. `[signer]` Funder, pays for the new records
    /// 1. `[writable]` Game state account
    /// 2. `[writable]` New round state account (PDA `["round", id, version]`)
    /// 3. `[writable]` New pot token account (PDA `["pot", id, version]`)
    /// 4. `[]` Settlement asset mint
    /// 5. `[]` Rent sysvar
    /// 6. `[]` System program
    /// 7. `[]` Token program
    /// 8. `[writable]` Previous round state (rounds after the first only)
    /// 9. `[writable]` Previous pot (rounds after the first only)
    InitRound,

    /// Buys keys in the current round.
    /// Accounts expected:
    /// 0. `[signer]` Player
    /// 1. `[]` Game state account
    /// 2. `[writable]` Round state account
    /// 3. `[writable]` Player-round state (PDA `["pr", pk[..16], id, version]`)
    /// 4. `[writable]` Pot token account
    /// 5. `[writable]` Player's token account (source of funds)
    /// 6. `[]` System program
    /// 7. `[]` Token program
    /// 8. `[writable]` Affiliate's player-round state (only when the player
    ///    has, or is declaring, a referrer)
    PurchaseKeys(PurchaseKeysParams),

    /// Pays out the player's accrued winnings/affiliate/dividend balance.
    /// Accounts expected:
    /// 0. `[signer]` Player
    /// 1. `[]` Game state account
    /// 2. `[]` Round state account for the requested round
    /// 3. `[writable]` Player-round state
    /// 4. `[writable]` Pot token account
    /// 5. `[writable]` Player's token account (destination)
    /// 6. `[]` Token program
    WithdrawSol(WithdrawParams),

    /// Freezes the current round and assigns the grand prize to the leader.
    /// Accounts expected:
    /// 0. `[]` Authority; must sign as the game creator to force-end early
    /// 1. `[]` Game state account
    /// 2. `[writable]` Round state account
    /// 3. `[writable]` Leader's player-round state (rounds with purchases)
    EndRound,

    /// Pays the community (or p3d) share of a round to its recorded wallet.
    /// Accounts expected:
    /// 0. `[]` Game state account
    /// 1. `[writable]` Round state account for the requested round
    /// 2. `[writable]` Pot token account
    /// 3. `[writable]` Recipient wallet (the recorded community or p3d one)
    /// 4. `[signer]` Recipient wallet's owner
    /// 5. `[]` Token program
    WithdrawCommunity(WithdrawParams),
}

const TAG_INIT_GAME: u8 = 0;
const TAG_INIT_ROUND: u8 = 1;
const TAG_PURCHASE_KEYS: u8 = 2;
const TAG_WITHDRAW_SOL: u8 = 3;
const TAG_END_ROUND: u8 = 4;
const TAG_WITHDRAW_COMMUNITY: u8 = 5;

impl GameInstruction {
    /// Unpacks a byte buffer into a [`GameInstruction`].
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&tag, rest) = input
            .split_first()
            .ok_or(GameError::TruncatedInstruction)?;
        match tag {
            TAG_INIT_GAME => {
                let [version] = exact::<1>(rest)?;
                Ok(Self::InitGame { version })
            }
            TAG_INIT_ROUND => {
                exact::<0>(rest)?;
                Ok(Self::InitRound)
            }
            TAG_PURCHASE_KEYS => {
                if rest.len() < 18 {
                    return Err(GameError::TruncatedInstruction.into());
                }
                let (fixed, tail) = rest.split_at(18);
                let amount = u128::from_le_bytes(exact::<16>(&fixed[..16])?);
                let team = Team::from_byte(fixed[16])?;
                let affiliate = match fixed[17] {
                    0 => {
                        if !tail.is_empty() {
                            return Err(GameError::TruncatedInstruction.into());
                        }
                        None
                    }
                    1 => {
                        let pk_bytes: [u8; 32] = exact::<32>(tail)?;
                        Some(Pubkey::new_from_array(pk_bytes))
                    }
                    _ => return Err(GameError::TruncatedInstruction.into()),
                };
                Ok(Self::PurchaseKeys(PurchaseKeysParams {
                    amount,
                    team,
                    affiliate,
                }))
            }
            TAG_WITHDRAW_SOL => Ok(Self::WithdrawSol(unpack_withdraw(rest)?)),
            TAG_END_ROUND => {
                exact::<0>(rest)?;
                Ok(Self::EndRound)
            }
            TAG_WITHDRAW_COMMUNITY => Ok(Self::WithdrawCommunity(unpack_withdraw(rest)?)),
            _ => Err(GameError::UnknownInstructionTag.into()),
        }
    }

    /// Packs the instruction into its wire form; exact inverse of `unpack`.
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::InitGame { version } => vec![TAG_INIT_GAME, *version],
            Self::InitRound => vec![TAG_INIT_ROUND],
            Self::PurchaseKeys(params) => {
                let mut buf = Vec::with_capacity(1 + 16 + 1 + 1 + 32);
                buf.push(TAG_PURCHASE_KEYS);
                buf.extend_from_slice(&params.amount.to_le_bytes());
                buf.push(params.team as u8);
                match params.affiliate {
                    None => buf.push(0),
                    Some(pk) => {
                        buf.push(1);
                        buf.extend_from_slice(pk.as_ref());
                    }
                }
                buf
            }
            Self::WithdrawSol(params) => pack_withdraw(TAG_WITHDRAW_SOL, params),
            Self::EndRound => vec![TAG_END_ROUND],
            Self::WithdrawCommunity(params) => pack_withdraw(TAG_WITHDRAW_COMMUNITY, params),
        }
    }
}

fn unpack_withdraw(rest: &[u8]) -> Result<WithdrawParams, ProgramError> {
    let bytes: [u8; 8] = exact::<8>(rest)?;
    Ok(WithdrawParams {
        round_id: u64::from_le_bytes(bytes),
    })
}

fn pack_withdraw(tag: u8, params: &WithdrawParams) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.push(tag);
    buf.extend_from_slice(&params.round_id.to_le_bytes());
    buf
}

/// The payload must be exactly `N` bytes; anything shorter or longer is a
/// malformed instruction.
fn exact<const N: usize>(rest: &[u8]) -> Result<[u8; N], ProgramError> {
    let bytes: [u8; N] = rest
        .try_into()
        .map_err(|_| GameError::TruncatedInstruction)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_tags_round_trip() {
        let cases = vec![
            GameInstruction::InitGame { version: 7 },
            GameInstruction::InitRound,
            GameInstruction::PurchaseKeys(PurchaseKeysParams {
                amount: 500_000_000,
                team: Team::Bear,
                affiliate: None,
            }),
            GameInstruction::PurchaseKeys(PurchaseKeysParams {
                amount: u128::MAX,
                team: Team::Snek,
                affiliate: Some(Pubkey::new_unique()),
            }),
            GameInstruction::WithdrawSol(WithdrawParams { round_id: 3 }),
            GameInstruction::EndRound,
            GameInstruction::WithdrawCommunity(WithdrawParams { round_id: u64::MAX }),
        ];
        for ix in cases {
            assert_eq!(GameInstruction::unpack(&ix.pack()).unwrap(), ix);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert_eq!(
            GameInstruction::unpack(&[6]).unwrap_err(),
            GameError::UnknownInstructionTag.into()
        );
        assert_eq!(
            GameInstruction::unpack(&[255, 1, 2, 3]).unwrap_err(),
            GameError::UnknownInstructionTag.into()
        );
    }

    #[test]
    fn short_payloads_are_rejected() {
        assert_eq!(
            GameInstruction::unpack(&[]).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
        // InitGame without the version byte
        assert_eq!(
            GameInstruction::unpack(&[0]).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
        // WithdrawSol with a 4-byte round id
        assert_eq!(
            GameInstruction::unpack(&[3, 1, 2, 3, 4]).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
        // PurchaseKeys cut off mid-amount
        assert_eq!(
            GameInstruction::unpack(&[2, 0, 0, 0]).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
        // PurchaseKeys claiming an affiliate but not carrying one
        let mut buf = GameInstruction::PurchaseKeys(PurchaseKeysParams {
            amount: 1,
            team: Team::Whale,
            affiliate: None,
        })
        .pack();
        *buf.last_mut().unwrap() = 1;
        assert_eq!(
            GameInstruction::unpack(&buf).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let mut buf = GameInstruction::EndRound.pack();
        buf.push(0);
        assert_eq!(
            GameInstruction::unpack(&buf).unwrap_err(),
            GameError::TruncatedInstruction.into()
        );
    }

    #[test]
    fn invalid_team_is_rejected() {
        let mut buf = GameInstruction::PurchaseKeys(PurchaseKeysParams {
            amount: 1,
            team: Team::Whale,
            affiliate: None,
        })
        .pack();
        buf[17] = 9;
        assert_eq!(
            GameInstruction::unpack(&buf).unwrap_err(),
            GameError::InvalidTeam.into()
        );
    }
}
