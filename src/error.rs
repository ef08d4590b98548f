use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use solana_program::program_error::{PrintProgramError, ProgramError};
use solana_program::{decode_error::DecodeError, msg};
use thiserror::Error;

/// Every way a game transition can be rejected. Codec errors fire before any
/// state is read, precondition errors before any state is written.
#[derive(Clone, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum GameError {
    // --------------------------------------- codec
    #[error("unknown instruction tag")]
    UnknownInstructionTag,
    #[error("instruction payload shorter or longer than its tag requires")]
    TruncatedInstruction,
    #[error("record buffer length does not match the fixed record width")]
    StateSizeMismatch,
    #[error("record version tag does not match the expected schema version")]
    StateVersionMismatch,
    #[error("team byte is not a known team")]
    InvalidTeam,

    // --------------------------------------- preconditions
    #[error("game state already initialized for this version")]
    AlreadyInitialized,
    #[error("previous round has not ended yet")]
    RoundNotEnded,
    #[error("round deadline has passed")]
    RoundExpired,
    #[error("round has already been ended")]
    RoundEnded,
    #[error("round deadline has not passed and no forced-end authority signed")]
    RoundStillActive,
    #[error("nothing left to withdraw")]
    NothingToWithdraw,
    #[error("purchase too small to buy a whole key")]
    PurchaseTooSmall,
    #[error("previous round accounts required for rollover were not supplied")]
    MissingPreviousRound,

    // --------------------------------------- funds
    #[error("insufficient token balance for this purchase")]
    InsufficientFunds,

    // --------------------------------------- invariants
    #[error("arithmetic overflow")]
    Overflow,
    #[error("pot total diverged from the sum of its share accumulators")]
    PotImbalance,

    // --------------------------------------- account plumbing
    #[error("required signature is missing")]
    MissingSignature,
    #[error("account is owned by the wrong program")]
    InvalidOwner,
    #[error("account does not match its derived address")]
    PdaMismatch,
    #[error("wallet is neither the community nor the p3d recipient")]
    WrongRecipient,
    #[error("token account does not belong to the game mint")]
    WrongMint,
}

impl From<GameError> for ProgramError {
    fn from(e: GameError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for GameError {
    fn type_of() -> &'static str {
        "GameError"
    }
}

impl PrintProgramError for GameError {
    fn print<E>(&self)
    where
        E: 'static + std::error::Error + DecodeError<E> + PrintProgramError + FromPrimitive,
    {
        msg!("{}", self);
    }
}
