//! A round-based key-purchase game as a native Solana program.
//!
//! Players buy "keys" into the current round with an SPL token; each purchase
//! pushes the round deadline out a little, the price of a key rises with the
//! pot, and whoever holds the last purchase when the clock runs out wins the
//! grand prize. The rest of every purchase fans out to key-holder dividends,
//! an airdrop side-pot, team-dependent fee splits, an affiliate commission
//! and the seed for the next round.
//!
//! The crate splits into a pure core and runtime plumbing:
//!
//! - [`state`], [`instruction`]: record + wire codecs
//! - [`curve`], [`rng`], [`math`]: pricing, lottery draw, checked arithmetic
//! - [`machine`], [`lifecycle`]: the pure state machine (purchases,
//!   withdrawals, round open/end)
//! - [`pda`], [`token`], [`processor`]: account verification and CPI

#[cfg(not(feature = "no-entrypoint"))]
mod entrypoint;

pub mod curve;
pub mod error;
pub mod event;
pub mod instruction;
pub mod lifecycle;
pub mod machine;
pub mod math;
pub mod pda;
pub mod processor;
pub mod rng;
pub mod state;
pub mod token;
