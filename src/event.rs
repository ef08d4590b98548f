use {
    base64::Engine,
    borsh::{BorshDeserialize, BorshSerialize},
    solana_program::{msg, pubkey::Pubkey},
};

/// Structured log events, borsh-encoded and base64-wrapped behind a stable
/// prefix so indexers can pick them out of the program log.
#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub enum GameEvent {
    GameInitialized {
        version: u8,
        mint: Pubkey,
    },
    RoundOpened {
        round_id: u64,
        start_time: i64,
        end_time: i64,
        carried: u128,
    },
    KeysPurchased {
        round_id: u64,
        player: Pubkey,
        amount: u128,
        keys: u128,
        /// Marginal key price after this purchase, for indexers tracking
        /// the curve.
        price: u128,
    },
    AirdropWon {
        round_id: u64,
        player: Pubkey,
        prize: u128,
    },
    SolWithdrawn {
        round_id: u64,
        player: Pubkey,
        amount: u128,
    },
    RoundEnded {
        round_id: u64,
        winner: Pubkey,
        grand_prize: u128,
    },
    CommunityWithdrawn {
        round_id: u64,
        wallet: Pubkey,
        amount: u128,
    },
}

impl GameEvent {
    pub fn emit(&self) {
        if let Ok(data) = borsh::to_vec(self) {
            let b64 = base64::engine::general_purpose::STANDARD.encode(data);
            msg!("FOMO_EVENT:{}", b64);
        }
    }
}
