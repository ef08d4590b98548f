//! Thin wrappers over the SPL token program. This is the only ledger-asset
//! interface the game uses: move `amount` between two accounts, or read an
//! account's balance off its unpacked state.

use solana_program::{
    account_info::AccountInfo,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
};

pub struct TokenInitializeAccountParams<'a> {
    pub account: AccountInfo<'a>,
    pub mint: AccountInfo<'a>,
    pub owner: AccountInfo<'a>,
    pub rent: AccountInfo<'a>,
    pub token_program: AccountInfo<'a>,
}

pub struct TokenTransferParams<'a, 'b> {
    pub source: AccountInfo<'a>,
    pub destination: AccountInfo<'a>,
    pub authority: AccountInfo<'a>,
    pub token_program: AccountInfo<'a>,
    pub amount: u64,
    /// Empty when the authority signs the transaction itself; the game PDA's
    /// seeds when the program moves pot funds.
    pub authority_signer_seeds: &'b [&'b [u8]],
}

pub fn spl_token_init_account(params: TokenInitializeAccountParams) -> Result<(), ProgramError> {
    let TokenInitializeAccountParams {
        account,
        mint,
        owner,
        rent,
        token_program,
    } = params;
    let ix = spl_token::instruction::initialize_account(
        token_program.key,
        account.key,
        mint.key,
        owner.key,
    )?;
    invoke(&ix, &[account, mint, owner, rent, token_program])
}

pub fn spl_token_transfer(params: TokenTransferParams) -> Result<(), ProgramError> {
    let TokenTransferParams {
        source,
        destination,
        authority,
        token_program,
        amount,
        authority_signer_seeds,
    } = params;
    let ix = spl_token::instruction::transfer(
        token_program.key,
        source.key,
        destination.key,
        authority.key,
        &[],
        amount,
    )?;
    if authority_signer_seeds.is_empty() {
        invoke(&ix, &[source, destination, authority, token_program])
    } else {
        invoke_signed(
            &ix,
            &[source, destination, authority, token_program],
            &[authority_signer_seeds],
        )
    }
}
