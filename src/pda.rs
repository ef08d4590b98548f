//! Address derivation and PDA plumbing.
//!
//! Every persistent record lives at a program-derived address built from
//! human-meaningful seeds, so records are discoverable from (version, round,
//! player) alone:
//!
//! - game state:   `["game", version]`
//! - round state:  `["round", round_id_le, version]`
//! - pot:          `["pot", round_id_le, version]`
//! - player-round: `["pr", player_pk[..16], round_id_le, version]`
//!
//! These seeds are the public contract other systems use to locate records;
//! they are stable for the lifetime of a `version` tag. Every account handed
//! to the processor is re-derived and compared before it is trusted.

use solana_program::{
    account_info::AccountInfo,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    system_instruction::create_account,
    sysvar::{rent::Rent, Sysvar},
};
use spl_token::state::Account;

use crate::{
    error::GameError,
    state::{
        GameState, PlayerRoundState, RoundState, GAME_STATE_SIZE, PLAYER_ROUND_STATE_SIZE,
        ROUND_STATE_SIZE,
    },
    token::{spl_token_init_account, TokenInitializeAccountParams},
};

pub const GAME_SEED: &[u8] = b"game";
pub const ROUND_SEED: &[u8] = b"round";
pub const POT_SEED: &[u8] = b"pot";
pub const PLAYER_ROUND_SEED: &[u8] = b"pr";

/// Half the player key goes into the seed; a 16-byte prefix keeps the seed
/// within bounds and is collision-resistant enough for record addressing.
pub const PLAYER_SEED_PREFIX_LEN: usize = 16;

// --------------------------------------- derivation

pub fn game_address(version: u8, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[GAME_SEED, &[version]], program_id)
}

pub fn round_address(round_id: u64, version: u8, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[ROUND_SEED, &round_id.to_le_bytes(), &[version]],
        program_id,
    )
}

pub fn pot_address(round_id: u64, version: u8, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POT_SEED, &round_id.to_le_bytes(), &[version]], program_id)
}

pub fn player_round_address(
    player_pk: &Pubkey,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[
            PLAYER_ROUND_SEED,
            &player_pk.as_ref()[..PLAYER_SEED_PREFIX_LEN],
            &round_id.to_le_bytes(),
            &[version],
        ],
        program_id,
    )
}

// --------------------------------------- record access

/// Verifies + deserializes the game record. The embedded version tag must
/// reproduce the account's own address: the version is baked into the PDA
/// seed, so a record carrying a foreign tag cannot masquerade as this game.
pub fn deserialize_game_state(
    game_state_info: &AccountInfo,
    program_id: &Pubkey,
) -> Result<(GameState, u8), ProgramError> {
    verify_record_owner(game_state_info, program_id)?;
    let game_state = GameState::unpack(&game_state_info.data.borrow())?;
    let (pda, bump) = game_address(game_state.version, program_id);
    if &pda != game_state_info.key {
        msg!(
            "game record version {} does not derive address {}",
            game_state.version,
            game_state_info.key
        );
        return Err(GameError::StateVersionMismatch.into());
    }
    Ok((game_state, bump))
}

/// Verifies + creates the game record; fails when one already exists.
pub fn create_game_state<'a>(
    game_state_info: &AccountInfo<'a>,
    funder_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    version: u8,
    program_id: &Pubkey,
) -> Result<GameState, ProgramError> {
    if account_exists(game_state_info) {
        return Err(GameError::AlreadyInitialized.into());
    }
    create_pda_with_space(
        &[GAME_SEED, &[version]],
        game_state_info,
        GAME_STATE_SIZE,
        program_id,
        funder_info,
        system_program_info,
        program_id,
    )?;
    GameState::unpack(&game_state_info.data.borrow())
}

/// Verifies + deserializes a round record.
pub fn deserialize_round_state(
    round_state_info: &AccountInfo,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<RoundState, ProgramError> {
    verify_record_owner(round_state_info, program_id)?;
    let round_state = RoundState::unpack(&round_state_info.data.borrow())?;
    let (pda, _) = round_address(round_id, version, program_id);
    verify_pda(&pda, round_state_info)?;
    Ok(round_state)
}

/// Verifies + creates a round record.
pub fn create_round_state<'a>(
    round_state_info: &AccountInfo<'a>,
    funder_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<RoundState, ProgramError> {
    create_pda_with_space(
        &[ROUND_SEED, &round_id.to_le_bytes(), &[version]],
        round_state_info,
        ROUND_STATE_SIZE,
        program_id,
        funder_info,
        system_program_info,
        program_id,
    )?;
    RoundState::unpack(&round_state_info.data.borrow())
}

/// Verifies + deserializes a round's pot token account.
pub fn deserialize_pot(
    pot_info: &AccountInfo,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<Account, ProgramError> {
    let pot = Account::unpack(&pot_info.data.borrow())?;
    let (pda, _) = pot_address(round_id, version, program_id);
    verify_pda(&pda, pot_info)?;
    Ok(pot)
}

/// Creates a round's pot and hands token authority over it to the game PDA.
#[allow(clippy::too_many_arguments)]
pub fn create_pot<'a>(
    pot_info: &AccountInfo<'a>,
    game_state_info: &AccountInfo<'a>,
    funder_info: &AccountInfo<'a>,
    mint_info: &AccountInfo<'a>,
    rent_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    token_program_info: &AccountInfo<'a>,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<Account, ProgramError> {
    create_pda_with_space(
        &[POT_SEED, &round_id.to_le_bytes(), &[version]],
        pot_info,
        Account::get_packed_len(),
        &spl_token::id(),
        funder_info,
        system_program_info,
        program_id,
    )?;
    spl_token_init_account(TokenInitializeAccountParams {
        account: pot_info.clone(),
        mint: mint_info.clone(),
        owner: game_state_info.clone(),
        rent: rent_info.clone(),
        token_program: token_program_info.clone(),
    })?;
    Account::unpack(&pot_info.data.borrow())
}

/// Verifies + deserializes a player-round record that must already exist.
pub fn deserialize_player_round_state(
    player_round_state_info: &AccountInfo,
    player_pk: &Pubkey,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<PlayerRoundState, ProgramError> {
    verify_record_owner(player_round_state_info, program_id)?;
    let state = PlayerRoundState::unpack(&player_round_state_info.data.borrow())?;
    let (pda, _) = player_round_address(player_pk, round_id, version, program_id);
    verify_pda(&pda, player_round_state_info)?;
    Ok(state)
}

/// Verifies + deserializes a player-round record, creating it lazily on the
/// player's first touch of the round.
pub fn deserialize_or_create_player_round_state<'a>(
    player_round_state_info: &AccountInfo<'a>,
    funder_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    player_pk: &Pubkey,
    round_id: u64,
    version: u8,
    program_id: &Pubkey,
) -> Result<PlayerRoundState, ProgramError> {
    let (pda, _) = player_round_address(player_pk, round_id, version, program_id);
    verify_pda(&pda, player_round_state_info)?;

    if !account_exists(player_round_state_info) {
        create_pda_with_space(
            &[
                PLAYER_ROUND_SEED,
                &player_pk.as_ref()[..PLAYER_SEED_PREFIX_LEN],
                &round_id.to_le_bytes(),
                &[version],
            ],
            player_round_state_info,
            PLAYER_ROUND_STATE_SIZE,
            program_id,
            funder_info,
            system_program_info,
            program_id,
        )?;
        let mut state = PlayerRoundState::unpack(&player_round_state_info.data.borrow())?;
        state.player_pk = *player_pk;
        state.round_id = round_id;
        Ok(state)
    } else {
        verify_record_owner(player_round_state_info, program_id)?;
        PlayerRoundState::unpack(&player_round_state_info.data.borrow())
    }
}

pub fn account_exists(acc: &AccountInfo) -> bool {
    let does_not_exist = **acc.lamports.borrow() == 0 || acc.data_is_empty();
    !does_not_exist
}

// --------------------------------------- private

fn verify_pda(expected: &Pubkey, pda_info: &AccountInfo) -> Result<(), ProgramError> {
    if expected != pda_info.key {
        msg!("pda mismatch: expected {}, got {}", expected, pda_info.key);
        return Err(GameError::PdaMismatch.into());
    }
    Ok(())
}

fn verify_record_owner(info: &AccountInfo, program_id: &Pubkey) -> Result<(), ProgramError> {
    if info.owner != program_id {
        return Err(GameError::InvalidOwner.into());
    }
    Ok(())
}

fn create_pda_with_space<'a>(
    seeds: &[&[u8]],
    pda_info: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    funder_info: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    program_id: &Pubkey,
) -> Result<u8, ProgramError> {
    let (pda, bump) = Pubkey::find_program_address(seeds, program_id);
    verify_pda(&pda, pda_info)?;

    let bump_slice = [bump];
    let mut full_seeds = seeds.to_vec();
    full_seeds.push(&bump_slice);

    // creating + allocating in one step can only be done from inside the
    // program, and fails if the account already carries lamports
    invoke_signed(
        &create_account(
            funder_info.key,
            pda_info.key,
            1.max(Rent::get()?.minimum_balance(space)),
            space as u64,
            owner,
        ),
        &[
            funder_info.clone(),
            pda_info.clone(),
            system_program_info.clone(),
        ],
        &[&full_seeds],
    )?;

    Ok(bump)
}
