//! Account plumbing around the pure state machine.
//!
//! Each handler follows the same shape: read and verify every account it was
//! handed, deserialize records, run the pure transition from [`machine`] /
//! [`lifecycle`], perform the token movement the transition reported, and
//! write the mutated records back. All game semantics live in the pure
//! modules; this file only connects them to the runtime.

use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    sysvar::Sysvar,
};
use spl_token::state::Account;

use crate::{
    curve::current_key_price,
    error::GameError,
    event::GameEvent,
    instruction::{GameInstruction, PurchaseKeysParams, WithdrawParams},
    lifecycle, machine,
    machine::CommunityRecipient,
    math::TryCast,
    pda::{
        account_exists, create_game_state, create_pot, create_round_state,
        deserialize_game_state, deserialize_or_create_player_round_state,
        deserialize_player_round_state, deserialize_pot, deserialize_round_state, GAME_SEED,
    },
    rng::lottery_ticket,
    state::{PlayerRoundState, ROUND_INC_TIME, ROUND_INIT_TIME, ROUND_MAX_TIME},
    token::{spl_token_transfer, TokenTransferParams},
};

pub struct Processor;

impl Processor {
    pub fn process(program_id: &Pubkey, accounts: &[AccountInfo], input: &[u8]) -> ProgramResult {
        match GameInstruction::unpack(input)? {
            GameInstruction::InitGame { version } => {
                msg!("Instruction: InitGame");
                Self::process_init_game(program_id, accounts, version)
            }
            GameInstruction::InitRound => {
                msg!("Instruction: InitRound");
                Self::process_init_round(program_id, accounts)
            }
            GameInstruction::PurchaseKeys(params) => {
                msg!("Instruction: PurchaseKeys");
                Self::process_purchase_keys(program_id, accounts, params)
            }
            GameInstruction::WithdrawSol(params) => {
                msg!("Instruction: WithdrawSol");
                Self::process_withdraw_sol(program_id, accounts, params)
            }
            GameInstruction::EndRound => {
                msg!("Instruction: EndRound");
                Self::process_end_round(program_id, accounts)
            }
            GameInstruction::WithdrawCommunity(params) => {
                msg!("Instruction: WithdrawCommunity");
                Self::process_withdraw_community(program_id, accounts, params)
            }
        }
    }

    fn process_init_game(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        version: u8,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let creator_info = next_account_info(account_info_iter)?;
        let game_state_info = next_account_info(account_info_iter)?;
        let community_wallet_info = next_account_info(account_info_iter)?;
        let p3d_wallet_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !creator_info.is_signer {
            return Err(GameError::MissingSignature.into());
        }

        // both payout wallets must hold the settlement asset
        for wallet_info in [community_wallet_info, p3d_wallet_info] {
            let wallet = Account::unpack(&wallet_info.data.borrow())?;
            if wallet.mint != *mint_info.key {
                return Err(GameError::WrongMint.into());
            }
        }

        let mut game_state = create_game_state(
            game_state_info,
            creator_info,
            system_program_info,
            version,
            program_id,
        )?;

        game_state.round_id = 0;
        game_state.round_init_time = ROUND_INIT_TIME;
        game_state.round_inc_time = ROUND_INC_TIME;
        game_state.round_max_time = ROUND_MAX_TIME;
        game_state.version = version;
        game_state.mint = *mint_info.key;
        game_state.game_creator = *creator_info.key;
        game_state.community_wallet = *community_wallet_info.key;
        game_state.p3d_wallet = *p3d_wallet_info.key;
        game_state.pack(&mut game_state_info.data.borrow_mut())?;

        GameEvent::GameInitialized {
            version,
            mint: *mint_info.key,
        }
        .emit();
        Ok(())
    }

    fn process_init_round(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let funder_info = next_account_info(account_info_iter)?;
        let game_state_info = next_account_info(account_info_iter)?;
        let round_state_info = next_account_info(account_info_iter)?;
        let pot_info = next_account_info(account_info_iter)?;
        let mint_info = next_account_info(account_info_iter)?;
        let rent_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if !funder_info.is_signer {
            return Err(GameError::MissingSignature.into());
        }

        let (mut game_state, bump) = deserialize_game_state(game_state_info, program_id)?;
        if *mint_info.key != game_state.mint {
            return Err(GameError::WrongMint.into());
        }

        // rounds after the first roll the previous round's next-round share
        // forward, which needs its record and pot
        let prev_accounts = if game_state.round_id >= 1 {
            let prev_round_info = account_info_iter
                .next()
                .ok_or(GameError::MissingPreviousRound)?;
            let prev_pot_info = account_info_iter
                .next()
                .ok_or(GameError::MissingPreviousRound)?;
            let prev_round = deserialize_round_state(
                prev_round_info,
                game_state.round_id,
                game_state.version,
                program_id,
            )?;
            deserialize_pot(
                prev_pot_info,
                game_state.round_id,
                game_state.version,
                program_id,
            )?;
            Some((prev_round_info, prev_pot_info, prev_round))
        } else {
            None
        };

        let now = Clock::get()?.unix_timestamp;
        let mut prev_round = prev_accounts.as_ref().map(|(_, _, r)| r.clone());
        let (round_state, carried) =
            lifecycle::open_round(&mut game_state, prev_round.as_mut(), now)?;

        create_round_state(
            round_state_info,
            funder_info,
            system_program_info,
            round_state.round_id,
            game_state.version,
            program_id,
        )?;
        create_pot(
            pot_info,
            game_state_info,
            funder_info,
            mint_info,
            rent_info,
            system_program_info,
            token_program_info,
            round_state.round_id,
            game_state.version,
            program_id,
        )?;

        if let Some((prev_round_info, prev_pot_info, _)) = prev_accounts {
            if carried > 0 {
                spl_token_transfer(TokenTransferParams {
                    source: prev_pot_info.clone(),
                    destination: pot_info.clone(),
                    authority: game_state_info.clone(),
                    token_program: token_program_info.clone(),
                    amount: carried.try_cast()?,
                    authority_signer_seeds: &[GAME_SEED, &[game_state.version], &[bump]],
                })?;
            }
            if let Some(prev_round) = prev_round {
                prev_round.pack(&mut prev_round_info.data.borrow_mut())?;
            }
        }

        round_state.pack(&mut round_state_info.data.borrow_mut())?;
        game_state.pack(&mut game_state_info.data.borrow_mut())?;

        GameEvent::RoundOpened {
            round_id: round_state.round_id,
            start_time: round_state.start_time,
            end_time: round_state.end_time,
            carried,
        }
        .emit();
        Ok(())
    }

    fn process_purchase_keys(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        params: PurchaseKeysParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let game_state_info = next_account_info(account_info_iter)?;
        let round_state_info = next_account_info(account_info_iter)?;
        let player_round_state_info = next_account_info(account_info_iter)?;
        let pot_info = next_account_info(account_info_iter)?;
        let player_token_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            return Err(GameError::MissingSignature.into());
        }

        let (game_state, _) = deserialize_game_state(game_state_info, program_id)?;
        let mut round_state = deserialize_round_state(
            round_state_info,
            game_state.round_id,
            game_state.version,
            program_id,
        )?;
        deserialize_pot(
            pot_info,
            game_state.round_id,
            game_state.version,
            program_id,
        )?;
        let mut player_state = deserialize_or_create_player_round_state(
            player_round_state_info,
            player_info,
            system_program_info,
            player_info.key,
            game_state.round_id,
            game_state.version,
            program_id,
        )?;

        // a referrer sticks from the purchase that names one; naming yourself
        // is silently ignored
        if let Some(affiliate_pk) = params.affiliate {
            if affiliate_pk != *player_info.key {
                player_state.last_affiliate_pk = affiliate_pk;
            }
        }

        let mut affiliate: Option<(&AccountInfo, PlayerRoundState)> =
            if player_state.has_affiliate() {
                let affiliate_info = account_info_iter
                    .next()
                    .ok_or(ProgramError::NotEnoughAccountKeys)?;
                let affiliate_state = deserialize_or_create_player_round_state(
                    affiliate_info,
                    player_info,
                    system_program_info,
                    &player_state.last_affiliate_pk,
                    game_state.round_id,
                    game_state.version,
                    program_id,
                )?;
                Some((affiliate_info, affiliate_state))
            } else {
                None
            };

        let player_token = Account::unpack(&player_token_info.data.borrow())?;
        if player_token.mint != game_state.mint {
            return Err(GameError::WrongMint.into());
        }

        let clock = Clock::get()?;
        let ticket = lottery_ticket(player_info.key, &clock)?;

        let outcome = machine::purchase_keys(
            &game_state,
            &mut round_state,
            &mut player_state,
            affiliate.as_mut().map(|(_, state)| state),
            params.amount,
            params.team,
            ticket,
            clock.unix_timestamp,
        )?;

        let accepted: u64 = outcome.accepted_amount.try_cast()?;
        if player_token.amount < accepted {
            return Err(GameError::InsufficientFunds.into());
        }
        spl_token_transfer(TokenTransferParams {
            source: player_token_info.clone(),
            destination: pot_info.clone(),
            authority: player_info.clone(),
            token_program: token_program_info.clone(),
            amount: accepted,
            authority_signer_seeds: &[],
        })?;

        round_state.pack(&mut round_state_info.data.borrow_mut())?;
        player_state.pack(&mut player_round_state_info.data.borrow_mut())?;
        if let Some((affiliate_info, affiliate_state)) = affiliate {
            affiliate_state.pack(&mut affiliate_info.data.borrow_mut())?;
        }

        GameEvent::KeysPurchased {
            round_id: round_state.round_id,
            player: *player_info.key,
            amount: outcome.accepted_amount,
            keys: outcome.new_keys,
            price: current_key_price(round_state.accum_sol_pot)?,
        }
        .emit();
        if outcome.airdrop_prize > 0 {
            GameEvent::AirdropWon {
                round_id: round_state.round_id,
                player: *player_info.key,
                prize: outcome.airdrop_prize,
            }
            .emit();
        }
        Ok(())
    }

    fn process_withdraw_sol(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        params: WithdrawParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let player_info = next_account_info(account_info_iter)?;
        let game_state_info = next_account_info(account_info_iter)?;
        let round_state_info = next_account_info(account_info_iter)?;
        let player_round_state_info = next_account_info(account_info_iter)?;
        let pot_info = next_account_info(account_info_iter)?;
        let player_token_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        if !player_info.is_signer {
            return Err(GameError::MissingSignature.into());
        }

        let (game_state, bump) = deserialize_game_state(game_state_info, program_id)?;
        let round_state = deserialize_round_state(
            round_state_info,
            params.round_id,
            game_state.version,
            program_id,
        )?;
        deserialize_pot(pot_info, params.round_id, game_state.version, program_id)?;

        // a player who never bought into this round has no record, hence
        // nothing to pay
        if !account_exists(player_round_state_info) {
            return Err(GameError::NothingToWithdraw.into());
        }
        let mut player_state = deserialize_player_round_state(
            player_round_state_info,
            player_info.key,
            params.round_id,
            game_state.version,
            program_id,
        )?;

        let destination = Account::unpack(&player_token_info.data.borrow())?;
        if destination.mint != game_state.mint {
            return Err(GameError::WrongMint.into());
        }

        let total = machine::withdraw_player(&round_state, &mut player_state)?;

        spl_token_transfer(TokenTransferParams {
            source: pot_info.clone(),
            destination: player_token_info.clone(),
            authority: game_state_info.clone(),
            token_program: token_program_info.clone(),
            amount: total.try_cast()?,
            authority_signer_seeds: &[GAME_SEED, &[game_state.version], &[bump]],
        })?;

        player_state.pack(&mut player_round_state_info.data.borrow_mut())?;

        GameEvent::SolWithdrawn {
            round_id: params.round_id,
            player: *player_info.key,
            amount: total,
        }
        .emit();
        Ok(())
    }

    fn process_end_round(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let game_state_info = next_account_info(account_info_iter)?;
        let round_state_info = next_account_info(account_info_iter)?;

        let (game_state, _) = deserialize_game_state(game_state_info, program_id)?;
        let mut round_state = deserialize_round_state(
            round_state_info,
            game_state.round_id,
            game_state.version,
            program_id,
        )?;

        // anyone can crank an expired round; only the creator's signature
        // ends one early
        let forced =
            authority_info.is_signer && *authority_info.key == game_state.game_creator;

        // a round with purchases has a leader whose record takes the prize
        let mut winner: Option<(&AccountInfo, PlayerRoundState)> = if round_state.accum_keys > 0 {
            let winner_info = account_info_iter
                .next()
                .ok_or(ProgramError::NotEnoughAccountKeys)?;
            let winner_state = deserialize_player_round_state(
                winner_info,
                &round_state.lead_player_pk,
                round_state.round_id,
                game_state.version,
                program_id,
            )?;
            Some((winner_info, winner_state))
        } else {
            None
        };

        let now = Clock::get()?.unix_timestamp;
        let outcome = lifecycle::end_round(
            &mut round_state,
            winner.as_mut().map(|(_, state)| state),
            now,
            forced,
        )?;

        round_state.pack(&mut round_state_info.data.borrow_mut())?;
        if let Some((winner_info, winner_state)) = winner {
            winner_state.pack(&mut winner_info.data.borrow_mut())?;
        }

        GameEvent::RoundEnded {
            round_id: round_state.round_id,
            winner: round_state.lead_player_pk,
            grand_prize: outcome.grand_prize,
        }
        .emit();
        Ok(())
    }

    fn process_withdraw_community(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        params: WithdrawParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let game_state_info = next_account_info(account_info_iter)?;
        let round_state_info = next_account_info(account_info_iter)?;
        let pot_info = next_account_info(account_info_iter)?;
        let wallet_info = next_account_info(account_info_iter)?;
        let wallet_owner_info = next_account_info(account_info_iter)?;
        let token_program_info = next_account_info(account_info_iter)?;

        let (game_state, bump) = deserialize_game_state(game_state_info, program_id)?;
        let mut round_state = deserialize_round_state(
            round_state_info,
            params.round_id,
            game_state.version,
            program_id,
        )?;
        deserialize_pot(pot_info, params.round_id, game_state.version, program_id)?;

        let recipient = if *wallet_info.key == game_state.community_wallet {
            CommunityRecipient::Community
        } else if *wallet_info.key == game_state.p3d_wallet {
            CommunityRecipient::P3d
        } else {
            return Err(GameError::WrongRecipient.into());
        };

        if !wallet_owner_info.is_signer {
            return Err(GameError::MissingSignature.into());
        }
        let wallet = Account::unpack(&wallet_info.data.borrow())?;
        if wallet.owner != *wallet_owner_info.key {
            return Err(GameError::WrongRecipient.into());
        }

        let amount = machine::withdraw_community(&mut round_state, recipient)?;

        spl_token_transfer(TokenTransferParams {
            source: pot_info.clone(),
            destination: wallet_info.clone(),
            authority: game_state_info.clone(),
            token_program: token_program_info.clone(),
            amount: amount.try_cast()?,
            authority_signer_seeds: &[GAME_SEED, &[game_state.version], &[bump]],
        })?;

        round_state.pack(&mut round_state_info.data.borrow_mut())?;

        GameEvent::CommunityWithdrawn {
            round_id: params.round_id,
            wallet: *wallet_info.key,
            amount,
        }
        .emit();
        Ok(())
    }
}
