//! Associated Token Account 地址派生
//!
//! 纯计算，不访问 RPC：PDA seeds = [owner, token_program, mint]，
//! program = Associated Token Account program

use once_cell::sync::Lazy;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::error::SwapError;

pub static TOKEN_PROGRAM_ID: Lazy<Pubkey> = Lazy::new(|| {
    Pubkey::try_from("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA")
        .expect("Invalid TOKEN_PROGRAM_ID")
});

pub static TOKEN_2022_PROGRAM_ID: Lazy<Pubkey> = Lazy::new(|| {
    Pubkey::try_from("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb")
        .expect("Invalid TOKEN_2022_PROGRAM_ID")
});

pub static ASSOCIATED_TOKEN_PROGRAM_ID: Lazy<Pubkey> = Lazy::new(|| {
    Pubkey::try_from("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL")
        .expect("Invalid ASSOCIATED_TOKEN_PROGRAM_ID")
});

/// 解析 base58 标识符（钱包地址 / mint）
pub fn parse_identifier(field: &'static str, value: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(value.trim()).map_err(|_| SwapError::invalid_identifier(field, value))
}

/// 派生钱包在某个 mint 下的 ATA（字符串入参）
pub fn derive_associated_address(owner: &str, mint: &str) -> Result<Pubkey, SwapError> {
    let owner = parse_identifier("owner", owner)?;
    let mint = parse_identifier("mint", mint)?;
    Ok(get_associated_token_address(&owner, &mint))
}

/// 派生 ATA（SPL Token v3）
pub fn get_associated_token_address(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address_with_program(wallet, mint, &TOKEN_PROGRAM_ID)
}

/// 派生 ATA，指定 token program（支持 Token-2022）
pub fn get_associated_token_address_with_program(
    wallet: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(
        &[
            wallet.as_ref(),
            token_program.as_ref(),
            mint.as_ref(),
        ],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}
