//! Orca Whirlpool account layouts
//!
//! Accounts are decoded from their fixed Anchor layout after checking the
//! 8-byte account discriminator (`sha256("account:<Name>")[..8]`).

use solana_sdk::{hash::hashv, pubkey::Pubkey};

use crate::domain::distribution::{gross_liquidity_samples, InitializedTick, TickSample};
use crate::domain::tick::TICK_ARRAY_SIZE;
use crate::shared::errors::PositionError;
use crate::shared::types::{PoolSnapshot, Position, TokenMeta};

pub const WHIRLPOOL_ACCOUNT_LEN: usize = 653;
pub const POSITION_ACCOUNT_LEN: usize = 216;
pub const TICK_ARRAY_ACCOUNT_LEN: usize = 9988;
const TICK_LEN: usize = 113;

/// Offset of `decimals` in an SPL mint account
const MINT_DECIMALS_OFFSET: usize = 44;
/// Offsets in an SPL token account
pub const TOKEN_ACCOUNT_OWNER_OFFSET: usize = 32;
pub const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;

/// Offset of the whirlpool key inside a position account
pub const POSITION_WHIRLPOOL_OFFSET: usize = 8;

pub fn account_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("account:{}", name);
    let hash = hashv(&[preimage.as_bytes()]);
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash.to_bytes()[..8]);
    discriminator
}

/// Little-endian cursor over account bytes
struct AccountReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AccountReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], PositionError> {
        let end = self.offset + N;
        let bytes = self
            .data
            .get(self.offset..end)
            .ok_or_else(|| PositionError::Chain(format!("account data truncated at byte {}", self.offset)))?;
        self.offset = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn skip(&mut self, len: usize) {
        self.offset += len;
    }

    fn u8(&mut self) -> Result<u8, PositionError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, PositionError> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn i32(&mut self) -> Result<i32, PositionError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, PositionError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn u128(&mut self) -> Result<u128, PositionError> {
        Ok(u128::from_le_bytes(self.take()?))
    }

    fn i128(&mut self) -> Result<i128, PositionError> {
        Ok(i128::from_le_bytes(self.take()?))
    }

    fn pubkey(&mut self) -> Result<Pubkey, PositionError> {
        Ok(Pubkey::new_from_array(self.take()?))
    }
}

fn check_account(data: &[u8], name: &str, min_len: usize) -> Result<(), PositionError> {
    if data.len() < min_len {
        return Err(PositionError::Chain(format!(
            "{} account too short: {} bytes, expected {}",
            name,
            data.len(),
            min_len
        )));
    }
    if data[..8] != account_discriminator(name) {
        return Err(PositionError::Chain(format!("account is not a {}", name)));
    }
    Ok(())
}

/// Fields of a Whirlpool account the engine reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhirlpoolAccount {
    pub tick_spacing: u16,
    pub fee_rate: u16,
    pub liquidity: u128,
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    pub token_mint_a: Pubkey,
    pub token_vault_a: Pubkey,
    pub token_mint_b: Pubkey,
    pub token_vault_b: Pubkey,
}

impl WhirlpoolAccount {
    pub fn decode(data: &[u8]) -> Result<Self, PositionError> {
        check_account(data, "Whirlpool", WHIRLPOOL_ACCOUNT_LEN)?;
        let mut r = AccountReader::new(data);
        r.skip(8);
        r.skip(32); // whirlpools_config
        r.skip(1); // bump
        let tick_spacing = r.u16()?;
        r.skip(2); // tick_spacing_seed
        let fee_rate = r.u16()?;
        r.skip(2); // protocol_fee_rate
        let liquidity = r.u128()?;
        let sqrt_price = r.u128()?;
        let tick_current_index = r.i32()?;
        r.skip(16); // protocol fees owed
        let token_mint_a = r.pubkey()?;
        let token_vault_a = r.pubkey()?;
        r.skip(16);
        let token_mint_b = r.pubkey()?;
        let token_vault_b = r.pubkey()?;
        Ok(Self {
            tick_spacing,
            fee_rate,
            liquidity,
            sqrt_price,
            tick_current_index,
            token_mint_a,
            token_vault_a,
            token_mint_b,
            token_vault_b,
        })
    }

    pub fn into_snapshot(self, address: Pubkey, decimals_a: u8, decimals_b: u8, slot: u64) -> PoolSnapshot {
        PoolSnapshot {
            address,
            token_a: TokenMeta {
                mint: self.token_mint_a,
                vault: self.token_vault_a,
                decimals: decimals_a,
            },
            token_b: TokenMeta {
                mint: self.token_mint_b,
                vault: self.token_vault_b,
                decimals: decimals_b,
            },
            tick_spacing: self.tick_spacing,
            fee_rate: self.fee_rate,
            sqrt_price_x64: self.sqrt_price,
            tick_current_index: self.tick_current_index,
            liquidity: self.liquidity,
            slot,
        }
    }
}

/// Fields of a Position account the engine reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionAccount {
    pub whirlpool: Pubkey,
    pub position_mint: Pubkey,
    pub liquidity: u128,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub fee_owed_a: u64,
    pub fee_owed_b: u64,
}

impl PositionAccount {
    pub fn decode(data: &[u8]) -> Result<Self, PositionError> {
        check_account(data, "Position", POSITION_ACCOUNT_LEN)?;
        let mut r = AccountReader::new(data);
        r.skip(8);
        let whirlpool = r.pubkey()?;
        let position_mint = r.pubkey()?;
        let liquidity = r.u128()?;
        let tick_lower_index = r.i32()?;
        let tick_upper_index = r.i32()?;
        r.skip(16); // fee_growth_checkpoint_a
        let fee_owed_a = r.u64()?;
        r.skip(16); // fee_growth_checkpoint_b
        let fee_owed_b = r.u64()?;
        Ok(Self {
            whirlpool,
            position_mint,
            liquidity,
            tick_lower_index,
            tick_upper_index,
            fee_owed_a,
            fee_owed_b,
        })
    }

    pub fn into_position(self, address: Pubkey, owner: Pubkey, slot: u64) -> Position {
        Position {
            address,
            position_mint: self.position_mint,
            whirlpool: self.whirlpool,
            owner,
            tick_lower_index: self.tick_lower_index,
            tick_upper_index: self.tick_upper_index,
            liquidity: self.liquidity,
            fee_owed_a: self.fee_owed_a,
            fee_owed_b: self.fee_owed_b,
            slot,
        }
    }
}

/// Initialized ticks of one tick array
pub fn decode_tick_array(data: &[u8], tick_spacing: u16) -> Result<Vec<InitializedTick>, PositionError> {
    check_account(data, "TickArray", TICK_ARRAY_ACCOUNT_LEN)?;
    let mut r = AccountReader::new(data);
    r.skip(8);
    let start_tick_index = r.i32()?;
    let mut ticks = Vec::new();
    for i in 0..TICK_ARRAY_SIZE {
        let initialized = r.u8()? != 0;
        let liquidity_net = r.i128()?;
        let liquidity_gross = r.u128()?;
        r.skip(TICK_LEN - 33); // fee and reward growth
        if initialized {
            ticks.push(InitializedTick {
                index: start_tick_index + i * tick_spacing as i32,
                liquidity_net,
                liquidity_gross,
            });
        }
    }
    Ok(ticks)
}

/// Tick samples for the distribution from every decoded tick array
pub fn tick_samples_from_arrays(pool: &PoolSnapshot, arrays: &[Vec<u8>]) -> Result<Vec<TickSample>, PositionError> {
    let mut ticks = Vec::new();
    for data in arrays {
        ticks.extend(decode_tick_array(data, pool.tick_spacing)?);
    }
    Ok(gross_liquidity_samples(pool, &ticks))
}

pub fn mint_decimals(data: &[u8]) -> Result<u8, PositionError> {
    data.get(MINT_DECIMALS_OFFSET)
        .copied()
        .ok_or_else(|| PositionError::Chain("mint account too short".to_string()))
}

/// Amount held by an SPL token account
pub fn token_account_amount(data: &[u8]) -> Result<u64, PositionError> {
    let bytes = data
        .get(TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8)
        .ok_or_else(|| PositionError::Chain("token account too short".to_string()))?;
    let mut amount = [0u8; 8];
    amount.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(amount))
}

pub fn token_account_owner(data: &[u8]) -> Result<Pubkey, PositionError> {
    let bytes = data
        .get(TOKEN_ACCOUNT_OWNER_OFFSET..TOKEN_ACCOUNT_OWNER_OFFSET + 32)
        .ok_or_else(|| PositionError::Chain("token account too short".to_string()))?;
    let mut owner = [0u8; 32];
    owner.copy_from_slice(bytes);
    Ok(Pubkey::new_from_array(owner))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn whirlpool_bytes(account: &WhirlpoolAccount) -> Vec<u8> {
        let mut data = account_discriminator("Whirlpool").to_vec();
        data.extend_from_slice(&[0u8; 32]);
        data.push(255);
        data.extend_from_slice(&account.tick_spacing.to_le_bytes());
        data.extend_from_slice(&account.tick_spacing.to_le_bytes());
        data.extend_from_slice(&account.fee_rate.to_le_bytes());
        data.extend_from_slice(&300u16.to_le_bytes());
        data.extend_from_slice(&account.liquidity.to_le_bytes());
        data.extend_from_slice(&account.sqrt_price.to_le_bytes());
        data.extend_from_slice(&account.tick_current_index.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(account.token_mint_a.as_ref());
        data.extend_from_slice(account.token_vault_a.as_ref());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(account.token_mint_b.as_ref());
        data.extend_from_slice(account.token_vault_b.as_ref());
        data.resize(WHIRLPOOL_ACCOUNT_LEN, 0);
        data
    }

    pub fn position_bytes(account: &PositionAccount) -> Vec<u8> {
        let mut data = account_discriminator("Position").to_vec();
        data.extend_from_slice(account.whirlpool.as_ref());
        data.extend_from_slice(account.position_mint.as_ref());
        data.extend_from_slice(&account.liquidity.to_le_bytes());
        data.extend_from_slice(&account.tick_lower_index.to_le_bytes());
        data.extend_from_slice(&account.tick_upper_index.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&account.fee_owed_a.to_le_bytes());
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&account.fee_owed_b.to_le_bytes());
        data.resize(POSITION_ACCOUNT_LEN, 0);
        data
    }

    /// Tick array with the given `(offset_in_array, liquidity_net, liquidity_gross)` ticks initialized
    pub fn tick_array_bytes(start_tick_index: i32, initialized: &[(usize, i128, u128)]) -> Vec<u8> {
        let mut data = account_discriminator("TickArray").to_vec();
        data.extend_from_slice(&start_tick_index.to_le_bytes());
        for i in 0..TICK_ARRAY_SIZE as usize {
            let mut tick = [0u8; TICK_LEN];
            if let Some((_, net, gross)) = initialized.iter().find(|(offset, _, _)| *offset == i) {
                tick[0] = 1;
                tick[1..17].copy_from_slice(&net.to_le_bytes());
                tick[17..33].copy_from_slice(&gross.to_le_bytes());
            }
            data.extend_from_slice(&tick);
        }
        data.extend_from_slice(&[0u8; 32]);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn sample_whirlpool() -> WhirlpoolAccount {
        WhirlpoolAccount {
            tick_spacing: 64,
            fee_rate: 3000,
            liquidity: 123_456_789,
            sqrt_price: 1u128 << 64,
            tick_current_index: 0,
            token_mint_a: Pubkey::new_unique(),
            token_vault_a: Pubkey::new_unique(),
            token_mint_b: Pubkey::new_unique(),
            token_vault_b: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_whirlpool_layout() {
        let account = sample_whirlpool();
        let data = whirlpool_bytes(&account);
        assert_eq!(data.len(), WHIRLPOOL_ACCOUNT_LEN);
        assert_eq!(WhirlpoolAccount::decode(&data).unwrap(), account);

        let snapshot = account.clone().into_snapshot(Pubkey::new_unique(), 9, 6, 77);
        assert_eq!(snapshot.token_a.mint, account.token_mint_a);
        assert_eq!(snapshot.slot, 77);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let mut data = whirlpool_bytes(&sample_whirlpool());
        data[0] ^= 0xff;
        assert!(matches!(WhirlpoolAccount::decode(&data), Err(PositionError::Chain(_))));
        assert!(WhirlpoolAccount::decode(&data[..100]).is_err());
    }

    #[test]
    fn test_position_layout() {
        let account = PositionAccount {
            whirlpool: Pubkey::new_unique(),
            position_mint: Pubkey::new_unique(),
            liquidity: 42,
            tick_lower_index: -20736,
            tick_upper_index: -20672,
            fee_owed_a: 5,
            fee_owed_b: 6,
        };
        let data = position_bytes(&account);
        assert_eq!(data.len(), POSITION_ACCOUNT_LEN);
        assert_eq!(PositionAccount::decode(&data).unwrap(), account);
    }

    #[test]
    fn test_tick_array_layout() {
        let data = tick_array_bytes(-5632, &[(0, 100, 100), (10, -40, 60)]);
        assert_eq!(data.len(), TICK_ARRAY_ACCOUNT_LEN);
        let ticks = decode_tick_array(&data, 64).unwrap();
        assert_eq!(
            ticks,
            vec![
                InitializedTick { index: -5632, liquidity_net: 100, liquidity_gross: 100 },
                InitializedTick { index: -5632 + 640, liquidity_net: -40, liquidity_gross: 60 },
            ]
        );
    }

    #[test]
    fn test_tick_samples_use_gross_liquidity() {
        let pool = crate::domain::testing::sample_pool(1.0);
        let arrays = vec![
            tick_array_bytes(0, &[(1, -70, 30)]),
            tick_array_bytes(-5632, &[(87, 70, 130)]),
        ];
        let samples = tick_samples_from_arrays(&pool, &arrays).unwrap();
        let pairs: Vec<(i32, u128)> = samples.iter().map(|s| (s.tick, s.liquidity)).collect();
        assert_eq!(pairs, vec![(-64, 130), (64, 30)]);
    }

    #[test]
    fn test_token_account_fields() {
        let owner = Pubkey::new_unique();
        let mut data = vec![0u8; 165];
        data[32..64].copy_from_slice(owner.as_ref());
        data[64..72].copy_from_slice(&1u64.to_le_bytes());
        assert_eq!(token_account_owner(&data).unwrap(), owner);
        assert_eq!(token_account_amount(&data).unwrap(), 1);

        let mut mint = vec![0u8; 82];
        mint[44] = 6;
        assert_eq!(mint_decimals(&mint).unwrap(), 6);
        assert!(mint_decimals(&[0u8; 10]).is_err());
    }
}
