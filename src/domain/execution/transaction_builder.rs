//! Unsigned transaction assembly for instruction plans

use serde::{Deserialize, Serialize};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::Message,
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::Keypair,
    transaction::Transaction,
};
use tracing::{debug, info};

use super::composer::InstructionPlan;
use crate::shared::errors::{ComposeResult, PositionError};

/// Compute budget prefix settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub priority_fee_micro_lamports: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            unit_limit: 400_000,
            priority_fee_micro_lamports: 10_000,
        }
    }
}

impl ComputeBudget {
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut instructions = vec![ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit)];
        if self.priority_fee_micro_lamports > 0 {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(
                self.priority_fee_micro_lamports,
            ));
        }
        instructions
    }
}

/// Builds the unsigned transaction handed to the chain submitter
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    budget: ComputeBudget,
}

impl TransactionBuilder {
    pub fn new(budget: ComputeBudget) -> Self {
        Self { budget }
    }

    /// Compute budget prefix plus the plan's instructions, partially signed by
    /// `extra_signers` (the new position mint). The payer signature is left to the submitter.
    pub fn build_unsigned(
        &self,
        plan: &InstructionPlan,
        program_id: &Pubkey,
        payer: &Pubkey,
        recent_blockhash: Hash,
        extra_signers: &[&Keypair],
    ) -> ComposeResult<Transaction> {
        let mut instructions = self.budget.instructions();
        instructions.extend(plan.instructions(program_id)?);

        let message = Message::new_with_blockhash(&instructions, Some(payer), &recent_blockhash);
        let mut transaction = Transaction::new_unsigned(message);
        if !extra_signers.is_empty() {
            transaction
                .try_partial_sign(extra_signers, recent_blockhash)
                .map_err(|e| PositionError::Chain(format!("failed to sign with position mint: {}", e)))?;
        }

        self.validate_transaction(&transaction)?;
        info!(
            "🔨 Built transaction for plan {} with {} instructions",
            plan.id,
            transaction.message.instructions.len()
        );
        Ok(transaction)
    }

    /// Wire bytes accepted by the chain submitter
    pub fn serialize(transaction: &Transaction) -> ComposeResult<Vec<u8>> {
        bincode::serialize(transaction)
            .map_err(|e| PositionError::Chain(format!("failed to serialize transaction: {}", e)))
    }

    pub fn validate_transaction(&self, transaction: &Transaction) -> ComposeResult<()> {
        if transaction.message.instructions.is_empty() {
            return Err(PositionError::InvalidAmount("transaction has no instructions".to_string()));
        }
        let size = Self::serialize(transaction)?.len();
        if size > PACKET_DATA_SIZE {
            return Err(PositionError::Chain(format!(
                "transaction too large: {} bytes (limit {})",
                size, PACKET_DATA_SIZE
            )));
        }
        debug!("Transaction size {} bytes", size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::context::EngineContext;
    use crate::domain::execution::composer::{DepositRequest, TransactionComposer};
    use crate::domain::testing::{sample_pool, sample_position, wallet};
    use crate::shared::types::{PriceRange, TokenSide};
    use solana_sdk::signature::Signer;

    #[test]
    fn test_open_and_deposit_fits_one_packet() {
        let ctx = EngineContext::default();
        let pool = sample_pool(126.0);
        let mint = Keypair::new();
        let request = DepositRequest {
            wallet: wallet(),
            range: PriceRange::new(120.0, 132.0).unwrap(),
            input: TokenSide::A,
            amount: 1_000_000_000,
            slippage_bps: 50,
        };
        let plan = TransactionComposer::new(&ctx)
            .compose_deposit(&pool, &request, &[], &mint.pubkey())
            .unwrap();

        let transaction = TransactionBuilder::default()
            .build_unsigned(&plan.plan, &ctx.program_id, &wallet(), Hash::default(), &[&mint])
            .unwrap();

        assert_eq!(transaction.message.instructions.len(), 4);
        assert_eq!(transaction.message.account_keys[0], wallet());
        // Payer signature still missing, mint signature present
        assert!(!transaction.is_signed());
        assert!(transaction.signatures.iter().any(|s| *s != Default::default()));
        assert!(TransactionBuilder::serialize(&transaction).unwrap().len() <= PACKET_DATA_SIZE);
    }

    #[test]
    fn test_close_transaction_fits_one_packet() {
        let ctx = EngineContext::default();
        let pool = sample_pool(126.0);
        let position = sample_position(&pool, 120.0, 132.0, 50_000_000_000);
        let (plan, _) = TransactionComposer::new(&ctx)
            .compose_close(&pool, &wallet(), &position, 50)
            .unwrap();
        let builder = TransactionBuilder::new(ComputeBudget {
            unit_limit: 300_000,
            priority_fee_micro_lamports: 0,
        });
        let transaction = builder
            .build_unsigned(&plan, &ctx.program_id, &wallet(), Hash::default(), &[])
            .unwrap();
        assert_eq!(transaction.message.instructions.len(), 1 + 5);
    }
}
