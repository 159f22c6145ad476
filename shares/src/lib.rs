#![no_std]
//! Share model shared by the registry, the distributor and the recurring
//! splitter: recipient sets expressed in basis points, the allocation math
//! that turns an amount into per-recipient payouts, and the dispatcher that
//! routes each payout through its strategy.

#[cfg(test)]
extern crate std;

use soroban_sdk::{contracttype, Address, Env, String, Vec};

mod strategy;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

pub use strategy::{
    dispatch, ensure_targets, DispatchError, DistributionEvent, LendingPoolClient, VaultClient,
    REFERRAL_CODE,
};

/// 10000 basis points = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Upper bound on a single recipient set.
pub const MAX_RECIPIENTS: u32 = 50;

/// Where a recipient's allocation ends up.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Strategy {
    DirectTransfer = 0,
    LendingSupply = 1,
    VaultDeposit = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareRecipient {
    pub wallet: Address,
    pub share_bps: u32,
    pub strategy: Strategy,
}

/// Named recipient set stored by the share registry.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ShareConfig {
    pub id: u32,
    pub owner: Address,
    pub name: String,
    pub description: String,
    pub recipients: Vec<ShareRecipient>,
    pub is_public: bool,
    /// Cleared by a soft delete; ids are never reused.
    pub active: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Allocation {
    pub recipient: Address,
    pub amount: i128,
    pub strategy: Strategy,
}

/// Result of splitting an amount over a recipient set.
///
/// `retained` is the part of the amount not covered by the shares; it stays
/// with the payer and is never pulled. Allocations plus `retained` always
/// add up to the input amount.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Distribution {
    pub allocations: Vec<Allocation>,
    pub retained: i128,
}

impl Distribution {
    /// Sum of all allocations, i.e. the amount that actually moves.
    pub fn distributed(&self) -> i128 {
        let mut total = 0i128;
        for allocation in self.allocations.iter() {
            total += allocation.amount;
        }
        total
    }
}

/// Addresses of the external strategy contracts a distributor may route to.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StrategyTargets {
    pub lending_pool: Option<Address>,
    pub vault: Option<Address>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShareError {
    EmptyRecipients,
    TooManyRecipients,
    InvalidShare,
    InvalidShareTotal,
}

/// Validate a recipient set and return the sum of its shares.
pub fn validate_recipients(recipients: &Vec<ShareRecipient>) -> Result<u32, ShareError> {
    if recipients.is_empty() {
        return Err(ShareError::EmptyRecipients);
    }
    if recipients.len() > MAX_RECIPIENTS {
        return Err(ShareError::TooManyRecipients);
    }

    let mut total = 0u32;
    for recipient in recipients.iter() {
        if recipient.share_bps > BPS_DENOMINATOR {
            return Err(ShareError::InvalidShare);
        }
        total += recipient.share_bps;
    }

    if total > BPS_DENOMINATOR {
        return Err(ShareError::InvalidShareTotal);
    }
    Ok(total)
}

/// `floor(total_amount * share_bps / 10000)` without risking multiplication
/// overflow.
pub fn share_of(total_amount: i128, share_bps: u32) -> i128 {
    let bps = share_bps as i128;
    let denominator = BPS_DENOMINATOR as i128;
    let quotient = total_amount / denominator;
    let remainder = total_amount % denominator;

    quotient * bps + (remainder * bps) / denominator
}

/// Split `total_amount` across an already validated recipient set.
///
/// Each recipient gets `floor(total * bps / 10000)` in list order. Flooring
/// dust goes to the last recipient with a non-zero share; the uncovered
/// part of the amount (when shares sum below 10000) is `retained`.
/// Non-positive amounts produce all-zero allocations.
pub fn allocate(env: &Env, total_amount: i128, recipients: &Vec<ShareRecipient>) -> Distribution {
    let mut allocations = Vec::new(env);

    if total_amount <= 0 {
        for recipient in recipients.iter() {
            allocations.push_back(Allocation {
                recipient: recipient.wallet,
                amount: 0,
                strategy: recipient.strategy,
            });
        }
        return Distribution {
            allocations,
            retained: 0,
        };
    }

    let mut total_bps = 0u32;
    let mut dust_receiver: Option<u32> = None;
    for (index, recipient) in recipients.iter().enumerate() {
        total_bps += recipient.share_bps;
        if recipient.share_bps > 0 {
            dust_receiver = Some(index as u32);
        }
    }

    let distributable = share_of(total_amount, total_bps);
    let mut assigned = 0i128;
    for (index, recipient) in recipients.iter().enumerate() {
        let amount = if dust_receiver == Some(index as u32) {
            distributable - assigned
        } else {
            share_of(total_amount, recipient.share_bps)
        };
        assigned += amount;
        allocations.push_back(Allocation {
            recipient: recipient.wallet,
            amount,
            strategy: recipient.strategy,
        });
    }

    Distribution {
        allocations,
        retained: total_amount - distributable,
    }
}

/// Copy of `recipients` with every strategy replaced by `strategy`.
pub fn with_strategy(
    env: &Env,
    recipients: &Vec<ShareRecipient>,
    strategy: Strategy,
) -> Vec<ShareRecipient> {
    let mut result = Vec::new(env);
    for recipient in recipients.iter() {
        result.push_back(ShareRecipient {
            wallet: recipient.wallet,
            share_bps: recipient.share_bps,
            strategy,
        });
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;
    use soroban_sdk::{testutils::Address as _, vec, Env};

    fn recipient(env: &Env, share_bps: u32) -> ShareRecipient {
        ShareRecipient {
            wallet: Address::generate(env),
            share_bps,
            strategy: Strategy::DirectTransfer,
        }
    }

    fn amounts(distribution: &Distribution) -> std::vec::Vec<i128> {
        distribution.allocations.iter().map(|a| a.amount).collect()
    }

    #[test]
    fn test_validate_full_share_set() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 6000), recipient(&env, 4000)];
        assert_eq!(validate_recipients(&recipients), Ok(10_000));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let env = Env::default();
        let recipients: Vec<ShareRecipient> = Vec::new(&env);
        assert_eq!(
            validate_recipients(&recipients),
            Err(ShareError::EmptyRecipients)
        );
    }

    #[test]
    fn test_validate_rejects_single_share_over_100_percent() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 10_001)];
        assert_eq!(
            validate_recipients(&recipients),
            Err(ShareError::InvalidShare)
        );
    }

    #[test]
    fn test_validate_rejects_total_over_100_percent() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 6000), recipient(&env, 4001)];
        assert_eq!(
            validate_recipients(&recipients),
            Err(ShareError::InvalidShareTotal)
        );
    }

    #[test]
    fn test_validate_rejects_too_many_recipients() {
        let env = Env::default();
        let mut recipients = Vec::new(&env);
        for _ in 0..(MAX_RECIPIENTS + 1) {
            recipients.push_back(recipient(&env, 1));
        }
        assert_eq!(
            validate_recipients(&recipients),
            Err(ShareError::TooManyRecipients)
        );
    }

    #[test]
    fn test_allocate_dust_goes_to_last_recipient() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 6667), recipient(&env, 3333)];

        let distribution = allocate(&env, 100, &recipients);
        assert_eq!(amounts(&distribution), [66, 34]);
        assert_eq!(distribution.retained, 0);
        assert_eq!(distribution.distributed(), 100);
    }

    #[test]
    fn test_allocate_partial_shares_retain_remainder() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 2500), recipient(&env, 2500)];

        let distribution = allocate(&env, 1001, &recipients);
        // 5000 bps of 1001 = 500 distributable, 501 stays with the payer
        assert_eq!(amounts(&distribution), [250, 250]);
        assert_eq!(distribution.retained, 501);
    }

    #[test]
    fn test_allocate_dust_skips_trailing_zero_share() {
        let env = Env::default();
        let recipients = vec![
            &env,
            recipient(&env, 3333),
            recipient(&env, 6667),
            recipient(&env, 0),
        ];

        let distribution = allocate(&env, 10, &recipients);
        assert_eq!(amounts(&distribution), [3, 7, 0]);
        assert_eq!(distribution.retained, 0);
    }

    #[test]
    fn test_allocate_all_zero_shares_retains_everything() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 0), recipient(&env, 0)];

        let distribution = allocate(&env, 500, &recipients);
        assert_eq!(amounts(&distribution), [0, 0]);
        assert_eq!(distribution.retained, 500);
    }

    #[test]
    fn test_allocate_non_positive_amount() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 10_000)];

        assert_eq!(amounts(&allocate(&env, 0, &recipients)), [0]);
        assert_eq!(amounts(&allocate(&env, -10, &recipients)), [0]);
    }

    #[test]
    fn test_share_of_large_amount_does_not_overflow() {
        let amount = i128::MAX - 7;
        let half = share_of(amount, 5000);
        assert_eq!(half, amount / 2);
    }

    #[test]
    fn test_mock_vaults_coexist() {
        use crate::testutils::{MockVault, MockVaultClient, RevertingVault, RevertingVaultClient};

        let env = Env::default();
        env.mock_all_auths();
        let vault = MockVaultClient::new(&env, &env.register_contract(None, MockVault));
        let paused = RevertingVaultClient::new(&env, &env.register_contract(None, RevertingVault));
        let depositor = Address::generate(&env);

        assert_eq!(vault.shares_of(&depositor), 0);
        assert!(paused.try_deposit(&depositor, &10, &depositor).is_err());
    }

    #[test]
    fn test_with_strategy_overrides_every_recipient() {
        let env = Env::default();
        let recipients = vec![&env, recipient(&env, 5000), recipient(&env, 5000)];

        let routed = with_strategy(&env, &recipients, Strategy::VaultDeposit);
        for r in routed.iter() {
            assert_eq!(r.strategy, Strategy::VaultDeposit);
        }
        assert_eq!(routed.get(0).unwrap().wallet, recipients.get(0).unwrap().wallet);
    }
}
