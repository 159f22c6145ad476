use soroban_sdk::{
    contractclient, contracttype, symbol_short, token::TokenClient, Address, Env,
};

use crate::{Allocation, Distribution, Strategy, StrategyTargets};

/// Referral code passed on every lending-pool supply.
pub const REFERRAL_CODE: u32 = 0;

// Ledgers an approval granted to a strategy contract stays valid for.
const APPROVAL_LEDGERS: u32 = 1;

/// Lending pool entry point used by `Strategy::LendingSupply`.
///
/// The pool pulls `amount` of `asset` from `from` (which has approved it) and
/// credits the position to `on_behalf_of`.
#[contractclient(name = "LendingPoolClient")]
pub trait LendingPoolInterface {
    fn supply(
        env: Env,
        from: Address,
        asset: Address,
        amount: i128,
        on_behalf_of: Address,
        referral_code: u32,
    );
}

/// Vault entry point used by `Strategy::VaultDeposit`. Returns minted shares.
#[contractclient(name = "VaultClient")]
pub trait VaultInterface {
    fn deposit(env: Env, from: Address, assets: i128, on_behalf_of: Address) -> i128;
}

#[contracttype]
#[derive(Clone)]
pub enum DistributionEvent {
    Allocated,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DispatchError {
    StrategyNotConfigured,
}

/// Check that every non-zero allocation has a strategy target.
pub fn ensure_targets(
    distribution: &Distribution,
    targets: &StrategyTargets,
) -> Result<(), DispatchError> {
    for allocation in distribution.allocations.iter() {
        if allocation.amount > 0 {
            resolve_target(targets, allocation.strategy)?;
        }
    }
    Ok(())
}

/// Pay out `distribution` from the current contract's own balance of `asset`.
///
/// Strategy targets are resolved for every non-zero allocation before any
/// token moves, so a missing target fails without side effects. External
/// strategy reverts abort the whole invocation. Every recipient gets an
/// `Allocated` event, zero allocations included.
pub fn dispatch(
    env: &Env,
    asset: &Address,
    distribution: &Distribution,
    targets: &StrategyTargets,
) -> Result<(), DispatchError> {
    ensure_targets(distribution, targets)?;

    for allocation in distribution.allocations.iter() {
        if allocation.amount > 0 {
            pay_out(env, asset, &allocation, targets)?;
        }

        env.events().publish(
            (symbol_short!("split"), DistributionEvent::Allocated),
            (allocation.recipient, allocation.amount, allocation.strategy),
        );
    }

    Ok(())
}

fn pay_out(
    env: &Env,
    asset: &Address,
    allocation: &Allocation,
    targets: &StrategyTargets,
) -> Result<(), DispatchError> {
    let token = TokenClient::new(env, asset);
    let this = env.current_contract_address();

    match resolve_target(targets, allocation.strategy)? {
        None => token.transfer(&this, &allocation.recipient, &allocation.amount),
        Some(target) => {
            let expiration = env.ledger().sequence() + APPROVAL_LEDGERS;
            token.approve(&this, &target, &allocation.amount, &expiration);
            if allocation.strategy == Strategy::LendingSupply {
                LendingPoolClient::new(env, &target).supply(
                    &this,
                    asset,
                    &allocation.amount,
                    &allocation.recipient,
                    &REFERRAL_CODE,
                );
            } else {
                VaultClient::new(env, &target).deposit(
                    &this,
                    &allocation.amount,
                    &allocation.recipient,
                );
            }
        }
    }

    Ok(())
}

// `None` means a plain transfer; `Some` is the contract to approve and call.
fn resolve_target(
    targets: &StrategyTargets,
    strategy: Strategy,
) -> Result<Option<Address>, DispatchError> {
    match strategy {
        Strategy::DirectTransfer => Ok(None),
        Strategy::LendingSupply => targets
            .lending_pool
            .clone()
            .map(Some)
            .ok_or(DispatchError::StrategyNotConfigured),
        Strategy::VaultDeposit => targets
            .vault
            .clone()
            .map(Some)
            .ok_or(DispatchError::StrategyNotConfigured),
    }
}
