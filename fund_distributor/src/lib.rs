#![no_std]
use shares::{
    allocate, dispatch, ensure_targets, validate_recipients, with_strategy, Allocation,
    DispatchError, Distribution, ShareError, ShareRecipient, Strategy, StrategyTargets,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token::TokenClient, vec,
    Address, Env, Vec,
};

// Storage TTL constants for active data
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17280; // ~1 day
const INSTANCE_BUMP_AMOUNT: u32 = 518400; // ~30 days

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    InvalidAmount = 4,
    EmptyRecipients = 5,
    TooManyRecipients = 6,
    InvalidShare = 7,
    InvalidShareTotal = 8,
    StrategyNotConfigured = 9,
}

impl From<ShareError> for Error {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::EmptyRecipients => Error::EmptyRecipients,
            ShareError::TooManyRecipients => Error::TooManyRecipients,
            ShareError::InvalidShare => Error::InvalidShare,
            ShareError::InvalidShareTotal => Error::InvalidShareTotal,
        }
    }
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::StrategyNotConfigured => Error::StrategyNotConfigured,
        }
    }
}

/// Events emitted by the contract for audit trail
#[contracttype]
#[derive(Clone)]
pub enum DistributorEvent {
    Initialized,
    StrategiesUpdated,
    Distributed,
    Forwarded,
    Supplied,
}

#[contract]
pub struct FundDistributor;

#[contractimpl]
impl FundDistributor {
    /// Initialize the distributor with an admin and optional strategy targets.
    ///
    /// # Errors
    /// * `AlreadyInitialized` - If `init` has already run
    pub fn init(
        env: Env,
        admin: Address,
        lending_pool: Option<Address>,
        vault: Option<Address>,
    ) -> Result<(), Error> {
        admin.require_auth();

        if env.storage().instance().has(&symbol_short!("ADMIN")) {
            return Err(Error::AlreadyInitialized);
        }

        Self::extend_instance_ttl(&env);
        env.storage()
            .instance()
            .set(&symbol_short!("ADMIN"), &admin);
        env.storage().instance().set(
            &symbol_short!("TARGETS"),
            &StrategyTargets {
                lending_pool,
                vault,
            },
        );

        env.events().publish(
            (symbol_short!("distrib"), DistributorEvent::Initialized),
            admin,
        );

        Ok(())
    }

    /// Replace the lending pool and vault addresses. Admin only.
    pub fn set_strategies(
        env: Env,
        caller: Address,
        lending_pool: Option<Address>,
        vault: Option<Address>,
    ) -> Result<(), Error> {
        caller.require_auth();

        let admin: Address = env
            .storage()
            .instance()
            .get(&symbol_short!("ADMIN"))
            .ok_or(Error::NotInitialized)?;
        if admin != caller {
            return Err(Error::Unauthorized);
        }

        Self::extend_instance_ttl(&env);
        let targets = StrategyTargets {
            lending_pool,
            vault,
        };
        env.storage()
            .instance()
            .set(&symbol_short!("TARGETS"), &targets);

        env.events().publish(
            (symbol_short!("distrib"), DistributorEvent::StrategiesUpdated),
            targets,
        );

        Ok(())
    }

    /// Configured strategy targets; both empty before `init`.
    pub fn get_strategies(env: Env) -> StrategyTargets {
        Self::load_targets(&env)
    }

    /// Compute allocations for `total_amount` without moving funds.
    ///
    /// Returns all-zero allocations for zero or negative amounts.
    pub fn calculate_allocations(
        env: Env,
        total_amount: i128,
        recipients: Vec<ShareRecipient>,
    ) -> Result<Distribution, Error> {
        validate_recipients(&recipients)?;
        Ok(allocate(&env, total_amount, &recipients))
    }

    /// Split `total_amount` of `asset` across `recipients` and route each
    /// allocation through its strategy.
    ///
    /// Only the covered part of the amount is pulled from `payer`; the
    /// `retained` remainder never leaves the payer's balance.
    ///
    /// # Arguments
    /// * `payer` - Address funding the distribution (must authorize)
    /// * `asset` - Token contract address
    /// * `total_amount` - Amount to split (must be positive)
    /// * `recipients` - Recipient set, shares in basis points
    ///
    /// # Errors
    /// * `InvalidAmount` - If `total_amount` is not positive
    /// * `StrategyNotConfigured` - If a recipient uses a strategy with no target
    /// * share validation errors
    pub fn distribute(
        env: Env,
        payer: Address,
        asset: Address,
        total_amount: i128,
        recipients: Vec<ShareRecipient>,
    ) -> Result<Distribution, Error> {
        payer.require_auth();
        validate_recipients(&recipients)?;
        if total_amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        Self::extend_instance_ttl(&env);
        let distribution = allocate(&env, total_amount, &recipients);
        Self::pull_and_dispatch(&env, &payer, &asset, &distribution)?;

        env.events().publish(
            (symbol_short!("distrib"), DistributorEvent::Distributed),
            (payer, total_amount, distribution.retained),
        );

        Ok(distribution)
    }

    /// Send `amount` straight from `payer` to `recipient`.
    pub fn forward(
        env: Env,
        payer: Address,
        asset: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<(), Error> {
        payer.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        TokenClient::new(&env, &asset).transfer(&payer, &recipient, &amount);

        env.events().publish(
            (symbol_short!("distrib"), DistributorEvent::Forwarded),
            (payer, recipient, amount),
        );

        Ok(())
    }

    /// Supply `amount` to the lending pool on behalf of `on_behalf_of`.
    pub fn supply(
        env: Env,
        payer: Address,
        asset: Address,
        amount: i128,
        on_behalf_of: Address,
    ) -> Result<(), Error> {
        payer.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        Self::extend_instance_ttl(&env);
        let distribution = Distribution {
            allocations: vec![
                &env,
                Allocation {
                    recipient: on_behalf_of.clone(),
                    amount,
                    strategy: Strategy::LendingSupply,
                },
            ],
            retained: 0,
        };
        Self::pull_and_dispatch(&env, &payer, &asset, &distribution)?;

        env.events().publish(
            (symbol_short!("distrib"), DistributorEvent::Supplied),
            (payer, on_behalf_of, amount),
        );

        Ok(())
    }

    /// `distribute` with every recipient routed to the lending pool.
    pub fn split_supply(
        env: Env,
        payer: Address,
        asset: Address,
        total_amount: i128,
        recipients: Vec<ShareRecipient>,
    ) -> Result<Distribution, Error> {
        let routed = with_strategy(&env, &recipients, Strategy::LendingSupply);
        Self::distribute(env, payer, asset, total_amount, routed)
    }

    /// `distribute` with every recipient routed to the vault.
    pub fn split_deposit(
        env: Env,
        payer: Address,
        asset: Address,
        total_amount: i128,
        recipients: Vec<ShareRecipient>,
    ) -> Result<Distribution, Error> {
        let routed = with_strategy(&env, &recipients, Strategy::VaultDeposit);
        Self::distribute(env, payer, asset, total_amount, routed)
    }

    fn pull_and_dispatch(
        env: &Env,
        payer: &Address,
        asset: &Address,
        distribution: &Distribution,
    ) -> Result<(), Error> {
        let targets = Self::load_targets(env);
        ensure_targets(distribution, &targets)?;

        let pulled = distribution.distributed();
        if pulled > 0 {
            TokenClient::new(env, asset).transfer(
                payer,
                &env.current_contract_address(),
                &pulled,
            );
        }
        dispatch(env, asset, distribution, &targets)?;
        Ok(())
    }

    fn load_targets(env: &Env) -> StrategyTargets {
        env.storage()
            .instance()
            .get(&symbol_short!("TARGETS"))
            .unwrap_or(StrategyTargets {
                lending_pool: None,
                vault: None,
            })
    }

    /// Extend the TTL of instance storage
    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }
}

#[cfg(test)]
mod test;
