//! Stand-in strategy contracts for tests.

use soroban_sdk::{contract, contractimpl, contracttype, token::TokenClient, Address, Env};

#[contracttype]
#[derive(Clone)]
enum MockKey {
    Asset,
    Position(Address),
    LastReferral,
}

fn credit(env: &Env, account: Address, amount: i128) {
    let key = MockKey::Position(account);
    let current: i128 = env.storage().instance().get(&key).unwrap_or(0);
    env.storage().instance().set(&key, &(current + amount));
}

fn position(env: &Env, account: Address) -> i128 {
    env.storage()
        .instance()
        .get(&MockKey::Position(account))
        .unwrap_or(0)
}

/// Lending pool that pulls the approved amount and books it 1:1.
#[contract]
pub struct MockLendingPool;

#[contractimpl]
impl MockLendingPool {
    pub fn supply(
        env: Env,
        from: Address,
        asset: Address,
        amount: i128,
        on_behalf_of: Address,
        referral_code: u32,
    ) {
        let pool = env.current_contract_address();
        TokenClient::new(&env, &asset).transfer_from(&pool, &from, &pool, &amount);
        credit(&env, on_behalf_of, amount);
        env.storage()
            .instance()
            .set(&MockKey::LastReferral, &referral_code);
    }

    pub fn supplied(env: Env, account: Address) -> i128 {
        position(&env, account)
    }

    pub fn last_referral(env: Env) -> Option<u32> {
        env.storage().instance().get(&MockKey::LastReferral)
    }
}

/// Single-asset vault minting one share per deposited unit.
#[contract]
pub struct MockVault;

#[contractimpl]
impl MockVault {
    pub fn init(env: Env, asset: Address) {
        env.storage().instance().set(&MockKey::Asset, &asset);
    }

    pub fn deposit(env: Env, from: Address, assets: i128, on_behalf_of: Address) -> i128 {
        let asset: Address = env
            .storage()
            .instance()
            .get(&MockKey::Asset)
            .expect("vault asset not set");
        let vault = env.current_contract_address();
        TokenClient::new(&env, &asset).transfer_from(&vault, &from, &vault, &assets);
        credit(&env, on_behalf_of, assets);
        assets
    }

    pub fn shares_of(env: Env, account: Address) -> i128 {
        position(&env, account)
    }
}

pub use reverting::{RevertingVault, RevertingVaultClient};

// Own module: each contract's generated entry points live at module level.
mod reverting {
    use soroban_sdk::{contract, contractimpl, Address, Env};

    /// Vault whose deposits always revert.
    #[contract]
    pub struct RevertingVault;

    #[contractimpl]
    impl RevertingVault {
        pub fn deposit(
            _env: Env,
            _from: Address,
            _assets: i128,
            _on_behalf_of: Address,
        ) -> i128 {
            panic!("vault paused");
        }
    }
}
