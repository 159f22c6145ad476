//! Shared deployment harness for the end-to-end payroll and gifting flows.

use fund_distributor::{FundDistributor, FundDistributorClient};
use recurring_splitter::{RecurringSplitter, RecurringSplitterClient};
use share_registry::{ShareRegistry, ShareRegistryClient};
use shares::testutils::{MockLendingPool, MockLendingPoolClient, MockVault, MockVaultClient};
use soroban_sdk::{
    contract, contractimpl, contracttype,
    testutils::Address as _,
    token::{StellarAssetClient, TokenClient},
    Address, Env, Symbol,
};

#[contracttype]
#[derive(Clone)]
enum KeeperKey {
    NextTask,
    Active(u64),
}

/// Keeper network stand-in: hands out task ids and tracks which are live.
#[contract]
pub struct MockKeeper;

#[contractimpl]
impl MockKeeper {
    pub fn register_task(env: Env, _target: Address, _function: Symbol) -> u64 {
        let task_id: u64 = env
            .storage()
            .instance()
            .get(&KeeperKey::NextTask)
            .unwrap_or(0u64)
            + 1;
        env.storage().instance().set(&KeeperKey::NextTask, &task_id);
        env.storage()
            .instance()
            .set(&KeeperKey::Active(task_id), &true);
        task_id
    }

    pub fn cancel_task(env: Env, task_id: u64) {
        env.storage()
            .instance()
            .set(&KeeperKey::Active(task_id), &false);
    }

    pub fn is_active(env: Env, task_id: u64) -> bool {
        env.storage()
            .instance()
            .get(&KeeperKey::Active(task_id))
            .unwrap_or(false)
    }
}

/// Every contract of the system deployed into one test environment, with a
/// lending pool and a vault wired in as strategy targets.
pub struct Deployment<'a> {
    pub env: Env,
    pub admin: Address,
    pub registry: ShareRegistryClient<'a>,
    pub distributor: FundDistributorClient<'a>,
    pub engine: RecurringSplitterClient<'a>,
    pub pool: MockLendingPoolClient<'a>,
    pub vault: MockVaultClient<'a>,
    pub keeper: MockKeeperClient<'a>,
    pub token: TokenClient<'a>,
    pub minter: StellarAssetClient<'a>,
}

impl<'a> Deployment<'a> {
    pub fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        let admin = Address::generate(&env);

        let token_admin = Address::generate(&env);
        let token_contract = env.register_stellar_asset_contract_v2(token_admin);
        let token = TokenClient::new(&env, &token_contract.address());
        let minter = StellarAssetClient::new(&env, &token_contract.address());

        let pool_id = env.register_contract(None, MockLendingPool);
        let vault_id = env.register_contract(None, MockVault);
        let vault = MockVaultClient::new(&env, &vault_id);
        vault.init(&token.address);

        let registry_id = env.register_contract(None, ShareRegistry);
        let distributor_id = env.register_contract(None, FundDistributor);
        let engine_id = env.register_contract(None, RecurringSplitter);
        let keeper_id = env.register_contract(None, MockKeeper);

        let distributor = FundDistributorClient::new(&env, &distributor_id);
        distributor.init(&admin, &Some(pool_id.clone()), &Some(vault_id.clone()));

        let engine = RecurringSplitterClient::new(&env, &engine_id);
        engine.init(
            &admin,
            &registry_id,
            &Some(pool_id.clone()),
            &Some(vault_id.clone()),
        );

        Deployment {
            registry: ShareRegistryClient::new(&env, &registry_id),
            pool: MockLendingPoolClient::new(&env, &pool_id),
            keeper: MockKeeperClient::new(&env, &keeper_id),
            distributor,
            engine,
            vault,
            token,
            minter,
            admin,
            env,
        }
    }

    /// New account holding `amount` of the test token.
    pub fn funded_account(&self, amount: i128) -> Address {
        let account = Address::generate(&self.env);
        if amount > 0 {
            self.minter.mint(&account, &amount);
        }
        account
    }
}

impl<'a> Default for Deployment<'a> {
    fn default() -> Self {
        Self::new()
    }
}
