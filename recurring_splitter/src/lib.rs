#![no_std]
use shares::{
    allocate, dispatch, ensure_targets, DispatchError, Distribution, ShareConfig,
    StrategyTargets,
};
use soroban_sdk::{
    contract, contractclient, contracterror, contractimpl, contracttype, symbol_short,
    token::TokenClient, Address, Env, Map, Symbol, Vec,
};

// Storage TTL constants for active data
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17280; // ~1 day
const INSTANCE_BUMP_AMOUNT: u32 = 518400; // ~30 days

// Pagination limits for ready_schedules
const DEFAULT_PAGE_LIMIT: u32 = 20;
const MAX_PAGE_LIMIT: u32 = 50;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    InvalidSchedule = 4,
    NotFound = 5,
    NotOwner = 6,
    NotReady = 7,
    InsufficientAllowance = 8,
    InsufficientBalance = 9,
    ConfigNotFound = 10,
    ConfigInactive = 11,
    ConfigNotAccessible = 12,
    StrategyNotConfigured = 13,
    TaskAlreadyCreated = 14,
    TaskNotFound = 15,
    NotKeeper = 16,
    InsufficientFeeBalance = 17,
    InvalidAmount = 18,
    FeeBalanceOutstanding = 19,
    InvalidAsset = 20,
    RegistryUnavailable = 21,
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::StrategyNotConfigured => Error::StrategyNotConfigured,
        }
    }
}

/// Errors the share registry reports from `get_config`.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum RegistryError {
    NotFound = 1,
}

/// Lookup side of the share registry.
#[contractclient(name = "RegistryClient")]
pub trait ShareRegistryInterface {
    fn get_config(env: Env, config_id: u32) -> Result<ShareConfig, RegistryError>;
}

/// Task registration API of the external keeper network.
#[contractclient(name = "KeeperRegistryClient")]
pub trait KeeperRegistryInterface {
    fn register_task(env: Env, target: Address, function: Symbol) -> u64;
    fn cancel_task(env: Env, task_id: u64);
}

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScheduleStatus {
    Active,
    Cancelled,
    Exhausted,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schedule {
    pub id: u32,
    pub owner: Address,
    pub asset: Address,
    pub amount_per_execution: i128,
    pub interval_seconds: u64,
    pub next_execution: u64,
    pub execution_count: u32,
    /// 0 means unlimited
    pub max_executions: u32,
    pub active: bool,
    pub status: ScheduleStatus,
    pub config_id: u32,
    pub created_at: u64,
    pub last_executed: Option<u64>,
}

/// Answer to a keeper's "can this run now" poll.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CheckResult {
    pub can_execute: bool,
    /// One of `ready`, `inactive`, `exhausted`, `not_due`, `cfg_gone`,
    /// `bad_asset`, `no_bal`, `no_allow`
    pub reason: Symbol,
    pub next_execution: u64,
}

/// Keeper task registered for this engine. At most one exists.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AutomationTask {
    pub task_id: u64,
    pub keeper: Address,
    pub fee_token: Address,
    pub fee_per_execution: i128,
    pub created_at: u64,
}

/// Events emitted by the contract for audit trail
#[contracttype]
#[derive(Clone)]
pub enum ScheduleEvent {
    Created,
    Executed,
    Exhausted,
    Cancelled,
}

#[contracttype]
#[derive(Clone)]
pub enum AutomationEvent {
    TaskCreated,
    TaskCancelled,
    FeesFunded,
    FeesWithdrawn,
    KeeperPaid,
}

// Outcome of evaluating a schedule against the current ledger state.
enum Readiness {
    Ready(Distribution),
    Inactive,
    Exhausted,
    NotDue,
    ConfigMissing,
    ConfigDeleted,
    BadAsset,
    NoBalance,
    NoAllowance,
}

impl Readiness {
    fn reason(&self) -> Symbol {
        match self {
            Readiness::Ready(_) => symbol_short!("ready"),
            Readiness::Inactive => symbol_short!("inactive"),
            Readiness::Exhausted => symbol_short!("exhausted"),
            Readiness::NotDue => symbol_short!("not_due"),
            Readiness::ConfigMissing | Readiness::ConfigDeleted => symbol_short!("cfg_gone"),
            Readiness::BadAsset => symbol_short!("bad_asset"),
            Readiness::NoBalance => symbol_short!("no_bal"),
            Readiness::NoAllowance => symbol_short!("no_allow"),
        }
    }

    fn into_distribution(self) -> Result<Distribution, Error> {
        match self {
            Readiness::Ready(distribution) => Ok(distribution),
            Readiness::Inactive | Readiness::Exhausted | Readiness::NotDue => {
                Err(Error::NotReady)
            }
            Readiness::ConfigMissing => Err(Error::ConfigNotFound),
            Readiness::ConfigDeleted => Err(Error::ConfigInactive),
            Readiness::BadAsset => Err(Error::InvalidAsset),
            Readiness::NoBalance => Err(Error::InsufficientBalance),
            Readiness::NoAllowance => Err(Error::InsufficientAllowance),
        }
    }
}

#[contract]
pub struct RecurringSplitter;

#[contractimpl]
impl RecurringSplitter {
    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Initialize the engine.
    ///
    /// # Arguments
    /// * `admin` - Address allowed to manage strategies and the keeper task
    /// * `registry` - Share registry holding the recipient configs
    /// * `lending_pool` / `vault` - Optional strategy targets
    pub fn init(
        env: Env,
        admin: Address,
        registry: Address,
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
        env.storage()
            .instance()
            .set(&symbol_short!("REGISTRY"), &registry);
        env.storage().instance().set(
            &symbol_short!("TARGETS"),
            &StrategyTargets {
                lending_pool,
                vault,
            },
        );

        Ok(())
    }

    pub fn set_strategies(
        env: Env,
        caller: Address,
        lending_pool: Option<Address>,
        vault: Option<Address>,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        Self::extend_instance_ttl(&env);
        env.storage().instance().set(
            &symbol_short!("TARGETS"),
            &StrategyTargets {
                lending_pool,
                vault,
            },
        );

        Ok(())
    }

    pub fn get_strategies(env: Env) -> StrategyTargets {
        Self::load_targets(&env)
    }

    // -----------------------------------------------------------------------
    // Schedules
    // -----------------------------------------------------------------------

    /// Create a recurring split of `amount_per_execution` every
    /// `interval_seconds`, paid from `owner`'s allowance to this contract.
    ///
    /// The first execution is due one interval after creation.
    ///
    /// # Arguments
    /// * `owner` - Funding account (must authorize)
    /// * `asset` - Token contract address
    /// * `amount_per_execution` - Amount split on every run (must be positive)
    /// * `interval_seconds` - Fixed cadence between runs (must be positive)
    /// * `max_executions` - Run cap, 0 for unlimited
    /// * `config_id` - Share registry config to split by
    ///
    /// # Errors
    /// * `InvalidSchedule` - Non-positive amount or zero interval
    /// * `InvalidAsset` - `asset` does not answer the token interface
    /// * `ConfigNotFound` / `ConfigInactive` - Config missing or deleted
    /// * `ConfigNotAccessible` - Config is private and owned by someone else
    pub fn create_schedule(
        env: Env,
        owner: Address,
        asset: Address,
        amount_per_execution: i128,
        interval_seconds: u64,
        max_executions: u32,
        config_id: u32,
    ) -> Result<u32, Error> {
        owner.require_auth();

        if amount_per_execution <= 0 || interval_seconds == 0 {
            return Err(Error::InvalidSchedule);
        }

        let now = env.ledger().timestamp();
        let next_execution = now
            .checked_add(interval_seconds)
            .ok_or(Error::InvalidSchedule)?;

        if !matches!(TokenClient::new(&env, &asset).try_decimals(), Ok(Ok(_))) {
            return Err(Error::InvalidAsset);
        }

        let config = Self::fetch_config(&env, config_id)?.ok_or(Error::ConfigNotFound)?;
        if !config.active {
            return Err(Error::ConfigInactive);
        }
        if !config.is_public && config.owner != owner {
            return Err(Error::ConfigNotAccessible);
        }

        Self::extend_instance_ttl(&env);
        let mut schedules = Self::load_schedules(&env);

        let next_id = env
            .storage()
            .instance()
            .get(&symbol_short!("NEXT_ID"))
            .unwrap_or(0u32)
            + 1;

        let schedule = Schedule {
            id: next_id,
            owner: owner.clone(),
            asset,
            amount_per_execution,
            interval_seconds,
            next_execution,
            execution_count: 0,
            max_executions,
            active: true,
            status: ScheduleStatus::Active,
            config_id,
            created_at: now,
            last_executed: None,
        };

        schedules.set(next_id, schedule);
        env.storage()
            .instance()
            .set(&symbol_short!("SCHEDS"), &schedules);
        env.storage()
            .instance()
            .set(&symbol_short!("NEXT_ID"), &next_id);

        env.events().publish(
            (symbol_short!("schedule"), ScheduleEvent::Created),
            (next_id, owner),
        );

        Ok(next_id)
    }

    /// Side-effect free readiness check for keepers.
    pub fn checker(env: Env, schedule_id: u32) -> Result<CheckResult, Error> {
        let schedule = Self::load_schedules(&env)
            .get(schedule_id)
            .ok_or(Error::NotFound)?;
        let readiness = Self::evaluate(&env, &schedule)?;

        Ok(CheckResult {
            can_execute: matches!(readiness, Readiness::Ready(_)),
            reason: readiness.reason(),
            next_execution: schedule.next_execution,
        })
    }

    /// IDs of schedules that would pass `checker` right now, in ID order.
    pub fn ready_schedules(env: Env, limit: u32) -> Result<Vec<u32>, Error> {
        let limit = Self::clamp_limit(limit);
        let mut ready = Vec::new(&env);

        for (schedule_id, schedule) in Self::load_schedules(&env).iter() {
            if ready.len() >= limit {
                break;
            }
            if !schedule.active {
                continue;
            }
            if let Readiness::Ready(_) = Self::evaluate(&env, &schedule)? {
                ready.push_back(schedule_id);
            }
        }

        Ok(ready)
    }

    /// Run one split cycle of a schedule. Callable by anyone.
    ///
    /// Readiness is evaluated again here; a failed check leaves the schedule
    /// untouched. On success the owner's allowance is drawn, every allocation
    /// is dispatched, and the schedule advances by exactly one interval.
    ///
    /// # Errors
    /// * `NotFound` - Unknown schedule
    /// * `NotReady` - Inactive, exhausted or not yet due
    /// * `ConfigNotFound` / `ConfigInactive` - Config missing or deleted
    /// * `InvalidAsset` - Balance or allowance query on `asset` failed
    /// * `InsufficientBalance` / `InsufficientAllowance` - Owner cannot fund the run
    /// * `StrategyNotConfigured` - A recipient's strategy has no target
    pub fn execute(env: Env, schedule_id: u32) -> Result<Distribution, Error> {
        let mut schedules = Self::load_schedules(&env);
        let mut schedule = schedules.get(schedule_id).ok_or(Error::NotFound)?;
        let distribution = Self::evaluate(&env, &schedule)?.into_distribution()?;

        let targets = Self::load_targets(&env);
        ensure_targets(&distribution, &targets)?;

        Self::extend_instance_ttl(&env);

        let engine = env.current_contract_address();
        let pulled = distribution.distributed();
        if pulled > 0 {
            TokenClient::new(&env, &schedule.asset).transfer_from(
                &engine,
                &schedule.owner,
                &engine,
                &pulled,
            );
        }
        dispatch(&env, &schedule.asset, &distribution, &targets)?;

        let now = env.ledger().timestamp();
        schedule.next_execution = schedule
            .next_execution
            .saturating_add(schedule.interval_seconds);
        schedule.execution_count += 1;
        schedule.last_executed = Some(now);

        let exhausted =
            schedule.max_executions != 0 && schedule.execution_count >= schedule.max_executions;
        if exhausted {
            schedule.active = false;
            schedule.status = ScheduleStatus::Exhausted;
        }

        let count = schedule.execution_count;
        schedules.set(schedule_id, schedule);
        env.storage()
            .instance()
            .set(&symbol_short!("SCHEDS"), &schedules);

        env.events().publish(
            (symbol_short!("schedule"), ScheduleEvent::Executed),
            (schedule_id, pulled, count),
        );
        if exhausted {
            env.events().publish(
                (symbol_short!("schedule"), ScheduleEvent::Exhausted),
                schedule_id,
            );
        }

        Ok(distribution)
    }

    /// Stop a schedule for good. Cancelling a schedule that is already
    /// cancelled or exhausted succeeds without changing it.
    pub fn cancel_schedule(env: Env, caller: Address, schedule_id: u32) -> Result<(), Error> {
        caller.require_auth();

        let mut schedules = Self::load_schedules(&env);
        let mut schedule = schedules.get(schedule_id).ok_or(Error::NotFound)?;

        if schedule.owner != caller {
            return Err(Error::NotOwner);
        }
        if !schedule.active {
            return Ok(());
        }

        Self::extend_instance_ttl(&env);
        schedule.active = false;
        schedule.status = ScheduleStatus::Cancelled;

        schedules.set(schedule_id, schedule);
        env.storage()
            .instance()
            .set(&symbol_short!("SCHEDS"), &schedules);

        env.events().publish(
            (symbol_short!("schedule"), ScheduleEvent::Cancelled),
            (schedule_id, caller),
        );

        Ok(())
    }

    pub fn get_schedule(env: Env, schedule_id: u32) -> Result<Schedule, Error> {
        Self::load_schedules(&env)
            .get(schedule_id)
            .ok_or(Error::NotFound)
    }

    pub fn get_owner_schedules(env: Env, owner: Address) -> Vec<Schedule> {
        let mut result = Vec::new(&env);
        for (_, schedule) in Self::load_schedules(&env).iter() {
            if schedule.owner == owner {
                result.push_back(schedule);
            }
        }
        result
    }

    // -----------------------------------------------------------------------
    // Keeper automation
    // -----------------------------------------------------------------------

    /// Register `keeper_execute` with the keeper network. Admin only, once.
    ///
    /// # Errors
    /// * `TaskAlreadyCreated` - A task is already registered
    /// * `InvalidAmount` - Negative fee
    /// * `FeeBalanceOutstanding` - Fee pot still holds a different token
    pub fn create_task(
        env: Env,
        caller: Address,
        keeper: Address,
        fee_token: Address,
        fee_per_execution: i128,
    ) -> Result<u64, Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        if env.storage().instance().has(&symbol_short!("TASK")) {
            return Err(Error::TaskAlreadyCreated);
        }
        if fee_per_execution < 0 {
            return Err(Error::InvalidAmount);
        }
        let previous_token: Option<Address> =
            env.storage().instance().get(&symbol_short!("FEE_TOK"));
        if let Some(previous) = previous_token {
            if previous != fee_token && Self::fee_balance(env.clone()) > 0 {
                return Err(Error::FeeBalanceOutstanding);
            }
        }

        Self::extend_instance_ttl(&env);
        let task_id = KeeperRegistryClient::new(&env, &keeper).register_task(
            &env.current_contract_address(),
            &Symbol::new(&env, "keeper_execute"),
        );

        let task = AutomationTask {
            task_id,
            keeper: keeper.clone(),
            fee_token: fee_token.clone(),
            fee_per_execution,
            created_at: env.ledger().timestamp(),
        };
        env.storage().instance().set(&symbol_short!("TASK"), &task);
        env.storage()
            .instance()
            .set(&symbol_short!("FEE_TOK"), &fee_token);

        env.events().publish(
            (symbol_short!("automate"), AutomationEvent::TaskCreated),
            (task_id, keeper),
        );

        Ok(task_id)
    }

    /// Cancel the keeper task. The fee pot stays withdrawable.
    pub fn cancel_task(env: Env, caller: Address) -> Result<(), Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        let task = Self::load_task(&env)?;
        KeeperRegistryClient::new(&env, &task.keeper).cancel_task(&task.task_id);

        Self::extend_instance_ttl(&env);
        env.storage().instance().remove(&symbol_short!("TASK"));

        env.events().publish(
            (symbol_short!("automate"), AutomationEvent::TaskCancelled),
            task.task_id,
        );

        Ok(())
    }

    pub fn get_task(env: Env) -> Option<AutomationTask> {
        env.storage().instance().get(&symbol_short!("TASK"))
    }

    /// Top up the keeper fee pot with the task's fee token.
    pub fn fund_task(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        from.require_auth();
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let task = Self::load_task(&env)?;
        TokenClient::new(&env, &task.fee_token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        Self::extend_instance_ttl(&env);
        let balance = Self::fee_balance(env.clone()) + amount;
        env.storage()
            .instance()
            .set(&symbol_short!("FEE_BAL"), &balance);

        env.events().publish(
            (symbol_short!("automate"), AutomationEvent::FeesFunded),
            (from, amount),
        );

        Ok(())
    }

    pub fn fee_balance(env: Env) -> i128 {
        env.storage()
            .instance()
            .get(&symbol_short!("FEE_BAL"))
            .unwrap_or(0)
    }

    /// Withdraw unused keeper fees. Admin only.
    pub fn withdraw_fees(
        env: Env,
        caller: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let fee_token: Address = env
            .storage()
            .instance()
            .get(&symbol_short!("FEE_TOK"))
            .ok_or(Error::TaskNotFound)?;
        let balance = Self::fee_balance(env.clone());
        if balance < amount {
            return Err(Error::InsufficientFeeBalance);
        }

        Self::extend_instance_ttl(&env);
        env.storage()
            .instance()
            .set(&symbol_short!("FEE_BAL"), &(balance - amount));
        TokenClient::new(&env, &fee_token).transfer(
            &env.current_contract_address(),
            &to,
            &amount,
        );

        env.events().publish(
            (symbol_short!("automate"), AutomationEvent::FeesWithdrawn),
            (to, amount),
        );

        Ok(())
    }

    /// Entry point registered with the keeper network: runs `execute` and
    /// pays the keeper its fee from the pot.
    ///
    /// # Errors
    /// * `TaskNotFound` - No task registered
    /// * `NotKeeper` - Caller is not the registered keeper
    /// * `InsufficientFeeBalance` - Pot cannot cover the fee
    /// * any error of `execute`
    pub fn keeper_execute(
        env: Env,
        keeper: Address,
        schedule_id: u32,
    ) -> Result<Distribution, Error> {
        keeper.require_auth();

        let task = Self::load_task(&env)?;
        if task.keeper != keeper {
            return Err(Error::NotKeeper);
        }
        let balance = Self::fee_balance(env.clone());
        if balance < task.fee_per_execution {
            return Err(Error::InsufficientFeeBalance);
        }

        let distribution = Self::execute(env.clone(), schedule_id)?;

        if task.fee_per_execution > 0 {
            env.storage().instance().set(
                &symbol_short!("FEE_BAL"),
                &(balance - task.fee_per_execution),
            );
            TokenClient::new(&env, &task.fee_token).transfer(
                &env.current_contract_address(),
                &keeper,
                &task.fee_per_execution,
            );
            env.events().publish(
                (symbol_short!("automate"), AutomationEvent::KeeperPaid),
                (keeper, schedule_id, task.fee_per_execution),
            );
        }

        Ok(distribution)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    fn evaluate(env: &Env, schedule: &Schedule) -> Result<Readiness, Error> {
        if schedule.status == ScheduleStatus::Exhausted
            || (schedule.max_executions != 0
                && schedule.execution_count >= schedule.max_executions)
        {
            return Ok(Readiness::Exhausted);
        }
        if !schedule.active {
            return Ok(Readiness::Inactive);
        }
        if env.ledger().timestamp() < schedule.next_execution {
            return Ok(Readiness::NotDue);
        }

        let config = match Self::fetch_config(env, schedule.config_id)? {
            Some(config) => config,
            None => return Ok(Readiness::ConfigMissing),
        };
        if !config.active {
            return Ok(Readiness::ConfigDeleted);
        }

        let distribution = allocate(env, schedule.amount_per_execution, &config.recipients);
        let required = distribution.distributed();

        let token = TokenClient::new(env, &schedule.asset);
        let balance = match token.try_balance(&schedule.owner) {
            Ok(Ok(balance)) => balance,
            _ => return Ok(Readiness::BadAsset),
        };
        if balance < required {
            return Ok(Readiness::NoBalance);
        }
        let allowance =
            match token.try_allowance(&schedule.owner, &env.current_contract_address()) {
                Ok(Ok(allowance)) => allowance,
                _ => return Ok(Readiness::BadAsset),
            };
        if allowance < required {
            return Ok(Readiness::NoAllowance);
        }

        Ok(Readiness::Ready(distribution))
    }

    fn fetch_config(env: &Env, config_id: u32) -> Result<Option<ShareConfig>, Error> {
        let registry: Address = env
            .storage()
            .instance()
            .get(&symbol_short!("REGISTRY"))
            .ok_or(Error::NotInitialized)?;

        match RegistryClient::new(env, &registry).try_get_config(&config_id) {
            Ok(Ok(config)) => Ok(Some(config)),
            Err(Ok(RegistryError::NotFound)) => Ok(None),
            _ => Err(Error::RegistryUnavailable),
        }
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&symbol_short!("ADMIN"))
            .ok_or(Error::NotInitialized)?;
        if admin != *caller {
            return Err(Error::Unauthorized);
        }
        Ok(())
    }

    fn load_task(env: &Env) -> Result<AutomationTask, Error> {
        env.storage()
            .instance()
            .get(&symbol_short!("TASK"))
            .ok_or(Error::TaskNotFound)
    }

    fn load_schedules(env: &Env) -> Map<u32, Schedule> {
        env.storage()
            .instance()
            .get(&symbol_short!("SCHEDS"))
            .unwrap_or_else(|| Map::new(env))
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

    fn clamp_limit(limit: u32) -> u32 {
        if limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else if limit > MAX_PAGE_LIMIT {
            MAX_PAGE_LIMIT
        } else {
            limit
        }
    }

    /// Extend the TTL of instance storage
    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }
}
