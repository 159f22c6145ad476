#![no_std]
use shares::{
    allocate, validate_recipients, Distribution, ShareConfig, ShareError, ShareRecipient,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, Address, Env, Map, String,
    Vec,
};

// Storage TTL constants for active data
const INSTANCE_LIFETIME_THRESHOLD: u32 = 17280; // ~1 day
const INSTANCE_BUMP_AMOUNT: u32 = 518400; // ~30 days

pub const MAX_NAME_LEN: u32 = 64;
pub const MAX_DESCRIPTION_LEN: u32 = 256;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    NotFound = 1,
    NotOwner = 2,
    InvalidName = 3,
    InvalidDescription = 4,
    EmptyRecipients = 5,
    TooManyRecipients = 6,
    InvalidShare = 7,
    InvalidShareTotal = 8,
    ConfigDeleted = 9,
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

/// Events emitted by the contract for audit trail
#[contracttype]
#[derive(Clone)]
pub enum RegistryEvent {
    Saved,
    Updated,
    Deleted,
}

#[contract]
pub struct ShareRegistry;

#[contractimpl]
impl ShareRegistry {
    /// Store a new named recipient set.
    ///
    /// # Arguments
    /// * `owner` - Address of the config owner (must authorize)
    /// * `name` - Display name, 1 to 64 bytes
    /// * `description` - Free text, up to 256 bytes
    /// * `recipients` - Ordered recipient list, shares summing to at most 10000 bps
    /// * `is_public` - Whether other accounts may list and reference the config
    ///
    /// # Returns
    /// The ID of the created config
    ///
    /// # Errors
    /// * `InvalidName` / `InvalidDescription` - If the text fields are out of bounds
    /// * `EmptyRecipients`, `TooManyRecipients`, `InvalidShare`, `InvalidShareTotal`
    pub fn save_config(
        env: Env,
        owner: Address,
        name: String,
        description: String,
        recipients: Vec<ShareRecipient>,
        is_public: bool,
    ) -> Result<u32, Error> {
        owner.require_auth();
        Self::validate_text(&name, &description)?;
        validate_recipients(&recipients)?;

        Self::extend_instance_ttl(&env);
        let mut configs = Self::load_configs(&env);

        let next_id = env
            .storage()
            .instance()
            .get(&symbol_short!("NEXT_ID"))
            .unwrap_or(0u32)
            + 1;

        let now = env.ledger().timestamp();
        let config = ShareConfig {
            id: next_id,
            owner: owner.clone(),
            name,
            description,
            recipients,
            is_public,
            active: true,
            created_at: now,
            updated_at: now,
        };

        configs.set(next_id, config);
        env.storage()
            .instance()
            .set(&symbol_short!("CONFIGS"), &configs);
        env.storage()
            .instance()
            .set(&symbol_short!("NEXT_ID"), &next_id);

        let mut by_owner = Self::load_owner_index(&env);
        let mut owned = by_owner.get(owner.clone()).unwrap_or_else(|| Vec::new(&env));
        owned.push_back(next_id);
        by_owner.set(owner.clone(), owned);
        env.storage()
            .instance()
            .set(&symbol_short!("USR_CFG"), &by_owner);

        if is_public {
            let mut public = Self::load_public_index(&env);
            public.push_back(next_id);
            env.storage()
                .instance()
                .set(&symbol_short!("PUB_CFG"), &public);
        }

        env.events().publish(
            (symbol_short!("registry"), RegistryEvent::Saved),
            (next_id, owner),
        );

        Ok(next_id)
    }

    /// Replace name, description and the whole recipient list of a config.
    ///
    /// # Errors
    /// * `NotFound` - Unknown config
    /// * `NotOwner` - Caller does not own the config
    /// * `ConfigDeleted` - Config was deleted
    /// * any validation error of `save_config`
    pub fn update_config(
        env: Env,
        caller: Address,
        config_id: u32,
        name: String,
        description: String,
        recipients: Vec<ShareRecipient>,
    ) -> Result<(), Error> {
        caller.require_auth();

        Self::extend_instance_ttl(&env);
        let mut configs = Self::load_configs(&env);
        let mut config = configs.get(config_id).ok_or(Error::NotFound)?;

        if config.owner != caller {
            return Err(Error::NotOwner);
        }
        if !config.active {
            return Err(Error::ConfigDeleted);
        }

        Self::validate_text(&name, &description)?;
        validate_recipients(&recipients)?;

        config.name = name;
        config.description = description;
        config.recipients = recipients;
        config.updated_at = env.ledger().timestamp();

        configs.set(config_id, config);
        env.storage()
            .instance()
            .set(&symbol_short!("CONFIGS"), &configs);

        env.events().publish(
            (symbol_short!("registry"), RegistryEvent::Updated),
            (config_id, caller),
        );

        Ok(())
    }

    /// Get a config by ID. Deleted configs are returned with `active == false`.
    pub fn get_config(env: Env, config_id: u32) -> Result<ShareConfig, Error> {
        Self::load_configs(&env)
            .get(config_id)
            .ok_or(Error::NotFound)
    }

    /// Get one recipient of a config by position.
    pub fn get_recipient(env: Env, config_id: u32, index: u32) -> Result<ShareRecipient, Error> {
        let config = Self::get_config(env, config_id)?;
        config.recipients.get(index).ok_or(Error::NotFound)
    }

    pub fn get_recipient_count(env: Env, config_id: u32) -> Result<u32, Error> {
        Ok(Self::get_config(env, config_id)?.recipients.len())
    }

    /// Live config IDs owned by `owner`, in creation order.
    pub fn get_user_config_ids(env: Env, owner: Address) -> Vec<u32> {
        Self::load_owner_index(&env)
            .get(owner)
            .unwrap_or_else(|| Vec::new(&env))
    }

    /// Live public config IDs, in creation order.
    pub fn get_public_config_ids(env: Env) -> Vec<u32> {
        Self::load_public_index(&env)
    }

    /// Number of config IDs ever issued, deleted ones included.
    pub fn config_count(env: Env) -> u32 {
        env.storage()
            .instance()
            .get(&symbol_short!("NEXT_ID"))
            .unwrap_or(0u32)
    }

    /// Soft-delete a config.
    ///
    /// The ID is never reused. Schedules that still reference the config are
    /// left in place and stop executing.
    ///
    /// # Errors
    /// * `NotFound` - Unknown config
    /// * `NotOwner` - Caller does not own the config
    /// * `ConfigDeleted` - Config was already deleted
    pub fn delete_config(env: Env, caller: Address, config_id: u32) -> Result<(), Error> {
        caller.require_auth();

        Self::extend_instance_ttl(&env);
        let mut configs = Self::load_configs(&env);
        let mut config = configs.get(config_id).ok_or(Error::NotFound)?;

        if config.owner != caller {
            return Err(Error::NotOwner);
        }
        if !config.active {
            return Err(Error::ConfigDeleted);
        }

        config.active = false;
        config.updated_at = env.ledger().timestamp();
        let was_public = config.is_public;
        configs.set(config_id, config);
        env.storage()
            .instance()
            .set(&symbol_short!("CONFIGS"), &configs);

        let mut by_owner = Self::load_owner_index(&env);
        if let Some(owned) = by_owner.get(caller.clone()) {
            by_owner.set(caller.clone(), Self::without(&env, &owned, config_id));
            env.storage()
                .instance()
                .set(&symbol_short!("USR_CFG"), &by_owner);
        }

        if was_public {
            let public = Self::load_public_index(&env);
            env.storage().instance().set(
                &symbol_short!("PUB_CFG"),
                &Self::without(&env, &public, config_id),
            );
        }

        env.events().publish(
            (symbol_short!("registry"), RegistryEvent::Deleted),
            (config_id, caller),
        );

        Ok(())
    }

    /// Compute how `total_amount` would be split by a config, without moving funds.
    pub fn preview_allocation(
        env: Env,
        config_id: u32,
        total_amount: i128,
    ) -> Result<Distribution, Error> {
        let config = Self::get_config(env.clone(), config_id)?;
        Ok(allocate(&env, total_amount, &config.recipients))
    }

    fn validate_text(name: &String, description: &String) -> Result<(), Error> {
        if name.len() == 0 || name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidName);
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(Error::InvalidDescription);
        }
        Ok(())
    }

    fn without(env: &Env, ids: &Vec<u32>, config_id: u32) -> Vec<u32> {
        let mut result = Vec::new(env);
        for id in ids.iter() {
            if id != config_id {
                result.push_back(id);
            }
        }
        result
    }

    fn load_configs(env: &Env) -> Map<u32, ShareConfig> {
        env.storage()
            .instance()
            .get(&symbol_short!("CONFIGS"))
            .unwrap_or_else(|| Map::new(env))
    }

    fn load_owner_index(env: &Env) -> Map<Address, Vec<u32>> {
        env.storage()
            .instance()
            .get(&symbol_short!("USR_CFG"))
            .unwrap_or_else(|| Map::new(env))
    }

    fn load_public_index(env: &Env) -> Vec<u32> {
        env.storage()
            .instance()
            .get(&symbol_short!("PUB_CFG"))
            .unwrap_or_else(|| Vec::new(env))
    }

    /// Extend the TTL of instance storage
    fn extend_instance_ttl(env: &Env) {
        env.storage()
            .instance()
            .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
    }
}
