use super::*;
use shares::testutils::{
    MockLendingPool, MockLendingPoolClient, MockVault, MockVaultClient, RevertingVault,
};
use soroban_sdk::{
    testutils::{Address as _, Events},
    token::{StellarAssetClient, TokenClient},
    vec, Env,
};

struct Setup<'a> {
    env: Env,
    client: FundDistributorClient<'a>,
    token: TokenClient<'a>,
    payer: Address,
}

fn setup<'a>() -> Setup<'a> {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register_contract(None, FundDistributor);
    let client = FundDistributorClient::new(&env, &contract_id);

    let token_admin = Address::generate(&env);
    let token_contract = env.register_stellar_asset_contract_v2(token_admin);
    let token = TokenClient::new(&env, &token_contract.address());

    let payer = Address::generate(&env);
    StellarAssetClient::new(&env, &token_contract.address()).mint(&payer, &10_000);

    Setup {
        env,
        client,
        token,
        payer,
    }
}

fn recipient(env: &Env, share_bps: u32, strategy: Strategy) -> ShareRecipient {
    ShareRecipient {
        wallet: Address::generate(env),
        share_bps,
        strategy,
    }
}

fn with_lending_pool(s: &Setup) -> MockLendingPoolClient<'static> {
    let pool_id = s.env.register_contract(None, MockLendingPool);
    let admin = Address::generate(&s.env);
    s.client.init(&admin, &Some(pool_id.clone()), &None);
    MockLendingPoolClient::new(&s.env, &pool_id)
}

fn with_vault(s: &Setup) -> MockVaultClient<'static> {
    let vault_id = s.env.register_contract(None, MockVault);
    let vault = MockVaultClient::new(&s.env, &vault_id);
    vault.init(&s.token.address);
    let admin = Address::generate(&s.env);
    s.client.init(&admin, &None, &Some(vault_id));
    vault
}

#[test]
fn test_init_twice_fails() {
    let s = setup();
    let admin = Address::generate(&s.env);
    s.client.init(&admin, &None, &None);

    let result = s.client.try_init(&admin, &None, &None);
    assert_eq!(result, Err(Ok(Error::AlreadyInitialized)));
}

#[test]
fn test_set_strategies_admin_only() {
    let s = setup();
    let admin = Address::generate(&s.env);
    let other = Address::generate(&s.env);
    let pool = Address::generate(&s.env);

    assert_eq!(
        s.client.try_set_strategies(&admin, &Some(pool.clone()), &None),
        Err(Ok(Error::NotInitialized))
    );

    s.client.init(&admin, &None, &None);
    assert_eq!(
        s.client.try_set_strategies(&other, &Some(pool.clone()), &None),
        Err(Ok(Error::Unauthorized))
    );

    s.client.set_strategies(&admin, &Some(pool.clone()), &None);
    let targets = s.client.get_strategies();
    assert_eq!(targets.lending_pool, Some(pool));
    assert_eq!(targets.vault, None);
}

#[test]
fn test_calculate_allocations() {
    let s = setup();
    let recipients = vec![
        &s.env,
        recipient(&s.env, 5000, Strategy::DirectTransfer),
        recipient(&s.env, 3000, Strategy::DirectTransfer),
        recipient(&s.env, 2000, Strategy::DirectTransfer),
    ];

    let distribution = s.client.calculate_allocations(&1001, &recipients);
    assert_eq!(distribution.allocations.get(0).unwrap().amount, 500);
    assert_eq!(distribution.allocations.get(1).unwrap().amount, 300);
    assert_eq!(distribution.allocations.get(2).unwrap().amount, 201);
    assert_eq!(distribution.retained, 0);
}

#[test]
fn test_calculate_allocations_rejects_invalid_shares() {
    let s = setup();
    let recipients = vec![
        &s.env,
        recipient(&s.env, 8000, Strategy::DirectTransfer),
        recipient(&s.env, 3000, Strategy::DirectTransfer),
    ];

    assert_eq!(
        s.client.try_calculate_allocations(&100, &recipients),
        Err(Ok(Error::InvalidShareTotal))
    );
}

#[test]
fn test_distribute_direct_transfers() {
    let s = setup();
    let alice = recipient(&s.env, 6667, Strategy::DirectTransfer);
    let bob = recipient(&s.env, 3333, Strategy::DirectTransfer);
    let recipients = vec![&s.env, alice.clone(), bob.clone()];

    let distribution = s
        .client
        .distribute(&s.payer, &s.token.address, &100, &recipients);

    assert_eq!(distribution.retained, 0);
    assert_eq!(s.token.balance(&alice.wallet), 66);
    assert_eq!(s.token.balance(&bob.wallet), 34);
    assert_eq!(s.token.balance(&s.payer), 9_900);
    assert_eq!(s.token.balance(&s.client.address), 0);
}

#[test]
fn test_distribute_partial_shares_keeps_remainder_with_payer() {
    let s = setup();
    let alice = recipient(&s.env, 2500, Strategy::DirectTransfer);
    let bob = recipient(&s.env, 2500, Strategy::DirectTransfer);
    let recipients = vec![&s.env, alice.clone(), bob.clone()];

    let distribution = s
        .client
        .distribute(&s.payer, &s.token.address, &1000, &recipients);

    assert_eq!(distribution.retained, 500);
    assert_eq!(s.token.balance(&alice.wallet), 250);
    assert_eq!(s.token.balance(&bob.wallet), 250);
    assert_eq!(s.token.balance(&s.payer), 9_500);
}

#[test]
fn test_distribute_invalid_amount() {
    let s = setup();
    let recipients = vec![&s.env, recipient(&s.env, 10_000, Strategy::DirectTransfer)];

    assert_eq!(
        s.client
            .try_distribute(&s.payer, &s.token.address, &0, &recipients),
        Err(Ok(Error::InvalidAmount))
    );
    assert_eq!(
        s.client
            .try_distribute(&s.payer, &s.token.address, &-5, &recipients),
        Err(Ok(Error::InvalidAmount))
    );
}

#[test]
fn test_distribute_empty_recipients() {
    let s = setup();
    let recipients: Vec<ShareRecipient> = Vec::new(&s.env);

    assert_eq!(
        s.client
            .try_distribute(&s.payer, &s.token.address, &100, &recipients),
        Err(Ok(Error::EmptyRecipients))
    );
}

#[test]
fn test_distribute_missing_strategy_moves_nothing() {
    let s = setup();
    let direct = recipient(&s.env, 5000, Strategy::DirectTransfer);
    let recipients = vec![
        &s.env,
        direct.clone(),
        recipient(&s.env, 5000, Strategy::VaultDeposit),
    ];

    let result = s
        .client
        .try_distribute(&s.payer, &s.token.address, &100, &recipients);

    assert_eq!(result, Err(Ok(Error::StrategyNotConfigured)));
    assert_eq!(s.token.balance(&direct.wallet), 0);
    assert_eq!(s.token.balance(&s.payer), 10_000);
}

#[test]
fn test_distribute_mixed_strategies() {
    let s = setup();
    let pool_id = s.env.register_contract(None, MockLendingPool);
    let pool = MockLendingPoolClient::new(&s.env, &pool_id);
    let vault_id = s.env.register_contract(None, MockVault);
    let vault = MockVaultClient::new(&s.env, &vault_id);
    vault.init(&s.token.address);
    let admin = Address::generate(&s.env);
    s.client
        .init(&admin, &Some(pool_id.clone()), &Some(vault_id.clone()));

    let direct = recipient(&s.env, 5000, Strategy::DirectTransfer);
    let lender = recipient(&s.env, 3000, Strategy::LendingSupply);
    let saver = recipient(&s.env, 2000, Strategy::VaultDeposit);
    let recipients = vec![&s.env, direct.clone(), lender.clone(), saver.clone()];

    s.client
        .distribute(&s.payer, &s.token.address, &1000, &recipients);

    assert_eq!(s.token.balance(&direct.wallet), 500);
    assert_eq!(pool.supplied(&lender.wallet), 300);
    assert_eq!(s.token.balance(&pool_id), 300);
    assert_eq!(pool.last_referral(), Some(shares::REFERRAL_CODE));
    assert_eq!(vault.shares_of(&saver.wallet), 200);
    assert_eq!(s.token.balance(&vault_id), 200);
    assert_eq!(s.token.balance(&s.client.address), 0);
}

#[test]
fn test_distribute_emits_allocation_events() {
    let s = setup();
    let recipients = vec![
        &s.env,
        recipient(&s.env, 5000, Strategy::DirectTransfer),
        recipient(&s.env, 5000, Strategy::DirectTransfer),
    ];

    s.client
        .distribute(&s.payer, &s.token.address, &100, &recipients);

    let own_events = s
        .env
        .events()
        .all()
        .iter()
        .filter(|(contract, _, _)| *contract == s.client.address)
        .count();
    // one per allocation plus the summary event
    assert_eq!(own_events, 3);
}

#[test]
fn test_zero_share_recipient_still_gets_allocation_event() {
    let s = setup();
    let first = recipient(&s.env, 5000, Strategy::DirectTransfer);
    // No lending pool configured: a zero allocation never needs its target
    let idle = recipient(&s.env, 0, Strategy::LendingSupply);
    let last = recipient(&s.env, 5000, Strategy::DirectTransfer);
    let recipients = vec![&s.env, first.clone(), idle.clone(), last.clone()];

    let distribution = s
        .client
        .distribute(&s.payer, &s.token.address, &100, &recipients);

    assert_eq!(distribution.allocations.get(1).unwrap().amount, 0);
    assert_eq!(s.token.balance(&first.wallet), 50);
    assert_eq!(s.token.balance(&idle.wallet), 0);
    assert_eq!(s.token.balance(&last.wallet), 50);

    let own_events = s
        .env
        .events()
        .all()
        .iter()
        .filter(|(contract, _, _)| *contract == s.client.address)
        .count();
    // three allocation events plus the summary event
    assert_eq!(own_events, 4);
}

#[test]
fn test_split_supply_routes_everyone_to_pool() {
    let s = setup();
    let pool = with_lending_pool(&s);
    let alice = recipient(&s.env, 7000, Strategy::DirectTransfer);
    let bob = recipient(&s.env, 3000, Strategy::VaultDeposit);
    let recipients = vec![&s.env, alice.clone(), bob.clone()];

    let distribution = s
        .client
        .split_supply(&s.payer, &s.token.address, &1000, &recipients);

    for allocation in distribution.allocations.iter() {
        assert_eq!(allocation.strategy, Strategy::LendingSupply);
    }
    assert_eq!(pool.supplied(&alice.wallet), 700);
    assert_eq!(pool.supplied(&bob.wallet), 300);
    assert_eq!(s.token.balance(&alice.wallet), 0);
}

#[test]
fn test_split_deposit_routes_everyone_to_vault() {
    let s = setup();
    let vault = with_vault(&s);
    let alice = recipient(&s.env, 5000, Strategy::DirectTransfer);
    let bob = recipient(&s.env, 5000, Strategy::LendingSupply);
    let recipients = vec![&s.env, alice.clone(), bob.clone()];

    s.client
        .split_deposit(&s.payer, &s.token.address, &401, &recipients);

    assert_eq!(vault.shares_of(&alice.wallet), 200);
    assert_eq!(vault.shares_of(&bob.wallet), 201);
    assert_eq!(s.token.balance(&s.payer), 10_000 - 401);
}

#[test]
fn test_reverting_vault_rolls_back_everything() {
    let s = setup();
    let vault_id = s.env.register_contract(None, RevertingVault);
    let admin = Address::generate(&s.env);
    s.client.init(&admin, &None, &Some(vault_id));

    let direct = recipient(&s.env, 5000, Strategy::DirectTransfer);
    let recipients = vec![
        &s.env,
        direct.clone(),
        recipient(&s.env, 5000, Strategy::VaultDeposit),
    ];

    let result = s
        .client
        .try_distribute(&s.payer, &s.token.address, &100, &recipients);

    assert!(result.is_err());
    assert_eq!(s.token.balance(&direct.wallet), 0);
    assert_eq!(s.token.balance(&s.payer), 10_000);
    assert_eq!(s.token.balance(&s.client.address), 0);
}

#[test]
fn test_forward() {
    let s = setup();
    let recipient = Address::generate(&s.env);

    s.client
        .forward(&s.payer, &s.token.address, &recipient, &250);

    assert_eq!(s.token.balance(&recipient), 250);
    assert_eq!(s.token.balance(&s.payer), 9_750);
    assert_eq!(
        s.client
            .try_forward(&s.payer, &s.token.address, &recipient, &0),
        Err(Ok(Error::InvalidAmount))
    );
}

#[test]
fn test_supply_on_behalf_of() {
    let s = setup();
    let pool = with_lending_pool(&s);
    let beneficiary = Address::generate(&s.env);

    s.client
        .supply(&s.payer, &s.token.address, &400, &beneficiary);

    assert_eq!(pool.supplied(&beneficiary), 400);
    assert_eq!(s.token.balance(&s.payer), 9_600);
}

#[test]
fn test_supply_without_pool() {
    let s = setup();
    let beneficiary = Address::generate(&s.env);

    assert_eq!(
        s.client
            .try_supply(&s.payer, &s.token.address, &400, &beneficiary),
        Err(Ok(Error::StrategyNotConfigured))
    );
}
