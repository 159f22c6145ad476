//! Request model and builder.
//!
//! A `RequestInput` is what the UI collects from the user. The builder
//! resolves the token, converts the amount to base units, validates the
//! recipient set and lays out the call arguments for the EVM distributor
//! deployed on the destination chain (see `[[deployments]]` in the
//! builder config). That ABI takes camelCase function names and parallel
//! address/share/strategy arrays; it is not the ABI of the Soroban
//! `fund_distributor` contract, which takes a `Vec<ShareRecipient>`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RequestError, Result};
use crate::registry::{check_address, BuilderConfig, TokenRegistry};
use crate::units::parse_units;
use crate::{BPS_DENOMINATOR, MAX_RECIPIENTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    Distribute,
    Forward,
    Supply,
    SplitSupply,
    SplitDeposit,
}

impl OperationKind {
    /// EVM distributor function invoked after bridging
    pub fn function_name(&self) -> &'static str {
        match self {
            OperationKind::Distribute => "distribute",
            OperationKind::Forward => "forward",
            OperationKind::Supply => "supply",
            OperationKind::SplitSupply => "splitSupply",
            OperationKind::SplitDeposit => "splitDeposit",
        }
    }
}

/// Payout route of a recipient. Codes match the on-chain enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    #[default]
    DirectTransfer,
    LendingSupply,
    VaultDeposit,
}

impl Strategy {
    pub fn code(&self) -> u32 {
        match self {
            Strategy::DirectTransfer => 0,
            Strategy::LendingSupply => 1,
            Strategy::VaultDeposit => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientInput {
    pub address: String,
    pub share_bps: u32,
    #[serde(default)]
    pub strategy: Strategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operation {
    Distribute {
        recipients: Vec<RecipientInput>,
    },
    Forward {
        recipient: String,
    },
    /// Supply on behalf of `on_behalf_of`, or of the user when absent.
    Supply {
        #[serde(default, rename = "onBehalfOf")]
        on_behalf_of: Option<String>,
    },
    SplitSupply {
        recipients: Vec<RecipientInput>,
    },
    SplitDeposit {
        recipients: Vec<RecipientInput>,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Distribute { .. } => OperationKind::Distribute,
            Operation::Forward { .. } => OperationKind::Forward,
            Operation::Supply { .. } => OperationKind::Supply,
            Operation::SplitSupply { .. } => OperationKind::SplitSupply,
            Operation::SplitDeposit { .. } => OperationKind::SplitDeposit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestInput {
    pub token_symbol: String,
    /// Human-readable amount, e.g. `"12.5"`
    pub amount: String,
    pub chain_id: u64,
    pub user: String,
    pub operation: Operation,
}

/// One positional argument of the destination call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum CallArg {
    Address(String),
    Uint(#[serde(with = "decimal_string")] u128),
    AddressList(Vec<String>),
    UintList(Vec<u32>),
}

/// Fully resolved bridge-and-call request handed to the bridging SDK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeCallRequest {
    pub operation: OperationKind,
    pub chain_id: u64,
    pub token_symbol: String,
    pub token_address: String,
    pub decimals: u8,
    /// Base units
    #[serde(with = "decimal_string")]
    pub amount: u128,
    pub target_contract: String,
    pub function_name: String,
    pub args: Vec<CallArg>,
}

impl BridgeCallRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub struct RequestBuilder {
    registry: TokenRegistry,
}

impl RequestBuilder {
    pub fn new(registry: TokenRegistry) -> Self {
        Self { registry }
    }

    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        Ok(Self::new(TokenRegistry::from_config(config)?))
    }

    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Resolve and validate `input` into a request.
    pub fn build(&self, input: &RequestInput) -> Result<BridgeCallRequest> {
        check_address(&input.user)?;

        let token = self.registry.token(&input.token_symbol, input.chain_id)?;
        let amount = parse_units(&input.amount, token.decimals)?;
        if amount == 0 {
            return Err(RequestError::ZeroAmount);
        }
        let target = self.registry.distributor(input.chain_id)?;

        let token_arg = CallArg::Address(token.address.clone());
        let amount_arg = CallArg::Uint(amount);
        let mut args = Vec::new();

        match &input.operation {
            Operation::Distribute { recipients } => {
                let (addresses, shares, strategies) = split_recipients(recipients)?;
                args.extend([
                    token_arg,
                    amount_arg,
                    CallArg::AddressList(addresses),
                    CallArg::UintList(shares),
                    CallArg::UintList(strategies),
                ]);
            }
            Operation::Forward { recipient } => {
                check_address(recipient)?;
                args.extend([token_arg, CallArg::Address(recipient.clone()), amount_arg]);
            }
            Operation::Supply { on_behalf_of } => {
                let beneficiary = on_behalf_of.as_deref().unwrap_or(&input.user);
                check_address(beneficiary)?;
                args.extend([token_arg, amount_arg, CallArg::Address(beneficiary.to_string())]);
            }
            Operation::SplitSupply { recipients } | Operation::SplitDeposit { recipients } => {
                let (addresses, shares, _) = split_recipients(recipients)?;
                args.extend([
                    token_arg,
                    amount_arg,
                    CallArg::AddressList(addresses),
                    CallArg::UintList(shares),
                ]);
            }
        }

        let operation = input.operation.kind();
        debug!(
            operation = operation.function_name(),
            chain_id = input.chain_id,
            token = %token.symbol,
            amount = %amount,
            "built bridge call request"
        );

        Ok(BridgeCallRequest {
            operation,
            chain_id: input.chain_id,
            token_symbol: token.symbol.clone(),
            token_address: token.address.clone(),
            decimals: token.decimals,
            amount,
            target_contract: target.to_string(),
            function_name: operation.function_name().to_string(),
            args,
        })
    }
}

// Validate a recipient set and split it into parallel address/share/strategy lists.
fn split_recipients(recipients: &[RecipientInput]) -> Result<(Vec<String>, Vec<u32>, Vec<u32>)> {
    if recipients.is_empty() {
        return Err(RequestError::EmptyRecipients);
    }
    if recipients.len() > MAX_RECIPIENTS {
        return Err(RequestError::TooManyRecipients {
            count: recipients.len(),
            max: MAX_RECIPIENTS,
        });
    }

    let mut total = 0u32;
    for (index, recipient) in recipients.iter().enumerate() {
        check_address(&recipient.address)?;
        if recipient.share_bps > BPS_DENOMINATOR {
            return Err(RequestError::InvalidShare {
                index,
                share_bps: recipient.share_bps,
            });
        }
        total += recipient.share_bps;
    }
    if total > BPS_DENOMINATOR {
        return Err(RequestError::InvalidShareTotal(total));
    }

    Ok((
        recipients.iter().map(|r| r.address.clone()).collect(),
        recipients.iter().map(|r| r.share_bps).collect(),
        recipients.iter().map(|r| r.strategy.code()).collect(),
    ))
}

mod decimal_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}
