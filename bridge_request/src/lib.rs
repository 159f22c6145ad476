//! Builds bridge-and-call requests for the split distributor deployed on
//! EVM destination chains.
//!
//! The UI collects a token symbol, a human amount, a destination chain and
//! the user's address; this crate turns that into a fully resolved
//! [`BridgeCallRequest`] (token address, base-unit amount, target contract,
//! function name and ordered arguments) that the bridging SDK can execute.
//! Addresses are `0x` hex and the arguments follow the EVM distributor's
//! ABI. The Soroban contracts in this workspace share the split semantics
//! but not that calling convention. Nothing here talks to a network.

pub mod error;
pub mod registry;
pub mod request;
pub mod units;

pub use error::{RequestError, Result};
pub use registry::{check_address, BuilderConfig, Deployment, TokenInfo, TokenRegistry};
pub use request::{
    BridgeCallRequest, CallArg, Operation, OperationKind, RecipientInput, RequestBuilder,
    RequestInput, Strategy,
};
pub use units::{format_units, parse_units};

/// 10000 basis points = 100%.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Upper bound on a single recipient set, matching the contracts.
pub const MAX_RECIPIENTS: usize = 50;
