#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod consts;
pub mod eip712;
pub mod eip712_filter;
pub mod error;
pub mod message;
pub mod oracle;
pub mod parser;
pub mod path;
pub mod resolver;
pub mod trusted;
pub mod types;
pub mod utils;

#[cfg(feature = "std")]
pub mod autonext;
#[cfg(feature = "std")]
pub mod config;
#[cfg(feature = "std")]
pub mod device;
#[cfg(feature = "std")]
pub mod driver;
#[cfg(feature = "std")]
pub mod navigator;
#[cfg(feature = "std")]
pub mod scenario;

#[cfg(test)]
mod test_utils;

pub use alloy_dyn_abi::{Eip712Domain, Eip712Types, Resolver, TypedData};
pub use consts::*;
pub use eip712_filter::{FieldFilter, FilterSpec};
pub use error::{Error, Result, StatusWord};
pub use message::{TypedDataMessage, TypedDataModel};
pub use oracle::{Signature, SignatureOracle};
pub use resolver::{Directive, DirectiveKind, FilterResolver, Resolution};

#[cfg(feature = "std")]
pub use driver::{DisclosureDriver, DisclosureOutcome, ScenarioOptions};
#[cfg(feature = "std")]
pub use scenario::{Scenario, ScenarioOutcome, ScenarioRunner};
