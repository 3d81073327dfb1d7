use crate::{
    error::{Error, Result},
    path::FieldPath,
    types::put_short_str,
};
use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    string::String,
    vec::Vec,
};
use alloy_primitives::Address;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

/// Token index announcing that the amount's token is the verifying contract
pub const VERIFYING_CONTRACT_TOKEN: u8 = 0xff;

/// Kind of entity a trusted name designates
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustedNameType {
    Account = 1,
    Contract = 2,
    Nft = 3,
    Token = 4,
    Wallet = 5,
    ContextAddress = 6,
}

/// Where a trusted name comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustedNameSource {
    Lab = 0,
    Cal = 1,
    Ens = 2,
    Ud = 3,
    Fn = 4,
    Dns = 5,
    DynamicResolver = 6,
}

/// One entry of a filter's `tokens` table. Every member is optional so that
/// an empty `{}` slot can stand for a token the device does not know.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// A fully described token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo<'a> {
    pub addr: Address,
    pub ticker: &'a str,
    pub decimals: u8,
    pub chain_id: u64,
}

impl TokenSlot {
    /// The token, if every member of the slot is present
    pub fn info(&self) -> Option<TokenInfo<'_>> {
        Some(TokenInfo {
            addr: self.addr?,
            ticker: self.ticker.as_deref()?,
            decimals: self.decimals?,
            chain_id: self.chain_id?,
        })
    }
}

/// How a single message field is disclosed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldFilter {
    Raw {
        name: String,
    },
    AmountJoinValue {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<u8>,
    },
    AmountJoinToken {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<u8>,
    },
    Datetime {
        name: String,
    },
    TrustedName {
        name: String,
        tn_type: BTreeSet<TrustedNameType>,
        tn_source: BTreeSet<TrustedNameSource>,
    },
}

/// Filter specification of a `*-filter.json` file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default)]
    pub tokens: Vec<TokenSlot>,
    pub fields: BTreeMap<FieldPath, FieldFilter>,
}

impl FilterSpec {
    /// Parse a filter file. Text that is not JSON is a load error, a JSON
    /// document with an unknown filter kind or bad members is a schema error.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(s).map_err(|e| Error::FilterLoad(format!("{}", e)))?;
        Self::from_json(value)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::schema(format!("invalid filter: {}", e)))
    }

    pub fn token(&self, index: u8) -> Option<&TokenSlot> {
        self.tokens.get(index as usize)
    }
}

/// EIP-712 filtering operation type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Eip712FilterType {
    /// Activation
    Activation,
    /// Discarded filter path
    DiscardedFilterPath(String),
    /// Message info
    MessageInfo { display_name: String, filters_count: u8 },
    /// Trusted name
    TrustedName {
        display_name: String,
        name_types: Vec<u8>,
        name_sources: Vec<u8>,
    },
    /// Date/time
    DateTime { display_name: String },
    /// Amount-join token
    AmountJoinToken { token_index: u8 },
    /// Amount-join value
    AmountJoinValue { display_name: String, token_index: u8 },
    /// Raw field
    RawField { display_name: String },
}

impl Eip712FilterType {
    /// P2 selector of the filtering command
    pub fn p2(&self) -> u8 {
        match self {
            Eip712FilterType::Activation => 0x00,
            Eip712FilterType::DiscardedFilterPath(_) => 0x01,
            Eip712FilterType::MessageInfo { .. } => 0x0f,
            Eip712FilterType::TrustedName { .. } => 0xfb,
            Eip712FilterType::DateTime { .. } => 0xfc,
            Eip712FilterType::AmountJoinToken { .. } => 0xfd,
            Eip712FilterType::AmountJoinValue { .. } => 0xfe,
            Eip712FilterType::RawField { .. } => 0xff,
        }
    }

    /// Whether the device shows a screen for this frame
    pub fn is_displayed(&self) -> bool {
        !matches!(
            self,
            Eip712FilterType::Activation
                | Eip712FilterType::DiscardedFilterPath(_)
                | Eip712FilterType::MessageInfo { .. }
                | Eip712FilterType::AmountJoinToken { .. }
        )
    }

    pub fn to_bytes(&self) -> core::result::Result<Vec<u8>, &'static str> {
        let mut buf = BytesMut::new();
        match self {
            Eip712FilterType::Activation => {}
            Eip712FilterType::DiscardedFilterPath(path) => put_short_str(&mut buf, path)?,
            Eip712FilterType::MessageInfo {
                display_name,
                filters_count,
            } => {
                put_short_str(&mut buf, display_name)?;
                buf.put_u8(*filters_count);
            }
            Eip712FilterType::TrustedName {
                display_name,
                name_types,
                name_sources,
            } => {
                put_short_str(&mut buf, display_name)?;
                for list in [name_types, name_sources] {
                    buf.put_u8(u8::try_from(list.len()).map_err(|_| "Too many entries")?);
                    buf.put_slice(list);
                }
            }
            Eip712FilterType::DateTime { display_name } | Eip712FilterType::RawField { display_name } => {
                put_short_str(&mut buf, display_name)?
            }
            Eip712FilterType::AmountJoinToken { token_index } => buf.put_u8(*token_index),
            Eip712FilterType::AmountJoinValue {
                display_name,
                token_index,
            } => {
                put_short_str(&mut buf, display_name)?;
                buf.put_u8(*token_index);
            }
        }
        Ok(buf.to_vec())
    }
}

/// Parameters for EIP-712 filtering operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Eip712FilterParams {
    /// Filter operation type
    pub filter_type: Eip712FilterType,
    /// Whether this filter is discarded
    pub discarded: bool,
}

impl Eip712FilterParams {
    pub fn new(filter_type: Eip712FilterType) -> Self {
        Eip712FilterParams {
            filter_type,
            discarded: false,
        }
    }

    pub fn discarded(filter_type: Eip712FilterType) -> Self {
        Eip712FilterParams {
            filter_type,
            discarded: true,
        }
    }

    /// Device frame of a field filter
    pub fn from_field_filter(filter: &FieldFilter, discarded: bool) -> Self {
        let filter_type = match filter {
            FieldFilter::Raw { name } => Eip712FilterType::RawField {
                display_name: name.clone(),
            },
            FieldFilter::Datetime { name } => Eip712FilterType::DateTime {
                display_name: name.clone(),
            },
            FieldFilter::AmountJoinToken { token } => Eip712FilterType::AmountJoinToken {
                token_index: token.unwrap_or(VERIFYING_CONTRACT_TOKEN),
            },
            FieldFilter::AmountJoinValue { name, token } => Eip712FilterType::AmountJoinValue {
                display_name: name.clone(),
                token_index: token.unwrap_or(VERIFYING_CONTRACT_TOKEN),
            },
            FieldFilter::TrustedName {
                name,
                tn_type,
                tn_source,
            } => Eip712FilterType::TrustedName {
                display_name: name.clone(),
                name_types: tn_type.iter().map(|t| *t as u8).collect(),
                name_sources: tn_source.iter().map(|s| *s as u8).collect(),
            },
        };
        Eip712FilterParams {
            filter_type,
            discarded,
        }
    }
}
