use crate::eip712_filter::{TrustedNameSource, TrustedNameType};
use alloc::{collections::BTreeSet, string::String, vec::Vec};
use alloy_primitives::Address;
use bytes::{BufMut, BytesMut};
use log::debug;

const TAG_STRUCT_TYPE: u8 = 0x01;
const TAG_STRUCT_VERSION: u8 = 0x02;
const TAG_CHALLENGE: u8 = 0x12;
const TAG_ADDRESS: u8 = 0x22;
const TAG_CHAIN_ID: u8 = 0x23;
const TAG_IMPL_ADDRESS: u8 = 0x29;

const PROXY_INFO_STRUCT_TYPE: u8 = 0x26;
const PROXY_INFO_STRUCT_VERSION: u8 = 0x01;

fn put_tlv(buf: &mut BytesMut, tag: u8, value: &[u8]) {
    buf.put_u8(tag);
    // values are at most 32 bytes
    buf.put_u8(value.len() as u8);
    buf.put_slice(value);
}

fn minimal_be(v: u64) -> Vec<u8> {
    let bytes = v.to_be_bytes();
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[start..].to_vec()
}

/// Claim that `address` is known as `name`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustedNameRef {
    pub address: Address,
    pub name: String,
    pub kind: TrustedNameType,
    pub source: TrustedNameSource,
    pub chain_id: u64,
    /// Device challenge the assertion was bound to, account names only
    pub challenge: Option<u32>,
}

/// Trusted names supplied to one scenario. Each assertion backs at most one
/// disclosure.
#[derive(Clone, Debug, Default)]
pub struct TrustedNameTable {
    entries: Vec<(TrustedNameRef, bool)>,
}

impl TrustedNameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: TrustedNameRef) {
        self.entries.push((name, false));
    }

    /// Consume the first unused assertion for `address` on `chain_id` whose
    /// type and source are both allowed, returning its name.
    pub fn claim(
        &mut self,
        address: &Address,
        chain_id: Option<u64>,
        allowed_types: &BTreeSet<TrustedNameType>,
        allowed_sources: &BTreeSet<TrustedNameSource>,
    ) -> Option<String> {
        let (entry, consumed) = self.entries.iter_mut().find(|(entry, consumed)| {
            !*consumed
                && entry.address == *address
                && chain_id.is_none_or(|id| id == entry.chain_id)
                && allowed_types.contains(&entry.kind)
                && allowed_sources.contains(&entry.source)
        })?;
        *consumed = true;
        debug!("trusted name {} claimed for {}", entry.name, address);
        Some(entry.name.clone())
    }
}

/// Lets a filter written for `address` apply to messages whose verifying
/// contract is `implementation`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyInfo {
    pub challenge: u32,
    /// Address the filter is bound to
    pub address: Address,
    pub chain_id: u64,
    /// The domain's verifying contract
    pub implementation: Address,
}

impl ProxyInfo {
    pub fn binds(&self, filter_address: &Address, verifying_contract: &Address, chain_id: Option<u64>) -> bool {
        self.address == *filter_address
            && self.implementation == *verifying_contract
            && chain_id.is_none_or(|id| id == self.chain_id)
    }

    /// TLV payload of the proxy-info command
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        put_tlv(&mut buf, TAG_STRUCT_TYPE, &[PROXY_INFO_STRUCT_TYPE]);
        put_tlv(&mut buf, TAG_STRUCT_VERSION, &[PROXY_INFO_STRUCT_VERSION]);
        put_tlv(&mut buf, TAG_CHALLENGE, &self.challenge.to_be_bytes());
        put_tlv(&mut buf, TAG_ADDRESS, self.address.as_slice());
        put_tlv(&mut buf, TAG_CHAIN_ID, &minimal_be(self.chain_id));
        put_tlv(&mut buf, TAG_IMPL_ADDRESS, self.implementation.as_slice());
        buf.to_vec()
    }
}
