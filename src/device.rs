use crate::{
    autonext::AutonextHandle,
    eip712_filter::Eip712FilterParams,
    error::{Error, Result, StatusWord},
    trusted::TrustedNameRef,
    types::{Eip712FieldDefinition, Eip712FieldValue},
};
use alloy_primitives::{Address, B256};
use bytes::{BufMut, BytesMut};
use core::{fmt, str::FromStr};

const HARDENED: u32 = 0x8000_0000;

/// BIP-32 derivation path, e.g. `m/44'/60'/0'/0/0`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivationPath {
    indices: Vec<u32>,
}

impl DerivationPath {
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Count byte followed by big-endian indices
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(1 + 4 * self.indices.len());
        // at most 10 levels, checked when parsing
        buf.put_u8(self.indices.len() as u8);
        for index in &self.indices {
            buf.put_u32(*index);
        }
        buf.to_vec()
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::schema(format!("invalid derivation path {:?}", s));
        let rest = s.strip_prefix("m/").ok_or_else(invalid)?;

        let mut indices = Vec::new();
        for level in rest.split('/') {
            let (digits, hardened) = match level.strip_suffix('\'') {
                Some(digits) => (digits, true),
                None => (level, false),
            };
            let index: u32 = digits.parse().map_err(|_| invalid())?;
            if index >= HARDENED {
                return Err(invalid());
            }
            indices.push(if hardened { index | HARDENED } else { index });
        }
        if indices.len() > 10 {
            return Err(invalid());
        }
        Ok(DerivationPath { indices })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.indices {
            if index & HARDENED != 0 {
                write!(f, "/{}'", index & !HARDENED)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkInfo {
    pub name: String,
    pub ticker: String,
    pub chain_id: u64,
    pub icon: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginInfo {
    pub plugin_id: String,
    pub contract: Address,
    pub selector: [u8; 4],
    pub chain_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NftMetadata {
    pub collection_name: String,
    pub address: Address,
    pub chain_id: u64,
}

/// Transaction-check report attached to the message being signed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSimulation {
    pub from: Address,
    pub digest: B256,
    pub chain_id: u64,
    pub risk: u16,
    pub category: u8,
    pub message: String,
    pub url: String,
}

/// Status word and payload of one exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceResponse {
    pub status: StatusWord,
    pub data: Vec<u8>,
}

impl DeviceResponse {
    pub fn new(status: StatusWord, data: Vec<u8>) -> Self {
        DeviceResponse { status, data }
    }

    pub fn ok(data: Vec<u8>) -> Self {
        DeviceResponse {
            status: StatusWord::Ok,
            data,
        }
    }

    /// The payload of a successful exchange
    pub fn into_data(self) -> Result<Vec<u8>> {
        self.status.check()?;
        Ok(self.data)
    }
}

/// Blocking request/response client of the signing device
pub trait DeviceClient {
    fn get_challenge(&mut self) -> Result<DeviceResponse>;

    fn provide_trusted_name(&mut self, name: &TrustedNameRef) -> Result<StatusWord>;

    /// `payload` is the serialized proxy info
    fn provide_proxy_info(&mut self, payload: &[u8]) -> Result<StatusWord>;

    fn provide_tx_simulation(&mut self, simulation: &TxSimulation) -> Result<StatusWord>;

    fn provide_network_info(&mut self, info: &NetworkInfo) -> Result<StatusWord>;

    fn set_plugin(&mut self, plugin: &PluginInfo) -> Result<StatusWord>;

    fn provide_nft_metadata(&mut self, nft: &NftMetadata) -> Result<StatusWord>;

    fn provide_struct_definition(&mut self, name: &str, fields: &[Eip712FieldDefinition]) -> Result<StatusWord>;

    /// Stream the values of one struct instance, `name` is its type
    fn provide_struct_implementation(&mut self, name: &str, values: &[Eip712FieldValue]) -> Result<StatusWord>;

    fn provide_filter(&mut self, filter: &Eip712FilterParams) -> Result<StatusWord>;

    /// Start signing a pre-hashed message, the result comes from [`DeviceClient::response`]
    fn sign_legacy_typed_data(
        &mut self,
        path: &DerivationPath,
        domain_hash: &B256,
        message_hash: &B256,
    ) -> Result<StatusWord>;

    /// Start signing the streamed message, the result comes from [`DeviceClient::response`]
    fn sign_typed_data_v2(&mut self, path: &DerivationPath) -> Result<StatusWord>;

    fn get_public_address(&mut self, path: &DerivationPath) -> Result<DeviceResponse>;

    /// Wait for the response of the pending signing request
    fn response(&mut self) -> Result<DeviceResponse>;

    /// Route screen-change events to `handle`, or stop routing them
    fn set_autonext(&mut self, handle: Option<AutonextHandle>);
}

pub mod response {
    use crate::{
        error::{Error, Result},
        oracle::Signature,
    };
    use alloy_primitives::{Address, U256};
    use bytes::Buf;

    fn truncated(what: &str) -> Error {
        Error::Response(format!("truncated {}", what))
    }

    /// `v ‖ r ‖ s`
    pub fn signature(data: &[u8]) -> Result<Signature> {
        let mut buf = data;
        if buf.remaining() != 65 {
            return Err(Error::Response(format!("signature of {} bytes", data.len())));
        }
        let v = buf.get_u8();
        let mut word = [0u8; 32];
        buf.copy_to_slice(&mut word);
        let r = U256::from_be_bytes(word);
        buf.copy_to_slice(&mut word);
        let s = U256::from_be_bytes(word);
        Ok(Signature { v, r, s })
    }

    /// Public key and address, the address as ASCII hex
    pub fn pk_addr(data: &[u8]) -> Result<(Vec<u8>, Address)> {
        let mut buf = data;
        let pk_len = buf.try_get_u8().map_err(|_| truncated("public key"))? as usize;
        if buf.remaining() < pk_len {
            return Err(truncated("public key"));
        }
        let public_key = buf[..pk_len].to_vec();
        buf.advance(pk_len);

        let addr_len = buf.try_get_u8().map_err(|_| truncated("address"))? as usize;
        if buf.remaining() < addr_len {
            return Err(truncated("address"));
        }
        let ascii = core::str::from_utf8(&buf[..addr_len])
            .map_err(|_| Error::Response("address is not ASCII".to_string()))?;
        let address = ascii
            .strip_prefix("0x")
            .unwrap_or(ascii)
            .parse::<Address>()
            .map_err(|e| Error::Response(format!("invalid address {:?}: {}", ascii, e)))?;
        Ok((public_key, address))
    }

    pub fn challenge(data: &[u8]) -> Result<u32> {
        let mut buf = data;
        let challenge = buf.try_get_u32().map_err(|_| truncated("challenge"))?;
        Ok(challenge)
    }
}
