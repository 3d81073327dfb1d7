pub use crate::types::{
    Eip712ArrayLevel, Eip712FieldDefinition, Eip712FieldType, Eip712StructDefinitions,
};
use crate::{eip712_filter::FilterSpec, message::TypedDataModel, oracle::Signature};
use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};
use alloy_dyn_abi::eip712::TypedData;
use alloy_primitives::{Address, B256, U256, hex};
use k256::ecdsa::SigningKey;
use serde_json::{Value, json};

/// Private key of the first well-known development account
const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const ENS_TOKEN: &str = "0xC18360217D8F7Ab5e7c516566761Ea12Ce7F9D72";
pub const SECOND_ACCOUNT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub fn init_logging() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

pub fn test_signing_key() -> SigningKey {
    SigningKey::from_slice(&hex::decode(TEST_PRIVATE_KEY).unwrap()).unwrap()
}

pub fn test_wallet_address() -> Address {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
}

/// Sign a digest with the test key, `v` in the 27/28 convention
pub fn sign_digest(digest: &B256) -> Signature {
    let (signature, recid) = test_signing_key()
        .sign_prehash_recoverable(digest.as_slice())
        .unwrap();
    let bytes = signature.to_bytes();
    Signature {
        v: 27 + recid.to_byte(),
        r: U256::from_be_slice(&bytes[..32]),
        s: U256::from_be_slice(&bytes[32..]),
    }
}

pub fn get_domain_struct_def() -> Vec<Eip712FieldDefinition> {
    vec![
        Eip712FieldDefinition::new(Eip712FieldType::String, "name".to_string()),
        Eip712FieldDefinition::new(Eip712FieldType::String, "version".to_string()),
        Eip712FieldDefinition::new(Eip712FieldType::Uint(32), "chainId".to_string()),
        Eip712FieldDefinition::new(Eip712FieldType::Address, "verifyingContract".to_string()),
    ]
}

pub fn prepare_mail_struct_defs() -> Eip712StructDefinitions {
    let mut struct_defs: Eip712StructDefinitions = Default::default();

    struct_defs.insert("EIP712Domain".to_string(), get_domain_struct_def());

    struct_defs.insert(
        "Mail".to_string(),
        vec![
            Eip712FieldDefinition::new(Eip712FieldType::Custom("Person".to_string()), "from".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::Custom("Person".to_string()), "to".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::String, "contents".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::Uint(8), "timestamp".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::Uint(32), "amount".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::Uint(32), "payback".to_string()),
        ],
    );

    struct_defs.insert(
        "Person".to_string(),
        vec![
            Eip712FieldDefinition::new(Eip712FieldType::String, "name".to_string()),
            Eip712FieldDefinition::new(Eip712FieldType::Address, "wallets".to_string())
                .with_array_level(Eip712ArrayLevel::Dynamic),
        ],
    );

    struct_defs
}

fn standard_domain_types() -> Value {
    json!([
        { "name": "name", "type": "string" },
        { "name": "version", "type": "string" },
        { "name": "chainId", "type": "uint256" },
        { "name": "verifyingContract", "type": "address" }
    ])
}

pub fn mail_message() -> Value {
    json!({
        "domain": {
            "chainId": 1,
            "name": "Simple Mail",
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC",
            "version": "1"
        },
        "message": {
            "from": {
                "name": "Cow",
                "wallets": [
                    "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826",
                    "0xDeaDbeefdEAdbeefdEadbEEFdeadbeEFdEaDbeeF"
                ]
            },
            "to": {
                "name": "Bob",
                "wallets": [
                    "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB",
                    "0xB0BdaBea57B0BDABeA57b0bdABEA57b0BDabEa57",
                    "0xB0B0b0b0b0b0B000000000000000000000000000"
                ]
            },
            "contents": "Hello, Bob!",
            "timestamp": 1633072800,
            "amount": 1000000,
            "payback": "0x1000000000000000000"
        },
        "primaryType": "Mail",
        "types": {
            "EIP712Domain": standard_domain_types(),
            "Mail": [
                { "name": "from", "type": "Person" },
                { "name": "to", "type": "Person" },
                { "name": "contents", "type": "string" },
                { "name": "timestamp", "type": "uint64" },
                { "name": "amount", "type": "uint256" },
                { "name": "payback", "type": "uint256" }
            ],
            "Person": [
                { "name": "name", "type": "string" },
                { "name": "wallets", "type": "address[]" }
            ]
        }
    })
}

pub fn get_raw_mail_typed_data() -> Result<TypedData, String> {
    let typed: TypedData = serde_json::from_value(mail_message()).map_err(|_| "invalid json str")?;
    Ok(typed)
}

pub fn mail_model() -> TypedDataModel {
    TypedDataModel::from_json(mail_message()).unwrap()
}

pub fn prepare_mail_data() -> Vec<Vec<u8>> {
    vec![
        hex::decode("436f77").unwrap(),
        hex::decode("02").unwrap(),
        hex::decode("cd2a3d9f938e13cd947ec05abc7fe734df8dd826").unwrap(),
        hex::decode("deadbeefdeadbeefdeadbeefdeadbeefdeadbeef").unwrap(),
        hex::decode("426f62").unwrap(),
        hex::decode("03").unwrap(),
        hex::decode("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb").unwrap(),
        hex::decode("b0bdabea57b0bdabea57b0bdabea57b0bdabea57").unwrap(),
        hex::decode("b0b0b0b0b0b0b000000000000000000000000000").unwrap(),
        hex::decode("48656c6c6f2c20426f6221").unwrap(),
        hex::decode("6156b6a0").unwrap(),
        hex::decode("0f4240").unwrap(),
        hex::decode("01000000000000000000").unwrap(),
    ]
}

pub fn permit_message() -> Value {
    json!({
        "domain": {
            "name": "Ethereum Name Service",
            "version": "1",
            "chainId": 1,
            "verifyingContract": ENS_TOKEN
        },
        "message": {
            "owner": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "spender": SECOND_ACCOUNT,
            "value": "4200000000000000000",
            "nonce": 0,
            "deadline": 1719756000
        },
        "primaryType": "Permit",
        "types": {
            "EIP712Domain": standard_domain_types(),
            "Permit": [
                { "name": "owner", "type": "address" },
                { "name": "spender", "type": "address" },
                { "name": "value", "type": "uint256" },
                { "name": "nonce", "type": "uint256" },
                { "name": "deadline", "type": "uint256" }
            ]
        }
    })
}

pub fn permit_model() -> TypedDataModel {
    TypedDataModel::from_json(permit_message()).unwrap()
}

pub fn permit_filter_json() -> Value {
    json!({
        "name": "Permit",
        "tokens": [
            { "addr": ENS_TOKEN, "ticker": "ENS", "decimals": 18, "chain_id": 1 }
        ],
        "fields": {
            "value": { "type": "amount_join_value", "name": "Send" },
            "deadline": { "type": "datetime", "name": "Deadline" }
        }
    })
}

pub fn permit_filter() -> FilterSpec {
    FilterSpec::from_json(permit_filter_json()).unwrap()
}

pub fn empty_array_message() -> Value {
    json!({
        "domain": {
            "name": "Empty Arrays",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "text": "This is a test",
            "subtext": [],
            "msg_list1": [
                { "title": "Hello", "to": [] }
            ],
            "msg_list2": []
        },
        "primaryType": "Test",
        "types": {
            "EIP712Domain": standard_domain_types(),
            "Test": [
                { "name": "text", "type": "string" },
                { "name": "subtext", "type": "string[]" },
                { "name": "msg_list1", "type": "Msg[]" },
                { "name": "msg_list2", "type": "Msg[]" }
            ],
            "Msg": [
                { "name": "title", "type": "string" },
                { "name": "to", "type": "address[]" }
            ]
        }
    })
}

pub fn empty_array_filter() -> FilterSpec {
    FilterSpec::from_json(json!({
        "name": "Empty array",
        "fields": {
            "text": { "type": "raw", "name": "Text" },
            "subtext.[]": { "type": "raw", "name": "Sub-text" },
            "msg_list1.[].to.[]": { "type": "raw", "name": "Recipient" },
            "msg_list2.[].title": { "type": "raw", "name": "Title" }
        }
    }))
    .unwrap()
}

/// Swap with joined amounts at top level and inside an array
pub fn swap_message() -> Value {
    json!({
        "domain": {
            "name": "Swapper",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        },
        "message": {
            "tokenIn": USDC,
            "amountIn": "1500000",
            "tokenOut": DAI,
            "amountOut": "115792089237316195423570985008687907853269984665640564039457584007913129639935",
            "recipient": SECOND_ACCOUNT,
            "orders": [
                { "amount": 2500000, "token": USDC },
                { "amount": "1000000000000000000", "token": DAI }
            ],
            "expiry": 1714559400
        },
        "primaryType": "Swap",
        "types": {
            "EIP712Domain": standard_domain_types(),
            "Swap": [
                { "name": "tokenIn", "type": "address" },
                { "name": "amountIn", "type": "uint256" },
                { "name": "tokenOut", "type": "address" },
                { "name": "amountOut", "type": "uint256" },
                { "name": "recipient", "type": "address" },
                { "name": "orders", "type": "Order[]" },
                { "name": "expiry", "type": "uint64" }
            ],
            "Order": [
                { "name": "amount", "type": "uint256" },
                { "name": "token", "type": "address" }
            ]
        }
    })
}

pub fn swap_filter_json() -> Value {
    json!({
        "name": "Swap",
        "tokens": [
            { "addr": USDC, "ticker": "USDC", "decimals": 6, "chain_id": 1 },
            { "addr": DAI, "ticker": "DAI", "decimals": 18, "chain_id": 1 }
        ],
        "fields": {
            "tokenIn": { "type": "amount_join_token", "token": 0 },
            "amountIn": { "type": "amount_join_value", "name": "Send", "token": 0 },
            "tokenOut": { "type": "amount_join_token", "token": 1 },
            "amountOut": { "type": "amount_join_value", "name": "Receive", "token": 1 },
            "recipient": { "type": "raw", "name": "Recipient" },
            "orders.[].amount": { "type": "amount_join_value", "name": "Order", "token": 0 },
            "orders.[].token": { "type": "amount_join_token", "token": 0 },
            "expiry": { "type": "datetime", "name": "Expires" }
        }
    })
}

pub fn swap_filter() -> FilterSpec {
    FilterSpec::from_json(swap_filter_json()).unwrap()
}

pub fn approval_message() -> Value {
    json!({
        "domain": {
            "name": "Approvals",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        },
        "message": {
            "owner": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "spender": SECOND_ACCOUNT
        },
        "primaryType": "Approval",
        "types": {
            "EIP712Domain": standard_domain_types(),
            "Approval": [
                { "name": "owner", "type": "address" },
                { "name": "spender", "type": "address" }
            ]
        }
    })
}

pub fn approval_filter() -> FilterSpec {
    FilterSpec::from_json(json!({
        "name": "Approval",
        "fields": {
            "owner": {
                "type": "trusted_name",
                "name": "Owner",
                "tn_type": ["account"],
                "tn_source": ["ens"]
            },
            "spender": {
                "type": "trusted_name",
                "name": "Spender",
                "tn_type": ["contract"],
                "tn_source": ["cal", "ens"]
            }
        }
    }))
    .unwrap()
}

#[cfg(feature = "std")]
pub use self::fake::*;

#[cfg(feature = "std")]
mod fake {
    use super::*;
    use crate::{
        EIP712_DOMAIN_TYPE_NAME,
        autonext::AutonextHandle,
        device::{DerivationPath, DeviceClient, DeviceResponse, NetworkInfo, NftMetadata, PluginInfo, TxSimulation},
        eip712::legacy_signing_hash,
        eip712_filter::{Eip712FilterParams, Eip712FilterType},
        error::{Error, Result, StatusWord},
        message::{TypeEntry, TypedDataMessage},
        navigator::{Capture, NavIns, Navigator, SettingId},
        parser::{build_schema, build_value},
        trusted::TrustedNameRef,
        types::Eip712FieldValue,
    };
    use log::warn;
    use std::sync::{Arc, Mutex, MutexGuard};

    /// Device settings and user behaviour shared by the fake device and
    /// the recording navigator
    #[derive(Clone, Debug, Default)]
    pub struct SimState {
        pub blind_signing: bool,
        pub verbose: bool,
        pub display_hash: bool,
        /// Refuse at the approval screen
        pub reject: bool,
    }

    enum Pending {
        Digest(B256),
        Refused,
    }

    /// In-memory device signing with the test key. It rebuilds the message
    /// from the streamed values and hashes it with `alloy-dyn-abi`.
    pub struct FakeDevice {
        state: Arc<Mutex<SimState>>,
        autonext: Option<AutonextHandle>,
        /// Every handle the device was given
        pub handles: Vec<AutonextHandle>,
        pub filters: Vec<Eip712FilterParams>,
        pub trusted_names: Vec<TrustedNameRef>,
        pub proxies: Vec<Vec<u8>>,
        /// Names of the other provisioning commands received
        pub provisioned: Vec<String>,
        pub challenges: Vec<u32>,
        pub address_requests: usize,
        struct_defs: Eip712StructDefinitions,
        domain: Option<Value>,
        message: Option<(String, Value)>,
        filtered: bool,
        simulated: bool,
        refused: bool,
        pending: Option<Pending>,
    }

    impl FakeDevice {
        pub fn new() -> Self {
            Self::with_state(Default::default())
        }

        pub fn with_state(state: Arc<Mutex<SimState>>) -> Self {
            FakeDevice {
                state,
                autonext: None,
                handles: Vec::new(),
                filters: Vec::new(),
                trusted_names: Vec::new(),
                proxies: Vec::new(),
                provisioned: Vec::new(),
                challenges: Vec::new(),
                address_requests: 0,
                struct_defs: Default::default(),
                domain: None,
                message: None,
                filtered: false,
                simulated: false,
                refused: false,
                pending: None,
            }
        }

        pub fn state(&self) -> MutexGuard<'_, SimState> {
            self.state.lock().unwrap()
        }

        pub fn autonext(&self) -> Option<&AutonextHandle> {
            self.autonext.as_ref()
        }

        /// Announce a new screen, as the device timer does
        fn advance(&self) {
            if let Some(handle) = &self.autonext {
                if let Err(e) = handle.fire() {
                    warn!("advance handler failed: {}", e);
                }
            }
        }

        fn received_model(&self) -> Result<TypedDataModel> {
            let (primary_type, message) = self
                .message
                .clone()
                .ok_or_else(|| Error::Response("no message streamed".to_string()))?;
            let Some(Value::Object(domain)) = self.domain.clone() else {
                return Err(Error::Response("no domain streamed".to_string()));
            };
            let types = self
                .struct_defs
                .iter()
                .map(|(name, fields)| {
                    let entries = fields
                        .iter()
                        .map(|f| TypeEntry {
                            name: f.name.clone(),
                            ty: f.type_string(),
                        })
                        .collect();
                    (name.clone(), entries)
                })
                .collect();
            TypedDataModel::new(TypedDataMessage {
                domain,
                types,
                primary_type,
                message,
            })
        }

        fn signature_bytes(digest: &B256) -> Vec<u8> {
            let signature = sign_digest(digest);
            let mut data = vec![signature.v];
            data.extend(signature.r.to_be_bytes::<32>());
            data.extend(signature.s.to_be_bytes::<32>());
            data
        }
    }

    impl DeviceClient for FakeDevice {
        fn get_challenge(&mut self) -> Result<DeviceResponse> {
            let challenge = 0x1000_0000 + self.challenges.len() as u32;
            self.challenges.push(challenge);
            Ok(DeviceResponse::ok(challenge.to_be_bytes().to_vec()))
        }

        fn provide_trusted_name(&mut self, name: &TrustedNameRef) -> Result<StatusWord> {
            if name.challenge.is_some_and(|c| !self.challenges.contains(&c)) {
                return Ok(StatusWord::InvalidData);
            }
            self.trusted_names.push(name.clone());
            Ok(StatusWord::Ok)
        }

        fn provide_proxy_info(&mut self, payload: &[u8]) -> Result<StatusWord> {
            self.proxies.push(payload.to_vec());
            Ok(StatusWord::Ok)
        }

        fn provide_tx_simulation(&mut self, simulation: &TxSimulation) -> Result<StatusWord> {
            self.simulated = true;
            self.provisioned.push(format!("simulation:{}", simulation.risk));
            Ok(StatusWord::Ok)
        }

        fn provide_network_info(&mut self, info: &NetworkInfo) -> Result<StatusWord> {
            self.provisioned.push(format!("network:{}", info.name));
            Ok(StatusWord::Ok)
        }

        fn set_plugin(&mut self, plugin: &PluginInfo) -> Result<StatusWord> {
            self.provisioned.push(format!("plugin:{}", plugin.plugin_id));
            Ok(StatusWord::Ok)
        }

        fn provide_nft_metadata(&mut self, nft: &NftMetadata) -> Result<StatusWord> {
            self.provisioned.push(format!("nft:{}", nft.collection_name));
            Ok(StatusWord::Ok)
        }

        fn provide_struct_definition(&mut self, name: &str, fields: &[Eip712FieldDefinition]) -> Result<StatusWord> {
            // go through the wire encoding, as a real device would
            let mut decoded = Vec::with_capacity(fields.len());
            for field in fields {
                let bytes = field.to_bytes().map_err(Error::schema)?;
                decoded.push(Eip712FieldDefinition::from_bytes(&bytes).map_err(Error::schema)?);
            }
            self.struct_defs.insert(name.to_string(), decoded);
            Ok(StatusWord::Ok)
        }

        fn provide_struct_implementation(&mut self, name: &str, values: &[Eip712FieldValue]) -> Result<StatusWord> {
            let schema = build_schema(&self.struct_defs, name)?;
            let value = build_value(&schema, &mut values.iter().map(|v| v.value.clone())).map_err(Error::schema)?;
            if name == EIP712_DOMAIN_TYPE_NAME {
                self.domain = Some(value);
                return Ok(StatusWord::Ok);
            }
            self.message = Some((name.to_string(), value));

            let state = self.state().clone();
            if !self.filtered && !state.blind_signing {
                self.refused = true;
                return Ok(StatusWord::Ok);
            }
            if !self.filtered || state.verbose || self.simulated {
                self.advance();
            }
            if !self.filtered {
                let leaves = self.received_model()?.flatten()?.leaves.len();
                for _ in 0..leaves {
                    self.advance();
                }
            }
            Ok(StatusWord::Ok)
        }

        fn provide_filter(&mut self, filter: &Eip712FilterParams) -> Result<StatusWord> {
            self.filters.push(filter.clone());
            if filter.filter_type == Eip712FilterType::Activation {
                self.filtered = true;
            } else if filter.filter_type.is_displayed() && !filter.discarded {
                self.advance();
            }
            Ok(StatusWord::Ok)
        }

        fn sign_legacy_typed_data(
            &mut self,
            _path: &DerivationPath,
            domain_hash: &B256,
            message_hash: &B256,
        ) -> Result<StatusWord> {
            self.pending = Some(Pending::Digest(legacy_signing_hash(domain_hash, message_hash)));
            Ok(StatusWord::Ok)
        }

        fn sign_typed_data_v2(&mut self, _path: &DerivationPath) -> Result<StatusWord> {
            if self.refused {
                self.pending = Some(Pending::Refused);
                return Ok(StatusWord::Ok);
            }
            let digest = self
                .received_model()?
                .to_typed_data()?
                .eip712_signing_hash()
                .map_err(|e| Error::schema(e.to_string()))?;
            self.pending = Some(Pending::Digest(digest));
            Ok(StatusWord::Ok)
        }

        fn get_public_address(&mut self, _path: &DerivationPath) -> Result<DeviceResponse> {
            self.address_requests += 1;
            let point = test_signing_key().verifying_key().to_encoded_point(false);
            let public_key = point.as_bytes();
            let address = Address::from_raw_public_key(&public_key[1..]);

            let mut data = vec![public_key.len() as u8];
            data.extend(public_key);
            let ascii = hex::encode(address);
            data.push(ascii.len() as u8);
            data.extend(ascii.as_bytes());
            Ok(DeviceResponse::ok(data))
        }

        fn response(&mut self) -> Result<DeviceResponse> {
            let pending = self
                .pending
                .take()
                .ok_or_else(|| Error::Response("no pending request".to_string()))?;
            let response = match pending {
                Pending::Refused => DeviceResponse::new(StatusWord::InvalidData, vec![]),
                Pending::Digest(_) if self.state().reject => {
                    DeviceResponse::new(StatusWord::ConditionNotSatisfied, vec![])
                }
                Pending::Digest(digest) => DeviceResponse::ok(Self::signature_bytes(&digest)),
            };
            Ok(response)
        }

        fn set_autonext(&mut self, handle: Option<AutonextHandle>) {
            if let Some(handle) = &handle {
                self.handles.push(handle.clone());
            }
            self.autonext = handle;
        }
    }

    /// Navigator recording what it is asked to do
    #[derive(Default)]
    pub struct RecordingNavigator {
        pub moves: Vec<NavIns>,
        /// Text of every final review screen reached
        pub reviews: Vec<String>,
        pub captures: Vec<Capture>,
        pub settings: Vec<SettingId>,
        /// Fail every navigation after that many calls
        pub fail_after: Option<usize>,
        calls: usize,
        state: Arc<Mutex<SimState>>,
    }

    impl RecordingNavigator {
        fn check_failure(&mut self) -> Result<()> {
            if self.fail_after.is_some_and(|n| self.calls >= n) {
                return Err(Error::Navigation(format!("screen mismatch at call {}", self.calls)));
            }
            self.calls += 1;
            Ok(())
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&mut self, moves: &[NavIns], capture: Option<&Capture>) -> Result<()> {
            self.check_failure()?;
            self.moves.extend_from_slice(moves);
            self.captures.extend(capture.cloned());
            Ok(())
        }

        fn navigate_until_text(
            &mut self,
            _nav: NavIns,
            _validate: &[NavIns],
            text: &str,
            capture: Option<&Capture>,
        ) -> Result<()> {
            self.check_failure()?;
            self.reviews.push(text.to_string());
            self.captures.extend(capture.cloned());
            Ok(())
        }

        fn toggle_settings(&mut self, settings: &[SettingId]) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            for setting in settings {
                match setting {
                    SettingId::BlindSigning => state.blind_signing = !state.blind_signing,
                    SettingId::VerboseEip712 => state.verbose = !state.verbose,
                    SettingId::DisplayHash => state.display_hash = !state.display_hash,
                }
                self.settings.push(*setting);
            }
            Ok(())
        }
    }

    /// Device and navigator sharing the same settings
    pub fn simulator() -> (FakeDevice, RecordingNavigator) {
        let state: Arc<Mutex<SimState>> = Default::default();
        let navigator = RecordingNavigator {
            state: state.clone(),
            ..Default::default()
        };
        (FakeDevice::with_state(state), navigator)
    }

    #[test]
    fn test_fake_device_key_is_the_test_wallet() {
        let mut device = FakeDevice::new();
        let path: DerivationPath = crate::DEFAULT_BIP32_PATH.parse().unwrap();
        let data = device.get_public_address(&path).unwrap().into_data().unwrap();
        let (pk, address) = crate::device::response::pk_addr(&data).unwrap();
        assert_eq!(pk.len(), 65);
        assert_eq!(address, test_wallet_address());
    }
}
