use crate::{
    config::HarnessConfig,
    device::{DeviceClient, NetworkInfo, NftMetadata, PluginInfo, TxSimulation, response},
    driver::{DisclosureDriver, ScenarioOptions, lock},
    eip712::{domain_separator, struct_hash},
    eip712_filter::{FilterSpec, TrustedNameType},
    error::{Error, Result},
    message::TypedDataModel,
    navigator::{Navigator, SettingId},
    oracle::SignatureOracle,
    resolver::FilterResolver,
    trusted::{ProxyInfo, TrustedNameRef, TrustedNameTable},
};
use alloy_primitives::Address;
use log::{debug, info, warn};
use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

const DATA_SUFFIX: &str = "-data.json";
const FILTER_SUFFIX: &str = "-filter.json";

/// Data supplied to the device before the message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provision {
    TrustedName(TrustedNameRef),
    Proxy(ProxyInfo),
    Network(NetworkInfo),
    Plugin(PluginInfo),
    Nft(NftMetadata),
    TxSimulation(TxSimulation),
}

#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: String,
    pub model: TypedDataModel,
    pub filter: Option<FilterSpec>,
    pub provisions: Vec<Provision>,
    /// Review with verbose EIP-712 mode on
    pub verbose: bool,
    pub skip_flow: bool,
    /// Sign the pre-hashed message instead of streaming it
    pub legacy: bool,
}

impl Scenario {
    pub fn new(name: impl Into<String>, model: TypedDataModel) -> Self {
        Scenario {
            name: name.into(),
            model,
            filter: None,
            provisions: Vec::new(),
            verbose: false,
            skip_flow: false,
            legacy: false,
        }
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_provision(mut self, provision: Provision) -> Self {
        self.provisions.push(provision);
        self
    }

    /// Load `<stem>-data.json` along with its `<stem>-filter.json`
    pub fn from_data_file(data_path: &Path) -> Result<Self> {
        let filter_path = filter_path_for(data_path).ok_or_else(|| {
            Error::FilterLoad(format!("{} is not a {} file", data_path.display(), DATA_SUFFIX))
        })?;
        let filter = load_filter(&filter_path)?;
        let model = load_model(data_path)?;

        let name = data_path
            .file_name()
            .and_then(|f| f.to_str())
            .and_then(|f| f.strip_suffix(DATA_SUFFIX))
            .unwrap_or_default();
        Ok(Scenario::new(name, model).with_filter(filter))
    }
}

/// `x-data.json` → `x-filter.json`, in the same directory
pub fn filter_path_for(data_path: &Path) -> Option<PathBuf> {
    let file_name = data_path.file_name()?.to_str()?;
    let stem = file_name.strip_suffix(DATA_SUFFIX)?;
    Some(data_path.with_file_name(format!("{}{}", stem, FILTER_SUFFIX)))
}

/// A filter file that cannot be read or is not JSON is a load error
pub fn load_filter(path: &Path) -> Result<FilterSpec> {
    let text = fs::read_to_string(path).map_err(|e| Error::FilterLoad(format!("{}: {}", path.display(), e)))?;
    FilterSpec::from_json_str(&text)
}

pub fn load_model(path: &Path) -> Result<TypedDataModel> {
    let text = fs::read_to_string(path)?;
    let value = serde_json::from_str(&text).map_err(|e| Error::schema(format!("{}: {}", path.display(), e)))?;
    TypedDataModel::from_json(value)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScenarioOutcome {
    /// Signature checked, signed by this address
    Verified(Address),
    Skipped(String),
    /// Refused by the user on the device
    Rejected,
}

#[derive(Default)]
struct Provisioned {
    trusted_names: TrustedNameTable,
    proxy: Option<ProxyInfo>,
    simulated: bool,
}

pub struct ScenarioRunner<N> {
    driver: DisclosureDriver<N>,
    snapshot_root: Option<PathBuf>,
    golden_run: bool,
    wallet: Option<Address>,
    /// Settings believed to be on
    enabled: BTreeSet<SettingId>,
}

impl<N: Navigator + Send + 'static> ScenarioRunner<N> {
    pub fn new(driver: DisclosureDriver<N>) -> Self {
        ScenarioRunner {
            driver,
            snapshot_root: None,
            golden_run: false,
            wallet: None,
            enabled: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &HarnessConfig, navigator: Arc<Mutex<N>>) -> Result<Self> {
        let driver = DisclosureDriver::new(config.device_class, navigator, config.derivation_path()?);
        Ok(Self::new(driver).with_snapshots(config.snapshot_root.clone(), config.golden_run))
    }

    pub fn with_snapshots(mut self, root: Option<PathBuf>, golden_run: bool) -> Self {
        self.snapshot_root = root;
        self.golden_run = golden_run;
        self
    }

    pub fn driver(&self) -> &DisclosureDriver<N> {
        &self.driver
    }

    /// Address of the signing key, asked once per runner
    pub fn wallet_address<D: DeviceClient>(&mut self, device: &mut D) -> Result<Address> {
        if let Some(address) = self.wallet {
            return Ok(address);
        }
        let data = device.get_public_address(self.driver.path())?.into_data()?;
        let (_, address) = response::pk_addr(&data)?;
        debug!("wallet address {}", address);
        self.wallet = Some(address);
        Ok(address)
    }

    /// Toggle whatever differs from `wanted`
    fn apply_settings(&mut self, wanted: BTreeSet<SettingId>) -> Result<()> {
        let toggled: Vec<SettingId> = self.enabled.symmetric_difference(&wanted).copied().collect();
        if toggled.is_empty() {
            return Ok(());
        }
        debug!("toggling settings {:?}", toggled);
        lock(self.driver.navigator()).toggle_settings(&toggled)?;
        self.enabled = wanted;
        Ok(())
    }

    fn challenge<D: DeviceClient>(device: &mut D) -> Result<u32> {
        let data = device.get_challenge()?.into_data()?;
        response::challenge(&data)
    }

    fn provision<D: DeviceClient>(device: &mut D, provisions: &[Provision]) -> Result<Provisioned> {
        let mut provisioned = Provisioned::default();
        for provision in provisions {
            match provision {
                Provision::TrustedName(name) => {
                    let mut name = name.clone();
                    if name.kind == TrustedNameType::Account {
                        name.challenge = Some(Self::challenge(device)?);
                    }
                    device.provide_trusted_name(&name)?.check()?;
                    provisioned.trusted_names.insert(name);
                }
                Provision::Proxy(proxy) => {
                    let proxy = ProxyInfo {
                        challenge: Self::challenge(device)?,
                        ..proxy.clone()
                    };
                    device.provide_proxy_info(&proxy.serialize())?.check()?;
                    provisioned.proxy = Some(proxy);
                }
                Provision::Network(info) => device.provide_network_info(info)?.check()?,
                Provision::Plugin(plugin) => device.set_plugin(plugin)?.check()?,
                Provision::Nft(nft) => device.provide_nft_metadata(nft)?.check()?,
                Provision::TxSimulation(simulation) => {
                    device.provide_tx_simulation(simulation)?.check()?;
                    provisioned.simulated = true;
                }
            }
        }
        Ok(provisioned)
    }

    pub fn run<D: DeviceClient>(&mut self, device: &mut D, scenario: &Scenario) -> Result<ScenarioOutcome> {
        info!("scenario {}", scenario.name);
        let wallet = self.wallet_address(device)?;

        let mut wanted = BTreeSet::new();
        if scenario.filter.is_none() || scenario.legacy {
            wanted.insert(SettingId::BlindSigning);
        }
        if scenario.verbose {
            wanted.insert(SettingId::VerboseEip712);
        }
        self.apply_settings(wanted)?;

        let provisioned = Self::provision(device, &scenario.provisions)?;
        let mut options = ScenarioOptions {
            snapshots: self.snapshot_root.as_ref().map(|root| root.join(&scenario.name)),
            golden_run: self.golden_run,
            validate_warning: false,
            skip_flow: scenario.skip_flow,
        };
        let oracle = SignatureOracle::new(wallet);

        let signed = if scenario.legacy {
            self.driver
                .sign_legacy(device, &scenario.model, &options)
                .and_then(|signature| {
                    let domain_hash = domain_separator(&scenario.model)?;
                    let message_hash = struct_hash(&scenario.model)?;
                    oracle.verify_legacy(&domain_hash, &message_hash, &signature)
                })
        } else {
            let flat = scenario.model.flatten()?;
            let resolver = match &scenario.filter {
                Some(filter) => FilterResolver::new(filter, &scenario.model),
                None => FilterResolver::unfiltered(&scenario.model),
            };
            let resolution = resolver
                .with_trusted_names(provisioned.trusted_names)
                .with_proxy(provisioned.proxy)
                .resolve(&flat)?;

            options.validate_warning = !resolution.is_filtered() || scenario.verbose || provisioned.simulated;
            self.driver
                .sign_typed_data(device, &scenario.model, &resolution, &options)
                .and_then(|outcome| oracle.verify(&scenario.model, &outcome.signature))
        };

        match signed {
            Ok(signer) => {
                info!("scenario {} verified, signed by {}", scenario.name, signer);
                Ok(ScenarioOutcome::Verified(signer))
            }
            Err(Error::DeviceRejected) => {
                info!("scenario {} rejected on the device", scenario.name);
                Ok(ScenarioOutcome::Rejected)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the scenario of a `<stem>-data.json` file, skipping it when its
    /// filter cannot be loaded
    pub fn run_file<D: DeviceClient>(&mut self, device: &mut D, data_path: &Path) -> Result<ScenarioOutcome> {
        let scenario = match Scenario::from_data_file(data_path) {
            Ok(scenario) => scenario,
            Err(Error::FilterLoad(reason)) => {
                warn!("skipping {}: {}", data_path.display(), reason);
                return Ok(ScenarioOutcome::Skipped(reason));
            }
            Err(e) => return Err(e),
        };
        self.run(device, &scenario)
    }
}
