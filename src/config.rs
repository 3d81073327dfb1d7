use crate::{
    DEFAULT_BIP32_PATH,
    device::DerivationPath,
    error::{Error, Result},
    navigator::DeviceClass,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Settings of a harness session, read from JSON. Every member is optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub device_class: DeviceClass,
    pub bip32_path: String,
    /// Root of the per-scenario reference screens, no capture when unset
    pub snapshot_root: Option<PathBuf>,
    pub golden_run: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            device_class: DeviceClass::default(),
            bip32_path: DEFAULT_BIP32_PATH.to_string(),
            snapshot_root: None,
            golden_run: false,
        }
    }
}

impl HarnessConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::schema(format!("invalid harness config: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn derivation_path(&self) -> Result<DerivationPath> {
        self.bip32_path.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::from_json_str("{}").unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.device_class, DeviceClass::Nano);
        assert_eq!(config.derivation_path().unwrap().to_string(), DEFAULT_BIP32_PATH);
    }

    #[test]
    fn test_parse() {
        let config = HarnessConfig::from_json_str(
            r#"{
                "device_class": "touch",
                "bip32_path": "m/44'/60'/1'/0/0",
                "snapshot_root": "snapshots",
                "golden_run": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.device_class, DeviceClass::Touch);
        assert_eq!(config.snapshot_root, Some(PathBuf::from("snapshots")));
        assert!(config.golden_run);
        assert_eq!(config.derivation_path().unwrap().indices()[2], 0x8000_0001);
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            HarnessConfig::from_json_str(r#"{ "device_class": "watch" }"#),
            Err(Error::Schema(_))
        ));
        let config = HarnessConfig {
            bip32_path: "44'/60'".to_string(),
            ..Default::default()
        };
        assert!(config.derivation_path().is_err());
        assert!(matches!(
            HarnessConfig::load(Path::new("/nonexistent/harness.json")),
            Err(Error::Io(_))
        ));
    }
}
