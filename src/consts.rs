pub const EIP712_DOMAIN_TYPE_NAME: &str = "EIP712Domain";

/// `0x19 0x01` prefix of the final signing digest
pub const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

pub const DEFAULT_BIP32_PATH: &str = "m/44'/60'/0'/0/0";

/// Nesting bound for the type graph walk
pub const MAX_STRUCT_DEPTH: usize = 32;
