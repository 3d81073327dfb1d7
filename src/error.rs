use alloc::string::String;
use alloy_primitives::Address;
use thiserror::Error;

/// Device status word, as returned at the end of every APDU exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusWord {
    Ok,
    /// Structured data refused, e.g. blind signing not enabled
    InvalidData,
    /// User rejected on device
    ConditionNotSatisfied,
    Other(u16),
}

impl StatusWord {
    pub const OK: u16 = 0x9000;
    pub const INVALID_DATA: u16 = 0x6a80;
    pub const CONDITION_NOT_SATISFIED: u16 = 0x6985;

    pub fn code(&self) -> u16 {
        match self {
            StatusWord::Ok => Self::OK,
            StatusWord::InvalidData => Self::INVALID_DATA,
            StatusWord::ConditionNotSatisfied => Self::CONDITION_NOT_SATISFIED,
            StatusWord::Other(code) => *code,
        }
    }

    /// Map a non-OK status to its error, `Ok(())` otherwise
    pub fn check(self) -> Result<()> {
        match self {
            StatusWord::Ok => Ok(()),
            StatusWord::InvalidData => Err(Error::DisclosureMode),
            StatusWord::ConditionNotSatisfied => Err(Error::DeviceRejected),
            other => Err(Error::Device(other)),
        }
    }
}

impl From<u16> for StatusWord {
    fn from(code: u16) -> Self {
        match code {
            Self::OK => StatusWord::Ok,
            Self::INVALID_DATA => StatusWord::InvalidData,
            Self::CONDITION_NOT_SATISFIED => StatusWord::ConditionNotSatisfied,
            other => StatusWord::Other(other),
        }
    }
}

impl core::fmt::Display for StatusWord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#06x}", self.code())
    }
}

/// Errors raised while resolving, driving or verifying a typed-data scenario.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed typed data: unknown type, shape mismatch, cyclic types.
    #[error("schema error: {0}")]
    Schema(String),

    /// Filter file missing or not valid JSON. The scenario is skipped.
    #[error("filter load error: {0}")]
    FilterLoad(String),

    /// Filter authored for another contract and no proxy binding vouches for it.
    #[error("filter does not apply: {0}")]
    FilterMismatch(String),

    /// User rejected on device (`CONDITION_NOT_SATISFIED`).
    #[error("rejected on device")]
    DeviceRejected,

    /// Structured data refused without the required risk acknowledgment (`INVALID_DATA`).
    #[error("structured data refused, disclosure mode not enabled")]
    DisclosureMode,

    /// Any other unexpected status word.
    #[error("device returned status {0}")]
    Device(StatusWord),

    /// The recovered signer differs from the wallet.
    #[error("signature recovers to {recovered}, expected {expected}")]
    VerificationMismatch { expected: Address, recovered: Address },

    #[error("invalid signature: {0}")]
    Signature(String),

    #[error("malformed device response: {0}")]
    Response(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[cfg(feature = "std")]
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
