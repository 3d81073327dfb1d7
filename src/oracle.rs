//! Signature verification: the recovered signer must be the wallet.

use crate::{
    eip712::{legacy_signing_hash, signing_hash},
    error::{Error, Result},
    message::TypedDataModel,
};
use alloc::format;
use alloy_primitives::{Address, B256, U256};
use log::{debug, error};

/// Signature as returned by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub v: u8,
    pub r: U256,
    pub s: U256,
}

impl Signature {
    /// Parity of the recovery point. Only `0`, `1`, `27` and `28` select a
    /// unique candidate.
    pub fn y_parity(&self) -> Result<bool> {
        match self.v {
            0 | 27 => Ok(false),
            1 | 28 => Ok(true),
            v => Err(Error::Signature(format!("ambiguous recovery id {}", v))),
        }
    }
}

/// Recompute the digest of the typed data through `alloy-dyn-abi`
pub fn reference_signing_hash(model: &TypedDataModel) -> Result<B256> {
    model
        .to_typed_data()?
        .eip712_signing_hash()
        .map_err(|e| Error::schema(format!("reference digest: {}", e)))
}

pub struct SignatureOracle {
    expected: Address,
}

impl SignatureOracle {
    pub fn new(expected: Address) -> Self {
        SignatureOracle { expected }
    }

    pub fn expected(&self) -> Address {
        self.expected
    }

    pub fn recover(digest: &B256, signature: &Signature) -> Result<Address> {
        let parity = signature.y_parity()?;
        alloy_primitives::Signature::new(signature.r, signature.s, parity)
            .recover_address_from_prehash(digest)
            .map_err(|e| Error::Signature(format!("{}", e)))
    }

    /// Check a signature over `digest`, returning the signer
    pub fn verify_digest(&self, digest: &B256, signature: &Signature) -> Result<Address> {
        let recovered = Self::recover(digest, signature)?;
        if recovered != self.expected {
            error!("signature over {} recovers to {}", digest, recovered);
            return Err(Error::VerificationMismatch {
                expected: self.expected,
                recovered,
            });
        }
        debug!("signature over {} verified", digest);
        Ok(recovered)
    }

    /// Verify a signature of the typed data. The digest is computed twice,
    /// independently, and both must agree.
    pub fn verify(&self, model: &TypedDataModel, signature: &Signature) -> Result<Address> {
        let digest = signing_hash(model)?;
        let reference = reference_signing_hash(model)?;
        if digest != reference {
            return Err(Error::schema(format!(
                "digest {} disagrees with reference {}",
                digest, reference
            )));
        }
        self.verify_digest(&digest, signature)
    }

    pub fn verify_legacy(&self, domain_hash: &B256, message_hash: &B256, signature: &Signature) -> Result<Address> {
        self.verify_digest(&legacy_signing_hash(domain_hash, message_hash), signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eip712, test_utils::*};

    #[test]
    fn test_verify_accepts_wallet_signature() {
        let model = permit_model();
        let digest = signing_hash(&model).unwrap();
        let signature = sign_digest(&digest);

        let oracle = SignatureOracle::new(test_wallet_address());
        assert_eq!(oracle.verify(&model, &signature).unwrap(), test_wallet_address());

        // either recovery id convention
        let normalized = Signature {
            v: signature.v - 27,
            ..signature
        };
        assert_eq!(oracle.verify(&model, &normalized).unwrap(), test_wallet_address());
    }

    #[test]
    fn test_verify_rejects_other_message() {
        let model = permit_model();
        let mut other = permit_message();
        other["message"]["value"] = serde_json::json!("4200000000000000001");
        let other = TypedDataModel::from_json(other).unwrap();

        let signature = sign_digest(&signing_hash(&other).unwrap());
        let oracle = SignatureOracle::new(test_wallet_address());
        assert!(matches!(
            oracle.verify(&model, &signature),
            Err(Error::VerificationMismatch { expected, .. }) if expected == test_wallet_address()
        ));
    }

    #[test]
    fn test_verify_rejects_other_key() {
        let model = mail_model();
        let signature = sign_digest(&signing_hash(&model).unwrap());
        let oracle = SignatureOracle::new(Address::ZERO);
        assert!(matches!(
            oracle.verify(&model, &signature),
            Err(Error::VerificationMismatch { .. })
        ));
    }

    #[test]
    fn test_ambiguous_recovery_id() {
        let model = permit_model();
        let signature = Signature {
            v: 2,
            ..sign_digest(&signing_hash(&model).unwrap())
        };
        let oracle = SignatureOracle::new(test_wallet_address());
        assert!(matches!(oracle.verify(&model, &signature), Err(Error::Signature(_))));
    }

    #[test]
    fn test_verify_legacy() {
        let model = mail_model();
        let domain_hash = eip712::domain_separator(&model).unwrap();
        let message_hash = eip712::struct_hash(&model).unwrap();
        let signature = sign_digest(&legacy_signing_hash(&domain_hash, &message_hash));

        let oracle = SignatureOracle::new(test_wallet_address());
        assert!(oracle.verify_legacy(&domain_hash, &message_hash, &signature).is_ok());
        assert!(matches!(
            oracle.verify_legacy(&message_hash, &domain_hash, &signature),
            Err(Error::VerificationMismatch { .. })
        ));
    }

    #[test]
    fn test_reference_digest_matches() {
        let model = mail_model();
        assert_eq!(
            reference_signing_hash(&model).unwrap(),
            signing_hash(&model).unwrap()
        );
    }
}
