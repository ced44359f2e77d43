//! # Digital Signatures
//!
//! Free-function façade over [`Keypair`] / [`PublicKey`], plus parallel batch
//! verification.
//!
//! Block application verifies every candidate transaction's signature before
//! touching the ledger. Verification is pure, so it fans out across the rayon
//! thread pool; state changes remain strictly sequential afterwards.

use rayon::prelude::*;

use super::keys::{Keypair, PublicKey, Signature};

/// Sign a message with an account keypair.
///
/// ```
/// use namechain_protocol::crypto::{sign, verify, Keypair};
///
/// let keypair = Keypair::generate();
/// let signature = sign(&keypair, b"pay 5 to bob");
/// assert!(verify(&keypair.public_key(), b"pay 5 to bob", &signature));
/// ```
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verify a detached signature. `false` for any failure, never a panic.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}

/// One item of a batch: who signed, what, and the signature.
#[derive(Debug, Clone)]
pub struct VerifyItem {
    pub public_key: PublicKey,
    pub message: Vec<u8>,
    pub signature: Signature,
}

/// Verify many independent signatures in parallel.
///
/// Returns one result per item in input order, so the caller can report which
/// transaction failed.
pub fn batch_verify(items: &[VerifyItem]) -> Vec<bool> {
    items
        .par_iter()
        .map(|item| verify(&item.public_key, &item.message, &item.signature))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kp: &Keypair, msg: &[u8]) -> VerifyItem {
        VerifyItem {
            public_key: kp.public_key(),
            message: msg.to_vec(),
            signature: sign(kp, msg),
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = sign(&kp1, b"test message");
        assert!(!verify(&kp2.public_key(), b"test message", &sig));
    }

    #[test]
    fn test_deterministic_signatures() {
        let kp = Keypair::from_passphrase("determinism");
        assert_eq!(sign(&kp, b"m"), sign(&kp, b"m"));
    }

    #[test]
    fn test_empty_message() {
        let kp = Keypair::generate();
        let sig = sign(&kp, b"");
        assert!(verify(&kp.public_key(), b"", &sig));
    }

    #[test]
    fn test_batch_verify_reports_each_item() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let mut bad = item(&kp2, b"also valid");
        bad.public_key = kp1.public_key();

        let items = vec![item(&kp1, b"valid"), bad, item(&kp2, b"third")];
        assert_eq!(batch_verify(&items), vec![true, false, true]);
    }

    #[test]
    fn test_batch_verify_many() {
        let items: Vec<VerifyItem> = (0..64)
            .map(|i| item(&Keypair::generate(), format!("message {}", i).as_bytes()))
            .collect();
        assert!(batch_verify(&items).into_iter().all(|ok| ok));
    }

    #[test]
    fn test_batch_verify_empty() {
        assert!(batch_verify(&[]).is_empty());
    }
}
