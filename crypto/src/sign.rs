//! Ed25519 message signing and verification.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use lattice_types::{Account, PrivateKey, Signature};

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    let sig = signing_key.sign(message);
    Signature(sig.to_bytes())
}

/// Verify a signature against a message and the signing account.
pub fn verify_signature(message: &[u8], signature: &Signature, account: &Account) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(account.as_bytes()) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Verify many signatures at once, returning one verdict per entry.
///
/// A single batch check covers the common case where every signature is
/// valid. If the batch fails, entries are re-checked one by one so that a
/// single bad signature does not reject its neighbours.
pub fn verify_batch(messages: &[&[u8]], signatures: &[Signature], accounts: &[Account]) -> Vec<bool> {
    let len = messages.len();
    if len == 0 || signatures.len() != len || accounts.len() != len {
        return vec![false; len];
    }

    let keys: Option<Vec<VerifyingKey>> = accounts
        .iter()
        .map(|a| VerifyingKey::from_bytes(a.as_bytes()).ok())
        .collect();
    if let Some(keys) = keys {
        let sigs: Vec<ed25519_dalek::Signature> = signatures
            .iter()
            .map(|s| ed25519_dalek::Signature::from_bytes(&s.0))
            .collect();
        if ed25519_dalek::verify_batch(messages, &sigs, &keys).is_ok() {
            return vec![true; len];
        }
    }

    messages
        .iter()
        .zip(signatures)
        .zip(accounts)
        .map(|((m, s), a)| verify_signature(m, s, a))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair().unwrap();
        let msg = b"test message";
        let sig = sign_message(msg, &kp.private);
        assert!(verify_signature(msg, &sig, &kp.account));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = generate_keypair().unwrap();
        let sig = sign_message(b"correct message", &kp.private);
        assert!(!verify_signature(b"wrong message", &sig, &kp.account));
    }

    #[test]
    fn wrong_key_fails() {
        let kp1 = generate_keypair().unwrap();
        let kp2 = generate_keypair().unwrap();
        let sig = sign_message(b"test", &kp1.private);
        assert!(!verify_signature(b"test", &sig, &kp2.account));
    }

    #[test]
    fn signature_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]);
        let sig1 = sign_message(b"deterministic", &kp.private);
        let sig2 = sign_message(b"deterministic", &kp.private);
        assert_eq!(sig1, sig2);
    }

    #[test]
    fn batch_all_valid() {
        let keys: Vec<_> = (0..4u8).map(|i| keypair_from_seed(&[i + 1; 32])).collect();
        let msgs: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 16]).collect();
        let sigs: Vec<_> = keys
            .iter()
            .zip(&msgs)
            .map(|(k, m)| sign_message(m, &k.private))
            .collect();
        let accounts: Vec<_> = keys.iter().map(|k| k.account).collect();
        let refs: Vec<&[u8]> = msgs.iter().map(|m| m.as_slice()).collect();
        assert_eq!(verify_batch(&refs, &sigs, &accounts), vec![true; 4]);
    }

    #[test]
    fn batch_isolates_bad_signature() {
        let keys: Vec<_> = (0..3u8).map(|i| keypair_from_seed(&[i + 10; 32])).collect();
        let msgs: Vec<Vec<u8>> = (0..3u8).map(|i| vec![i; 8]).collect();
        let mut sigs: Vec<_> = keys
            .iter()
            .zip(&msgs)
            .map(|(k, m)| sign_message(m, &k.private))
            .collect();
        sigs[1].0[0] ^= 0xFF;
        let accounts: Vec<_> = keys.iter().map(|k| k.account).collect();
        let refs: Vec<&[u8]> = msgs.iter().map(|m| m.as_slice()).collect();
        assert_eq!(verify_batch(&refs, &sigs, &accounts), vec![true, false, true]);
    }

    #[test]
    fn batch_empty() {
        assert!(verify_batch(&[], &[], &[]).is_empty());
    }
}
