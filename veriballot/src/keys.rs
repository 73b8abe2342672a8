use log::debug;
use rand::rngs::OsRng;
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::pss::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::error::KeyError;
use crate::hash::BallotHash;

/// RSA modulus size for issued voter credentials.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Generate a fresh RSA key pair, returned as `(private PEM, public PEM)`.
///
/// The private half is PKCS#8, the public half SPKI, both PEM-armored.
/// Nothing in this crate keeps a copy of the private half.
pub fn generate_keypair(bits: usize) -> Result<(String, String), KeyError> {
    let mut rng = OsRng;
    let private = RsaPrivateKey::new(&mut rng, bits)?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private.to_pkcs8_pem(LineEnding::LF)?.to_string();
    let public_pem = public.to_public_key_pem(LineEnding::LF)?;
    Ok((private_pem, public_pem))
}

/// Parse a PKCS#8 PEM private key.
pub fn import_private_pem(pem: &str) -> Result<RsaPrivateKey, KeyError> {
    Ok(RsaPrivateKey::from_pkcs8_pem(pem)?)
}

/// Parse an SPKI PEM public key.
pub fn import_public_pem(pem: &str) -> Result<RsaPublicKey, KeyError> {
    Ok(RsaPublicKey::from_public_key_pem(pem)?)
}

/// RSA-PSS sign the hex digest text. The salt is drawn fresh from the
/// OS RNG, so two signatures over the same digest differ byte for byte
/// while both verify.
pub fn sign_digest(digest: &BallotHash, private_pem: &str) -> Result<Vec<u8>, KeyError> {
    let key = import_private_pem(private_pem)?;
    let signing_key = SigningKey::<Sha256>::new(key);
    let mut rng = OsRng;
    let signature = signing_key.try_sign_with_rng(&mut rng, digest.as_str().as_bytes())?;
    Ok(signature.to_vec())
}

/// Verify an RSA-PSS signature over the hex digest text.
///
/// Fails closed: an unreadable key or malformed signature is a `false`,
/// never an abort of the surrounding submission.
pub fn verify_digest(digest: &BallotHash, signature: &[u8], public_pem: &str) -> bool {
    let key = match import_public_pem(public_pem) {
        Ok(key) => key,
        Err(err) => {
            debug!("rejecting unreadable public key: {}", err);
            return false;
        }
    };
    let signature = match Signature::try_from(signature) {
        Ok(signature) => signature,
        Err(err) => {
            debug!("rejecting malformed signature: {}", err);
            return false;
        }
    };
    VerifyingKey::<Sha256>::new(key)
        .verify(digest.as_str().as_bytes(), &signature)
        .is_ok()
}
