use std::path::PathBuf;

use thiserror::Error;

/// Error types
#[derive(Debug, Error)]
pub enum Error {
    #[error("veriballot: invalid input: {0}")]
    InvalidInput(String),

    #[error("veriballot: voter is already registered")]
    AlreadyRegistered,

    #[error("veriballot: voter is not registered")]
    NotRegistered,

    #[error("veriballot: voter has already voted")]
    AlreadyVoted,

    #[error("veriballot: unknown candidate: {0}")]
    InvalidCandidate(String),

    #[error("veriballot: ballot message does not match its claimed hash")]
    IntegrityViolation,

    #[error("veriballot: ballot signature failed verification")]
    SignatureInvalid,

    #[error(transparent)]
    KeyLoad(#[from] KeyError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Key material errors
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("veriballot: RSA key generation failed: {0}")]
    Generation(#[from] rsa::Error),

    #[error("veriballot: private key PEM error: {0}")]
    PrivatePem(#[from] rsa::pkcs8::Error),

    #[error("veriballot: public key PEM error: {0}")]
    PublicPem(#[from] rsa::pkcs8::spki::Error),

    #[error("veriballot: PSS signing failed: {0}")]
    Signing(#[from] rsa::signature::Error),
}

/// Ledger storage errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("veriballot: unable to read ledger {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("veriballot: {} is not a valid ledger document: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("veriballot: unable to encode ledger: {0}")]
    Encode(serde_json::Error),

    #[error("veriballot: unable to write ledger {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
