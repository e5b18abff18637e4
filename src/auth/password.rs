use std::sync::OnceLock;

use thiserror::Error;

/// Prefix of the legacy bio encoding: `CASIRA_PWD:<hash>|<visible bio>`.
pub const LEGACY_BIO_MARKER: &str = "CASIRA_PWD:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Bcrypt,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bcrypt => "bcrypt",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "bcrypt" => Some(Self::Bcrypt),
            _ => None,
        }
    }
}

/// A stored password hash together with the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub algorithm: HashAlgorithm,
    pub hash: String,
}

impl Credential {
    pub fn bcrypt(hash: impl Into<String>) -> Self {
        Self {
            algorithm: HashAlgorithm::Bcrypt,
            hash: hash.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub fn hash_password(plaintext: &str, cost: u32) -> Result<Credential, PasswordError> {
    let hash = bcrypt::hash(plaintext, cost)?;
    Ok(Credential::bcrypt(hash))
}

/// Verify plaintext against a stored credential. Malformed hashes never verify.
pub fn verify_password(plaintext: &str, credential: &Credential) -> bool {
    match credential.algorithm {
        HashAlgorithm::Bcrypt => bcrypt::verify(plaintext, &credential.hash).unwrap_or(false),
    }
}

/// Hash on the blocking pool; bcrypt at production cost takes hundreds of ms.
pub async fn hash_password_blocking(
    plaintext: String,
    cost: u32,
) -> Result<Credential, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext, cost)).await?
}

/// Verify on the blocking pool. With no credential, a dummy hash is verified
/// instead so unknown accounts cost the same as a wrong password.
pub async fn verify_password_blocking(
    plaintext: String,
    credential: Option<Credential>,
    cost: u32,
) -> bool {
    let result = tokio::task::spawn_blocking(move || match credential {
        Some(credential) => verify_password(&plaintext, &credential),
        None => {
            if let Some(dummy) = dummy_credential(cost) {
                verify_password(&plaintext, dummy);
            }
            false
        }
    })
    .await;

    result.unwrap_or_else(|e| {
        tracing::error!("Password verification task failed: {}", e);
        false
    })
}

fn dummy_credential(cost: u32) -> Option<&'static Credential> {
    static DUMMY: OnceLock<Option<Credential>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("casira-dummy-password", cost).ok())
        .as_ref()
}

/// Split a bio into its embedded legacy hash (if any) and the visible text.
pub fn split_legacy_bio(bio: &str) -> (Option<&str>, &str) {
    match bio.strip_prefix(LEGACY_BIO_MARKER) {
        Some(rest) => match rest.split_once('|') {
            Some((hash, visible)) => (Some(hash).filter(|h| !h.is_empty()), visible),
            None => (Some(rest).filter(|h| !h.is_empty()), ""),
        },
        None => (None, bio),
    }
}

/// The part of a bio that may be shown to clients.
pub fn visible_bio(bio: &str) -> &str {
    split_legacy_bio(bio).1
}
