//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Read a database URL from the environment, loading `.env` first.
pub(crate) fn database_url(keys: &[&'static str]) -> Result<SecretString, MissingEnvVar> {
    dotenvy::dotenv().ok();

    keys.iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .map(SecretString::from)
        .ok_or(MissingEnvVar(keys.first().copied().unwrap_or("DATABASE_URL")))
}

/// A required environment variable is not set.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);
