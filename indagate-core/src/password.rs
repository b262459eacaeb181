//! Password hashing capability

use crate::error::{Error, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Hashes and verifies passwords; hashes are self-describing strings
pub trait Crypt: Send + Sync {
    /// Hash `password`; `cost` is the number of hashing passes
    fn generate_from_password(&self, password: &[u8], cost: u32) -> Result<String>;

    /// `Unauthorized` when `password` does not match `hash`
    fn compare_hash_and_password(&self, hash: &str, password: &[u8]) -> Result<()>;
}

/// Argon2id, PHC string output
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Crypt;

impl Argon2Crypt {
    fn hasher(cost: u32) -> Result<Argon2<'static>> {
        let params = Params::new(
            Params::DEFAULT_M_COST,
            cost.max(Params::MIN_T_COST),
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| Error::internal(format!("invalid argon2 parameters: {}", e)))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Crypt for Argon2Crypt {
    fn generate_from_password(&self, password: &[u8], cost: u32) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Self::hasher(cost)?
            .hash_password(password, &salt)
            .map_err(|e| Error::internal(format!("unable to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    fn compare_hash_and_password(&self, hash: &str, password: &[u8]) -> Result<()> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::internal(format!("stored password hash is malformed: {}", e)))?;
        // Parameters come from the hash itself.
        Argon2::default()
            .verify_password(password, &parsed)
            .map_err(|_| Error::unauthorized("your username or password is incorrect"))
    }
}
