//! Argon2 password hashing.

use argon2::{
    Algorithm,
    Argon2,
    ParamsBuilder,
    Version,
    password_hash::{
        Error,
        PasswordHash,
        PasswordHasher,
        PasswordVerifier,
        SaltString,
        rand_core::OsRng,
    },
};

/// Cost parameters for Argon2id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCosts {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashCosts {
    fn default() -> Self {
        Self {
            m_cost: argon2::Params::DEFAULT_M_COST,
            t_cost: argon2::Params::DEFAULT_T_COST,
            p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Build an Argon2id hasher from explicit cost parameters.
///
/// # Errors
/// Returns an error when the parameters are outside Argon2's accepted range.
pub fn argon2_with_costs(costs: HashCosts) -> Result<Argon2<'static>, argon2::Error> {
    let params = ParamsBuilder::new()
        .m_cost(costs.m_cost)
        .t_cost(costs.t_cost)
        .p_cost(costs.p_cost)
        .build()?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash `pw` with a fresh random salt, returning the PHC string.
///
/// # Errors
/// Returns any error reported by the hasher.
pub fn hash_password(argon2: &Argon2, pw: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(argon2.hash_password(pw.as_bytes(), &salt)?.to_string())
}

/// Check `pw` against a stored PHC string. Malformed hashes never verify.
#[must_use]
pub fn verify_password(hash: &str, pw: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(pw.as_bytes(), &parsed)
            .is_ok()
    })
}
