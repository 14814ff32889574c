//! # itschool_core
//!
//! Authentication and authorization core for the IT School backend.
//!
//! Everything here is free of HTTP types: the stores, the token issuer, the
//! login / refresh / logout and password-reset sequencers, the request
//! authenticator strategies and the capability vocabulary. `itschool_api`
//! wires these into axum.

pub mod auth;
pub mod clock;
pub mod email;
pub mod migrate;
pub mod models;
pub mod seed;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
