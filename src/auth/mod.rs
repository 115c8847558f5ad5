//! Authentication module
//!
//! Supports the two credential schemes the vendor exposes: HTTP Basic with
//! site id + API secret (beta API) and Bearer with an app API key.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::AuthConfig;

#[cfg(test)]
mod tests;
