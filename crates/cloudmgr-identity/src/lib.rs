//! Cloudmgr Identity - Client for the external identity service
//!
//! Implements the `IIdentityService` port over the identity service's
//! project API. Only the two calls needed for implicit project linkage are
//! covered: look a project up by name and create one.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cloudmgr_identity::client::IdentityClient;
//!
//! # fn example() -> anyhow::Result<()> {
//! let client = IdentityClient::new("https://keystone.example.com/v3", Some("token".into()))?;
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::IdentityClient;

/// Errors raised by the identity client
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the response read
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with an unexpected status
    #[error("Identity service returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("Malformed identity response: {0}")]
    Malformed(String),
}
