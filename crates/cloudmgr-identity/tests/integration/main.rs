//! Integration tests for cloudmgr-identity
//!
//! Uses wiremock to simulate the identity service project API and verifies
//! lookup, creation and error mapping of the IdentityClient.

mod common;

mod test_projects;
