//! Clients for the external services the mirroring workers consume: the
//! upstream security data API, the errata portal and the downstream build
//! system. Each client comes with an in-process mock used by worker tests.

pub mod errata;
pub mod koji;
pub mod security;

mod error;

pub use error::Error;
