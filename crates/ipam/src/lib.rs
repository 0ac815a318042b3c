//! IPAM provider abstraction
//!
//! Allocation backend for the static IP controllers. A provider knows
//! how to resolve an `IPPool` for a label selector, look up the address
//! a claim resolved to, and file new claims. The `metal3io` provider
//! backs these operations with pool/claim/address resources served by
//! the cluster API; `MockIpamProvider` (behind the `test-util` feature)
//! backs them with in-memory maps for unit tests.

pub mod error;
pub mod metal3io;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod provider;
pub mod util;

pub use error::IpamError;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockIpamProvider;
pub use provider::{IpamProvider, ProviderFactory, provider_factory};
