//! # Registry
//!
//! GraphQL client for the member registry.
//!
//! [`RegistryClient`] implements the reconcile crate's
//! [`RegistrySource`](reconcile::RegistrySource) and
//! [`RegistrySink`](reconcile::RegistrySink) traits, so an orchestrator can
//! pull members and push renames, absences and new members through it.
//!
//! ## Example
//!
//! ```no_run
//! use registry::RegistryClient;
//! use reconcile::RegistrySource;
//!
//! let client = RegistryClient::new("https://registry.example.org/graphql", "id", "secret");
//! for member in client.list_members()? {
//!     println!("{} {}", member.id, member.name());
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod client;
pub mod error;
pub mod queries;
pub mod types;

pub use client::RegistryClient;
pub use error::{Error, ErrorCategory, Result};
pub use types::PronounSet;
