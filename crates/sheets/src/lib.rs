//! # Sheets
//!
//! Read-only Google Sheets client.
//!
//! [`SheetsClient`] reads a range with unformatted values and hands it to
//! the reconcile crate as a [`SheetSource`](reconcile::SheetSource).
//! [`Authenticator`] mints access tokens from a stored refresh token.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{AccessToken, Authenticator, AuthorizedUser};
pub use client::{DEFAULT_RANGE, SheetsClient};
pub use error::{Error, ErrorCategory, Result};
