//! # chzzk-auth
//!
//! Credentials and REST lookups for the Chzzk chat client.
//!
//! - **Credentials**: the `NID_AUT`/`NID_SES` session cookies, loaded through
//!   a [`CredentialSource`] (cookie file or command line)
//! - **API**: [`ChannelDirectory`] lookups (user hash, chat channel id,
//!   channel name, access token) and the [`ChzzkApi`] HTTP client
//!
//! Cookie files are written with secure file permissions.

#![deny(unsafe_code)]

pub mod api;
pub mod credentials;
pub mod errors;
pub mod types;

pub use api::{ChannelDirectory, ChzzkApi};
pub use credentials::{CookieFile, CredentialSource, Credentials, StaticCredentials, save_cookie_file};
pub use errors::AuthError;
pub use types::ChatTokens;
