//! Session cookie credentials.
//!
//! The platform authenticates with two browser cookies, `NID_AUT` and
//! `NID_SES`. They come either from a JSON cookie file or straight from the
//! command line; both sources sit behind [`CredentialSource`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::AuthError;

/// Name of the authentication cookie.
pub const NID_AUT: &str = "NID_AUT";
/// Name of the session cookie.
pub const NID_SES: &str = "NID_SES";

/// The two session cookies. Read-only once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    nid_aut: String,
    nid_ses: String,
}

impl Credentials {
    /// Build credentials from raw cookie values.
    pub fn new(nid_aut: impl Into<String>, nid_ses: impl Into<String>) -> Self {
        Self {
            nid_aut: nid_aut.into(),
            nid_ses: nid_ses.into(),
        }
    }

    /// Value of `NID_AUT`.
    pub fn nid_aut(&self) -> &str {
        &self.nid_aut
    }

    /// Value of `NID_SES`.
    pub fn nid_ses(&self) -> &str {
        &self.nid_ses
    }

    /// `Cookie` header value for authenticated requests.
    pub fn cookie_header(&self) -> String {
        format!("{NID_AUT}={}; {NID_SES}={}", self.nid_aut, self.nid_ses)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("nid_aut", &"***")
            .field("nid_ses", &"***")
            .finish()
    }
}

/// Somewhere credentials can be loaded from.
pub trait CredentialSource {
    /// Load the credentials.
    fn load(&self) -> Result<Credentials, AuthError>;
}

/// A JSON cookie file: `{"NID_AUT": "...", "NID_SES": "..."}`.
///
/// Extra keys are ignored, so a full browser cookie export works as long
/// as it is a flat object.
#[derive(Clone, Debug)]
pub struct CookieFile {
    path: PathBuf,
}

impl CookieFile {
    /// Cookie file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialSource for CookieFile {
    fn load(&self) -> Result<Credentials, AuthError> {
        let data = std::fs::read_to_string(&self.path)?;
        let cookies: HashMap<String, Value> = serde_json::from_str(&data)?;
        let get = |name: &str| {
            cookies
                .get(name)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| AuthError::MissingCookie(name.to_string()))
        };
        Ok(Credentials::new(get(NID_AUT)?, get(NID_SES)?))
    }
}

/// Credentials supplied directly, e.g. from command-line flags.
#[derive(Clone, Debug)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    /// Wrap already-known credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

impl CredentialSource for StaticCredentials {
    fn load(&self) -> Result<Credentials, AuthError> {
        if self.0.nid_aut.is_empty() {
            return Err(AuthError::MissingCookie(NID_AUT.to_string()));
        }
        if self.0.nid_ses.is_empty() {
            return Err(AuthError::MissingCookie(NID_SES.to_string()));
        }
        Ok(self.0.clone())
    }
}

/// Write credentials as a cookie file.
///
/// Creates parent directories if needed. Sets file permissions to 0o600.
pub fn save_cookie_file(path: &Path, credentials: &Credentials) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&serde_json::json!({
        NID_AUT: credentials.nid_aut,
        NID_SES: credentials.nid_ses,
    }))?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    tracing::debug!(?path, "saved cookie file");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn cookie_header_format() {
        let creds = Credentials::new("aut", "ses");
        assert_eq!(creds.cookie_header(), "NID_AUT=aut; NID_SES=ses");
    }

    #[test]
    fn debug_is_redacted() {
        let creds = Credentials::new("secret-aut", "secret-ses");
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn cookie_file_loads_both_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(
            &path,
            r#"{"NID_AUT": "a", "NID_SES": "s", "NNB": "ignored"}"#,
        )
        .unwrap();

        let creds = CookieFile::new(&path).load().unwrap();
        assert_eq!(creds.nid_aut(), "a");
        assert_eq!(creds.nid_ses(), "s");
    }

    #[test]
    fn cookie_file_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"{"NID_AUT": "a"}"#).unwrap();

        let err = CookieFile::new(&path).load().unwrap_err();
        assert_matches!(err, AuthError::MissingCookie(name) if name == "NID_SES");
    }

    #[test]
    fn cookie_file_non_string_value_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, r#"{"NID_AUT": 1, "NID_SES": "s"}"#).unwrap();

        let err = CookieFile::new(&path).load().unwrap_err();
        assert_matches!(err, AuthError::MissingCookie(name) if name == "NID_AUT");
    }

    #[test]
    fn cookie_file_not_found_is_io() {
        let err = CookieFile::new("/nonexistent/cookies.json")
            .load()
            .unwrap_err();
        assert_matches!(err, AuthError::Io(_));
    }

    #[test]
    fn cookie_file_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        std::fs::write(&path, "not json").unwrap();

        assert_matches!(CookieFile::new(&path).load(), Err(AuthError::Json(_)));
    }

    #[test]
    fn static_credentials_reject_empty() {
        let src = StaticCredentials::new(Credentials::new("a", ""));
        assert_matches!(src.load(), Err(AuthError::MissingCookie(name)) if name == "NID_SES");
    }

    #[test]
    fn static_credentials_pass_through() {
        let src = StaticCredentials::new(Credentials::new("a", "s"));
        assert_eq!(src.load().unwrap(), Credentials::new("a", "s"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cookies.json");
        let creds = Credentials::new("a", "s");

        save_cookie_file(&path, &creds).unwrap();
        assert_eq!(CookieFile::new(&path).load().unwrap(), creds);
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_permissions_0600() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        save_cookie_file(&path, &Credentials::new("a", "s")).unwrap();

        let perms = std::fs::metadata(&path).unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }
}
