//! SASL PLAIN credentials (RFC 4616)

use crate::{Error, Result};
use std::fmt;

/// SASL PLAIN credentials handed to the engine's mechanism factory
#[derive(Clone, PartialEq, Eq)]
pub struct SaslPlainCredentials {
    authcid: String,
    passwd: String,
    authzid: Option<String>,
}

impl SaslPlainCredentials {
    /// Create credentials from an authentication identity and password
    pub fn new(authcid: impl Into<String>, passwd: impl Into<String>) -> Self {
        Self {
            authcid: authcid.into(),
            passwd: passwd.into(),
            authzid: None,
        }
    }

    /// Build credentials from a key name and key, if both are present
    ///
    /// Authentication is enabled only when both halves are non-empty. A
    /// one-sided pair yields `None` and the connection is built without SASL.
    pub fn from_key(key_name: &str, key: &str) -> Option<Self> {
        if key_name.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(key_name, key))
    }

    /// Set the authorization identity (act-as)
    pub fn authzid(mut self, authzid: impl Into<String>) -> Self {
        self.authzid = Some(authzid.into());
        self
    }

    /// Authentication identity
    pub fn username(&self) -> &str {
        &self.authcid
    }

    /// Password
    pub fn password(&self) -> &str {
        &self.passwd
    }

    /// Authorization identity, if set
    pub fn authorization_id(&self) -> Option<&str> {
        self.authzid.as_deref()
    }

    /// Encode the PLAIN initial response: `[authzid] NUL authcid NUL passwd`
    pub fn initial_response(&self) -> Result<Vec<u8>> {
        let authzid = self.authzid.as_deref().unwrap_or("");
        for (field, value) in [
            ("authzid", authzid),
            ("authcid", self.authcid.as_str()),
            ("passwd", self.passwd.as_str()),
        ] {
            if value.contains('\0') {
                return Err(Error::Config(format!(
                    "SASL PLAIN {} must not contain NUL",
                    field
                )));
            }
        }

        let mut out =
            Vec::with_capacity(authzid.len() + self.authcid.len() + self.passwd.len() + 2);
        out.extend_from_slice(authzid.as_bytes());
        out.push(0);
        out.extend_from_slice(self.authcid.as_bytes());
        out.push(0);
        out.extend_from_slice(self.passwd.as_bytes());
        Ok(out)
    }
}

impl fmt::Debug for SaslPlainCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslPlainCredentials")
            .field("authcid", &self.authcid)
            .field("passwd", &"<redacted>")
            .field("authzid", &self.authzid)
            .finish()
    }
}
