//! Credential bundle used to authenticate every API call.
//!
//! The bundle is a subset of the browser cookies issued after login. Only the
//! session key and the csrf token are required; the account id is needed for
//! listing relations and the checksum cookie is forwarded when present.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const SESSION_KEY: &str = "SESSDATA";
pub const CSRF_TOKEN: &str = "bili_jct";
pub const ACCOUNT_ID: &str = "DedeUserID";
pub const ACCOUNT_CHECKSUM: &str = "DedeUserID__ckMd5";

/// Named tokens taken from the authenticated browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    #[serde(rename = "SESSDATA", default)]
    pub sessdata: String,
    #[serde(rename = "bili_jct", default)]
    pub bili_jct: String,
    #[serde(rename = "DedeUserID", default)]
    pub dede_user_id: String,
    #[serde(
        rename = "DedeUserID__ckMd5",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub dede_user_id_ckmd5: Option<String>,
}

impl CredentialBundle {
    /// Build a bundle from `(name, value)` cookie pairs, ignoring unknown names.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut bundle = Self::default();
        for (name, value) in pairs {
            let value = value.trim().to_string();
            match name.trim() {
                SESSION_KEY => bundle.sessdata = value,
                CSRF_TOKEN => bundle.bili_jct = value,
                ACCOUNT_ID => bundle.dede_user_id = value,
                ACCOUNT_CHECKSUM => bundle.dede_user_id_ckmd5 = Some(value),
                _ => {}
            }
        }
        bundle
    }

    /// Parse a `Cookie` header style string (`a=1; b=2`).
    pub fn from_cookie_header(header: &str) -> Self {
        Self::from_pairs(
            header
                .split(';')
                .filter_map(|part| part.split_once('=')),
        )
    }

    /// Both required tokens are present.
    pub fn is_complete(&self) -> bool {
        !self.sessdata.is_empty() && !self.bili_jct.is_empty()
    }

    /// Reject bundles that cannot authenticate a call.
    pub fn validate(&self) -> Result<()> {
        if self.sessdata.is_empty() {
            return Err(Error::ConfigMalformed(format!(
                "cookie {SESSION_KEY} is empty"
            )));
        }
        if self.bili_jct.is_empty() {
            return Err(Error::ConfigMalformed(format!("cookie {CSRF_TOKEN} is empty")));
        }
        Ok(())
    }

    /// Render the bundle as a `Cookie` header value.
    pub fn cookie_header(&self) -> String {
        let mut parts = vec![
            format!("{SESSION_KEY}={}", self.sessdata),
            format!("{CSRF_TOKEN}={}", self.bili_jct),
        ];
        if !self.dede_user_id.is_empty() {
            parts.push(format!("{ACCOUNT_ID}={}", self.dede_user_id));
        }
        if let Some(ref checksum) = self.dede_user_id_ckmd5 {
            parts.push(format!("{ACCOUNT_CHECKSUM}={}", checksum));
        }
        parts.join("; ")
    }
}
