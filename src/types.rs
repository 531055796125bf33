use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Relation change sent to the modify endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationAction {
    Follow,
    Unfollow,
}

impl RelationAction {
    /// The `act` discriminator the API expects
    pub fn code(self) -> u8 {
        match self {
            Self::Follow => 1,
            Self::Unfollow => 2,
        }
    }
}

impl fmt::Display for RelationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Follow => write!(f, "follow"),
            Self::Unfollow => write!(f, "unfollow"),
        }
    }
}

/// Common `{code, message, data}` wrapper of every API response.
///
/// `data` stays untyped until the code has been checked, since rejected
/// responses carry a different payload shape.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Envelope {
    /// Parse a response body, failing with `MalformedResponse` on shape errors.
    pub fn parse(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Fail with `RemoteRejected` unless the result code is 0.
    pub fn check(self) -> Result<Self> {
        if self.code != 0 {
            return Err(Error::RemoteRejected {
                code: self.code,
                message: self.message,
            });
        }
        Ok(self)
    }

    /// Typed payload of a successful response.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        let data = self
            .check()?
            .data
            .ok_or_else(|| Error::MalformedResponse("missing data field".into()))?;
        serde_json::from_value(data).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

/// One followed account. Fields beyond id and name are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub mid: u64,
    pub uname: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RelationRecord {
    pub fn new(mid: u64, uname: impl Into<String>) -> Self {
        Self {
            mid,
            uname: uname.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// `data` of the followings endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct FollowingPage {
    #[serde(default)]
    list: Option<Vec<RelationRecord>>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl FollowingPage {
    pub fn into_list(self) -> Vec<RelationRecord> {
        self.list.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelInfo {
    pub current_level: u32,
}

/// `data` of the nav endpoint for the logged-in account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub mid: u64,
    pub uname: String,
    #[serde(default)]
    pub money: Option<f64>,
    #[serde(default)]
    pub level_info: Option<LevelInfo>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserInfo {
    pub fn level(&self) -> u32 {
        self.level_info.as_ref().map(|l| l.current_level).unwrap_or(0)
    }
}
