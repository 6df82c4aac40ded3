//! Download delivery selectors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HoardError;

/// How a download is delivered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPath {
    /// Stream the blob straight from local disk
    Local,
    /// Push the blob to the remote archive and hand back its location
    StagingArea,
    /// Reserved for a third-party delivery integration
    ThirdParty,
}

impl DeliveryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPath::Local => "local",
            DeliveryPath::StagingArea => "staging-area",
            DeliveryPath::ThirdParty => "third-party",
        }
    }
}

impl fmt::Display for DeliveryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryPath {
    type Err = HoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(DeliveryPath::Local),
            "staging-area" => Ok(DeliveryPath::StagingArea),
            "third-party" => Ok(DeliveryPath::ThirdParty),
            other => Err(HoardError::validation(
                "way",
                format!("unknown delivery path '{}'", other),
            )),
        }
    }
}

/// Owner namespace for objects pushed to the remote archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveScope {
    User,
    Room,
}

impl ArchiveScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveScope::User => "user",
            ArchiveScope::Room => "room",
        }
    }
}

impl fmt::Display for ArchiveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveScope {
    type Err = HoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(ArchiveScope::User),
            "room" => Ok(ArchiveScope::Room),
            other => Err(HoardError::validation(
                "type",
                format!("'{}' is not one of user, room", other),
            )),
        }
    }
}
