//! Hub lifetime configuration
//!
//! Decides whether an application shares one hub for the whole process or
//! hands each unit of work (request, job, session) its own.

use crate::error::{Result, SignalError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long a hub handed out by a `HubProvider` lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HubLifetime {
    /// One hub shared by every scope, disposed with the provider
    #[default]
    Singleton,
    /// A fresh hub per scope, disposed when the scope ends
    Scoped,
}

impl fmt::Display for HubLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Singleton => write!(f, "singleton"),
            Self::Scoped => write!(f, "scoped"),
        }
    }
}

impl FromStr for HubLifetime {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Self::Singleton),
            "scoped" => Ok(Self::Scoped),
            other => Err(SignalError::Config(format!(
                "'{}' hub lifetime is not supported (expected 'singleton' or 'scoped')",
                other
            ))),
        }
    }
}

/// Event hub configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    /// Hub lifetime
    #[serde(default)]
    pub lifetime: HubLifetime,
}

impl HubConfig {
    /// One process-wide hub
    pub fn singleton() -> Self {
        Self {
            lifetime: HubLifetime::Singleton,
        }
    }

    /// One hub per scope
    pub fn scoped() -> Self {
        Self {
            lifetime: HubLifetime::Scoped,
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
