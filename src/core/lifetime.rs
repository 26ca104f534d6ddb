use crate::core::error_modular::ModularError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How long a resolved capability instance lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// One instance per inbound request.
    Scoped,
    /// One instance for the whole process, created on first resolution.
    Singleton,
    /// A new instance on every resolution.
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}

impl TryFrom<&str> for Lifetime {
    type Error = ModularError;

    fn try_from(value: &str) -> Result<Self, ModularError> {
        match value.trim().to_lowercase().as_str() {
            "scoped" | "per-request" => Ok(Lifetime::Scoped),
            "singleton" | "shared" => Ok(Lifetime::Singleton),
            "transient" => Ok(Lifetime::Transient),
            _ => Err(ModularError::InvalidLifetime(value.to_string())),
        }
    }
}

impl TryFrom<String> for Lifetime {
    type Error = ModularError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl FromStr for Lifetime {
    type Err = ModularError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}
