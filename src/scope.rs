//! Preference scopes
//!
//! There are two independent roots: one for the current user and one for
//! the whole system. Each resolves to its own database and table.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    User,
    System,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::System => "system",
        }
    }

    pub fn all() -> &'static [Scope] {
        &[Scope::User, Scope::System]
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Scope::User)
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "user" | "usr" => Ok(Scope::User),
            "system" | "sys" => Ok(Scope::System),
            _ => Err(Error::Config(format!("Unknown scope: {}", s))),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scope() {
        assert_eq!("user".parse::<Scope>().unwrap(), Scope::User);
        assert_eq!("SYSTEM".parse::<Scope>().unwrap(), Scope::System);
        assert!("global".parse::<Scope>().is_err());
    }
}
