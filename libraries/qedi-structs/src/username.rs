use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

/// Allowed username length, counted in characters. The contract's registry
/// enforces the same bound.
pub const USERNAME_LENGTH: RangeInclusive<usize> = 3..=20;

/// A profile username. Case-sensitive; uniqueness is enforced on-chain.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(SmolStr);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("username must be {min}-{max} characters, got {length}", min = USERNAME_LENGTH.start(), max = USERNAME_LENGTH.end())]
pub struct UsernameError {
    pub length: usize,
}

impl Username {
    pub fn parse(username: impl AsRef<str>) -> Result<Self, UsernameError> {
        let username = username.as_ref();
        check_length(username)?;
        Ok(Self(SmolStr::new(username)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_length(username: &str) -> Result<(), UsernameError> {
    let length = username.chars().count();
    if !USERNAME_LENGTH.contains(&length) {
        return Err(UsernameError { length });
    }
    Ok(())
}

impl FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<SmolStr> for Username {
    type Error = UsernameError;

    fn try_from(value: SmolStr) -> Result<Self, Self::Error> {
        check_length(value.as_str())?;
        Ok(Self(value))
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = SmolStr::deserialize(deserializer)?;
        Username::try_from(value).map_err(serde::de::Error::custom)
    }
}
