//! Validator identity.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};

/// A validator identity, as registered on chain.
///
/// This is an opaque handle (typically an ss58 hotkey or a hex address); the
/// core never interprets its contents beyond equality and ordering.
#[derive(Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidatorId(String);

impl ValidatorId {
    /// Constructs a validator id from its string form.
    pub fn new<S: Into<String>>(hotkey: S) -> Self {
        Self(hotkey.into())
    }

    /// The string form of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ValidatorId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for ValidatorId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "ValidatorId({})", self.0)
    }
}

impl From<&str> for ValidatorId {
    fn from(hotkey: &str) -> Self {
        Self(hotkey.to_string())
    }
}

impl From<String> for ValidatorId {
    fn from(hotkey: String) -> Self {
        Self(hotkey)
    }
}

impl AsRef<str> for ValidatorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
