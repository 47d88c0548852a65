//! Broadcast topics ("rooms").

use crate::principal::{Role, UnknownRole};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a free-form room name.
pub const MAX_ROOM_NAME_LEN: usize = 64;

const ROLE_PREFIX: &str = "role:";
const USER_PREFIX: &str = "user:";

/// A named broadcast channel.
///
/// The five data topics are fixed; `Role` and `User` are the implicit
/// topics every authenticated connection is placed in; anything else is a
/// free-form room such as `dashboard`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Threats,
    Fraud,
    Blockchain,
    Biometric,
    Alerts,
    Role(Role),
    User(String),
    Room(String),
}

impl Topic {
    pub fn role(role: Role) -> Self {
        Topic::Role(role)
    }

    pub fn user(id: impl Into<String>) -> Self {
        Topic::User(id.into())
    }

    /// Implicit topics are assigned by the hub and cannot be joined or left
    /// by clients.
    pub fn is_implicit(&self) -> bool {
        matches!(self, Topic::Role(_) | Topic::User(_))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Threats => f.write_str("threats"),
            Topic::Fraud => f.write_str("fraud"),
            Topic::Blockchain => f.write_str("blockchain"),
            Topic::Biometric => f.write_str("biometric"),
            Topic::Alerts => f.write_str("alerts"),
            Topic::Role(role) => write!(f, "{}{}", ROLE_PREFIX, role),
            Topic::User(id) => write!(f, "{}{}", USER_PREFIX, id),
            Topic::Room(name) => f.write_str(name),
        }
    }
}

/// Topic parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicError {
    #[error("topic name is empty")]
    Empty,
    #[error("topic name too long: {0} chars (max {MAX_ROOM_NAME_LEN})")]
    TooLong(usize),
    #[error("invalid character in topic name: {0:?}")]
    InvalidChar(char),
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TopicError::Empty);
        }
        if s.len() > MAX_ROOM_NAME_LEN {
            return Err(TopicError::TooLong(s.len()));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
        {
            return Err(TopicError::InvalidChar(c));
        }

        if let Some(role) = s.strip_prefix(ROLE_PREFIX) {
            return Ok(Topic::Role(role.parse()?));
        }
        if let Some(id) = s.strip_prefix(USER_PREFIX) {
            if id.is_empty() {
                return Err(TopicError::Empty);
            }
            return Ok(Topic::User(id.to_string()));
        }

        Ok(match s {
            "threats" => Topic::Threats,
            "fraud" => Topic::Fraud,
            "blockchain" => Topic::Blockchain,
            "biometric" => Topic::Biometric,
            "alerts" => Topic::Alerts,
            other => Topic::Room(other.to_string()),
        })
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
