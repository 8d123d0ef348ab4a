//! Remote object types and the operations that apply to them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    Email,
    List,
    Opportunity,
    Prospect,
    ProspectAccount,
    User,
    Visit,
    Visitor,
}

impl ObjectType {
    pub const ALL: [ObjectType; 8] = [
        ObjectType::Email,
        ObjectType::List,
        ObjectType::Opportunity,
        ObjectType::Prospect,
        ObjectType::ProspectAccount,
        ObjectType::User,
        ObjectType::Visit,
        ObjectType::Visitor,
    ];

    /// Path segment and payload key used by the API
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Email => "email",
            ObjectType::List => "list",
            ObjectType::Opportunity => "opportunity",
            ObjectType::Prospect => "prospect",
            ObjectType::ProspectAccount => "prospectAccount",
            ObjectType::User => "user",
            ObjectType::Visit => "visit",
            ObjectType::Visitor => "visitor",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown object type: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Undelete,
    Query,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Undelete,
        Operation::Query,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Undelete => "undelete",
            Operation::Query => "query",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown operation: {}", s))
    }
}
