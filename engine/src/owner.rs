//! Owner identity as seen by the sync core.

use crate::OwnerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who the local caches belong to.
///
/// `Anonymous` caches are local only: nothing is ever sent to the remote store
/// on their behalf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Owner {
    #[default]
    Anonymous,
    User(OwnerId),
}

impl Owner {
    /// Owner for a signed-in user. Empty ids are treated as anonymous.
    pub fn user(id: impl Into<OwnerId>) -> Self {
        let id = id.into();
        if id.is_empty() {
            Owner::Anonymous
        } else {
            Owner::User(id)
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Owner::Anonymous)
    }

    /// The remote owner id, if signed in.
    pub fn id(&self) -> Option<&OwnerId> {
        match self {
            Owner::Anonymous => None,
            Owner::User(id) => Some(id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Anonymous => f.write_str("anonymous"),
            Owner::User(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_anonymous() {
        assert_eq!(Owner::user(""), Owner::Anonymous);
        assert!(Owner::user("").is_anonymous());
        assert_eq!(Owner::user("u1").id().map(String::as_str), Some("u1"));
    }

    #[test]
    fn display() {
        assert_eq!(Owner::Anonymous.to_string(), "anonymous");
        assert_eq!(Owner::user("u1").to_string(), "u1");
    }
}
