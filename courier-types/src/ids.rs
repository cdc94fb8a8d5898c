//! Identifier types used throughout the Courier core.
//!
//! Documents, accounts, and resource groups are identified by opaque
//! strings. Documents minted locally get a `kind`-prefixed random id
//! (e.g. `req_1b9d6bcd...`); ids received from the server or from
//! imported data are stored verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing id string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a random id with the given prefix.
            #[must_use]
            pub fn generate(prefix: &str) -> Self {
                Self(format!("{}_{}", prefix, Uuid::new_v4().simple()))
            }

            /// Returns the id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Unique identifier for a document in the local datastore.
    /// Matches the id of the sync Resource tracking it (1:1).
    DocumentId
}

string_id! {
    /// Unique identifier for a server-side resource group.
    /// One group exists per synced workspace.
    ResourceGroupId
}

string_id! {
    /// Unique identifier for a user account.
    AccountId
}
