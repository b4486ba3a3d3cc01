//! Identifier newtypes
//!
//! Ids are opaque strings. Generated ids are short lowercase alphanumerics,
//! matching the ids already present in imported references.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random lowercase alphanumeric id of `len` characters
#[must_use]
pub fn random_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
        .collect()
}

/// Generate a random id for which `taken` returns false
///
/// `len` must be large enough for the id space not to be exhausted.
#[must_use]
pub fn unique_id(len: usize, mut taken: impl FnMut(&str) -> bool) -> String {
    loop {
        let candidate = random_id(len);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing id
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow as string slice
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// OTU document id
    OtuId
);
string_id!(
    /// Isolate id, unique within its OTU
    IsolateId
);
string_id!(
    /// Sequence id (the accession)
    SequenceId
);
string_id!(
    /// Reference (collection) id
    RefId
);
string_id!(
    /// Acting user id
    UserId
);
