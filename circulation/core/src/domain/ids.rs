// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Opaque identifiers issued by the catalog.
//!
//! The catalog owns identity; the core never parses or generates these values
//! (the in-memory catalog adapter is the only exception). They are kept as
//! distinct newtypes so a loan id can never be passed where an item id is
//! expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// True when the identifier is empty or only whitespace.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

catalog_id!(
    /// Identifier of a library member.
    PatronId
);
catalog_id!(
    /// Identifier of a loanable catalog item.
    ItemId
);
catalog_id!(
    /// Identifier of a loan, scoped to its patron.
    LoanId
);
catalog_id!(
    /// Tenant routed through to the catalog on every call (`X-Okapi-Tenant`).
    TenantId
);
