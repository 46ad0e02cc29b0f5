//! Validated identifiers for policy entities.
//!
//! Every identifier that crosses into the store is checked against the
//! canonical lowercase UUID shape first, so malformed input never reaches
//! a query.

use super::error::PolicyError;
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\da-f]{8}-[\da-f]{4}-[\da-f]{4}-[\da-f]{4}-[\da-f]{12}$")
        .expect("uuid pattern compiles")
});

pub fn is_uuid(s: &str) -> bool {
    UUID_RE.is_match(s)
}

/// Common surface of the entity identifiers.
pub trait PolicyId: ToSql + fmt::Display + FromStr<Err = PolicyError> {
    /// Human readable entity name used in errors.
    const KIND: &'static str;
    /// Query returning a row iff the entity exists.
    const EXISTS_SQL: &'static str;
}

macro_rules! policy_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $exists:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mints a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn parse(s: &str) -> Result<Self, PolicyError> {
                if is_uuid(s) {
                    Ok(Self(s.to_string()))
                } else {
                    Err(PolicyError::InvalidId {
                        kind: $kind,
                        value: s.to_string(),
                    })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PolicyId for $name {
            const KIND: &'static str = $kind;
            const EXISTS_SQL: &'static str = $exists;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = PolicyError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                if is_uuid(s) {
                    Ok(Self(s.to_string()))
                } else {
                    Err(FromSqlError::Other(
                        format!("stored {} ID {:?} is malformed", $kind, s).into(),
                    ))
                }
            }
        }
    };
}

policy_id!(GroupId, "group", "SELECT 1 FROM groups WHERE group_id = ?1");
policy_id!(SourceId, "source", "SELECT 1 FROM sources WHERE source_id = ?1");
policy_id!(AclId, "acl", "SELECT 1 FROM acls WHERE acl_id = ?1");
policy_id!(RuleId, "rule", "SELECT 1 FROM rules WHERE rule_id = ?1");

/// Validates a list of raw identifiers, failing on the first malformed one.
pub fn parse_ids<T: PolicyId>(raw: &[impl AsRef<str>]) -> Result<Vec<T>, PolicyError> {
    raw.iter().map(|s| s.as_ref().parse()).collect()
}

/// Zips two parallel form lists (ids and their comments) into typed pairs.
pub fn pair_with_comments<T: PolicyId>(
    ids: &[impl AsRef<str>],
    comments: &[impl AsRef<str>],
) -> Result<Vec<(T, String)>, PolicyError> {
    if ids.len() != comments.len() {
        return Err(PolicyError::Validation(format!(
            "{} list and comment list length unequal. {}={} comment={}",
            T::KIND,
            T::KIND,
            ids.len(),
            comments.len()
        )));
    }
    ids.iter()
        .zip(comments)
        .map(|(id, comment)| Ok((id.as_ref().parse()?, comment.as_ref().to_string())))
        .collect()
}
