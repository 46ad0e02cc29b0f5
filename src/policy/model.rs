use super::error::PolicyError;
use super::ids::{AclId, GroupId, RuleId, SourceId};
use regex::Regex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub source_id: SourceId,
    pub source: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    pub group_id: GroupId,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acl {
    pub acl_id: AclId,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub rule_id: RuleId,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub value: String,
    pub action: RuleAction,
    pub comment: String,
}

/// How a rule's value is matched against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleType {
    Domain,
    HttpsDomain,
    Exact,
    Regex,
}

/// What the proxy does with a matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Block,
    Ignore,
}

impl RuleType {
    pub const ALL: [RuleType; 4] = [
        RuleType::Domain,
        RuleType::HttpsDomain,
        RuleType::Regex,
        RuleType::Exact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleType::Domain => "domain",
            RuleType::HttpsDomain => "https-domain",
            RuleType::Exact => "exact",
            RuleType::Regex => "regex",
        }
    }
}

impl RuleAction {
    pub const ALL: [RuleAction; 3] = [RuleAction::Allow, RuleAction::Block, RuleAction::Ignore];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Block => "block",
            RuleAction::Ignore => "ignore",
        }
    }
}

impl FromStr for RuleType {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| PolicyError::Validation(format!("unknown rule type {s:?}")))
    }
}

impl FromStr for RuleAction {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| PolicyError::Validation(format!("unknown rule action {s:?}")))
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RuleType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl ToSql for RuleAction {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RuleType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PolicyError| FromSqlError::Other(Box::new(e)))
    }
}

impl FromSql for RuleAction {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: PolicyError| FromSqlError::Other(Box::new(e)))
    }
}

/// The editable fields of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFields {
    pub rule_type: RuleType,
    pub value: String,
    pub action: RuleAction,
    pub comment: String,
}

impl RuleFields {
    pub fn new(rule_type: RuleType, value: impl Into<String>, action: RuleAction) -> Self {
        Self {
            rule_type,
            value: value.into(),
            action,
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PolicyError> {
        super::error::require_non_empty(&self.value, "rule value")?;
        if self.rule_type == RuleType::Regex {
            Regex::new(&self.value)
                .map_err(|e| PolicyError::Validation(format!("invalid regex rule: {e}")))?;
        }
        Ok(())
    }
}
