//! Policy document schema consumed by the policy loader.
//!
//! A document is a list of requirements, each banning a name, a property
//! access, or a raw pattern. Documents may be written in JSON, TOML or YAML;
//! all three deserialize into the same shape.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize, Clone)]
/// Root policy document.
pub struct PolicyDocument {
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

#[derive(Debug, Deserialize, Clone)]
/// One requirement entry before validation.
pub struct Requirement {
    /// BANNED_NAME | BANNED_PROPERTY | BANNED_PATTERN
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Vec<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Glob patterns of files exempt from this requirement.
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub level: Option<String>, // error|warning (error is fatal)
}
