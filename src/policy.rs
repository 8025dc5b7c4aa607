//! Policy loading and compilation.
//!
//! The loader reads an optional policy file once per run, parses it as JSON,
//! TOML or YAML depending on the extension, and converts its requirements into
//! a compiled [`Policy`]. Every analyzer invocation of the run shares the
//! result through an `Arc`.

use crate::error::{PolicyLoadError, RequirementError};
use crate::models::policy::{PolicyDocument, Requirement};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    BannedName,
    BannedProperty,
    BannedPattern,
}

impl RuleKind {
    fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_uppercase().as_str() {
            "BANNED_NAME" => Some(Self::BannedName),
            "BANNED_PROPERTY" => Some(Self::BannedProperty),
            "BANNED_PATTERN" | "BANNED_CODE_PATTERN" => Some(Self::BannedPattern),
            _ => None,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::BannedName => "name",
            Self::BannedProperty => "property",
            Self::BannedPattern => "pattern",
        }
    }
}

#[derive(Debug, Clone)]
/// A validated requirement ready for matching.
pub struct Rule {
    pub kind: RuleKind,
    matchers: Vec<(String, Regex)>,
    message: Option<String>,
    whitelist: Vec<glob::Pattern>,
    pub fatal: bool,
}

/// One hit of a rule inside a text.
pub struct RuleMatch<'a> {
    pub offset: usize,
    pub value: &'a str,
}

impl Rule {
    /// Whether this rule should be checked for the given file path.
    pub fn applies_to(&self, file: &str) -> bool {
        let norm = file.replace('\\', "/");
        !self.whitelist.iter().any(|p| p.matches(&norm))
    }

    /// All hits in `text`, ordered by offset.
    pub fn find_in<'a>(&'a self, text: &str) -> Vec<RuleMatch<'a>> {
        let mut hits: Vec<RuleMatch<'a>> = Vec::new();
        for (value, re) in &self.matchers {
            for m in re.find_iter(text) {
                let offset = match self.kind {
                    // Report the property name, not the leading dot.
                    RuleKind::BannedProperty => m.start() + m.as_str().find(value.as_str()).unwrap_or(0),
                    _ => m.start(),
                };
                hits.push(RuleMatch {
                    offset,
                    value: value.as_str(),
                });
            }
        }
        hits.sort_by_key(|h| h.offset);
        hits
    }

    pub fn message_for(&self, value: &str) -> String {
        match &self.message {
            Some(m) => m.clone(),
            None => format!("Use of banned {} '{}'", self.kind.describe(), value),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Compiled rule set derived from a policy document.
pub struct Policy {
    pub rules: Vec<Rule>,
}

impl Policy {
    /// Convert a parsed document into a policy, validating every requirement.
    pub fn from_requirements(doc: &PolicyDocument) -> Result<Policy, RequirementError> {
        let rules = doc
            .requirements
            .iter()
            .enumerate()
            .map(|(index, req)| compile_requirement(index, req))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Policy { rules })
    }
}

fn compile_requirement(index: usize, req: &Requirement) -> Result<Rule, RequirementError> {
    let kind = RuleKind::parse(&req.kind).ok_or_else(|| RequirementError::UnknownType {
        index,
        kind: req.kind.clone(),
    })?;
    if req.value.is_empty() {
        return Err(RequirementError::EmptyValue {
            index,
            kind: req.kind.clone(),
        });
    }
    let fatal = match req.level.as_deref().map(str::trim) {
        None | Some("error") => true,
        Some("warning") | Some("warn") => false,
        Some(other) => {
            return Err(RequirementError::Level {
                index,
                level: other.to_string(),
            })
        }
    };
    let mut matchers = Vec::with_capacity(req.value.len());
    for value in &req.value {
        let source = match kind {
            RuleKind::BannedName => format!(r"\b{}\b", regex::escape(value)),
            RuleKind::BannedProperty => format!(r"\.\s*{}\b", regex::escape(value)),
            RuleKind::BannedPattern => value.clone(),
        };
        let re = Regex::new(&source).map_err(|source| RequirementError::Pattern {
            index,
            pattern: value.clone(),
            source,
        })?;
        matchers.push((value.clone(), re));
    }
    let whitelist = req
        .whitelist
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| RequirementError::Whitelist {
                index,
                pattern: p.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Rule {
        kind,
        matchers,
        message: req.error_message.clone(),
        whitelist,
        fatal,
    })
}

/// Parse a policy document, choosing the format from the file extension.
pub fn parse_document(path: &Path, text: &str) -> Result<PolicyDocument, PolicyLoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let parsed = match ext.as_str() {
        "toml" => toml::from_str::<PolicyDocument>(text).map_err(|e| e.to_string()),
        "yaml" | "yml" => serde_yaml::from_str::<PolicyDocument>(text).map_err(|e| e.to_string()),
        _ => serde_json::from_str::<PolicyDocument>(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| PolicyLoadError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Load the run's shared policy.
///
/// Without a path this resolves to `None` without touching the filesystem.
pub async fn load_policy(path: Option<&Path>) -> Result<Option<Arc<Policy>>, PolicyLoadError> {
    let Some(path) = path else {
        return Ok(None);
    };
    debug!(path = %path.display(), "loading policy");
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PolicyLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let doc = parse_document(path, &text)?;
    let policy = Policy::from_requirements(&doc).map_err(|source| PolicyLoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(rules = policy.rules.len(), "policy ready");
    Ok(Some(Arc::new(policy)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn req(kind: &str, value: &[&str]) -> Requirement {
        Requirement {
            kind: kind.into(),
            value: value.iter().map(|s| s.to_string()).collect(),
            error_message: None,
            whitelist: Vec::new(),
            level: None,
        }
    }

    #[tokio::test]
    async fn test_no_path_yields_none() {
        let p = load_policy(None).await.unwrap();
        assert!(p.is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing-file.json");
        let err = load_policy(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, PolicyLoadError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("policy.json");
        fs::write(&p, "{ \"requirements\": [").unwrap();
        let err = load_policy(Some(&p)).await.unwrap_err();
        assert!(matches!(err, PolicyLoadError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_invalid_requirement_is_policy_error() {
        let dir = tempdir().unwrap();
        let p = dir.path().join("policy.json");
        fs::write(&p, r#"{"requirements":[{"type":"BANNED_WHATEVER","value":["x"]}]}"#).unwrap();
        let err = load_policy(Some(&p)).await.unwrap_err();
        assert!(matches!(
            err,
            PolicyLoadError::Invalid {
                source: RequirementError::UnknownType { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_loads_toml_and_yaml() {
        let dir = tempdir().unwrap();
        let t = dir.path().join("policy.toml");
        fs::write(
            &t,
            r#"
[[requirements]]
type = "BANNED_NAME"
value = ["eval"]
level = "warning"
"#,
        )
        .unwrap();
        let pol = load_policy(Some(&t)).await.unwrap().unwrap();
        assert_eq!(pol.rules.len(), 1);
        assert!(!pol.rules[0].fatal);

        let y = dir.path().join("policy.yml");
        fs::write(
            &y,
            "requirements:\n  - type: BANNED_PROPERTY\n    value: [innerHTML]\n",
        )
        .unwrap();
        let pol = load_policy(Some(&y)).await.unwrap().unwrap();
        assert_eq!(pol.rules[0].kind, RuleKind::BannedProperty);
        assert!(pol.rules[0].fatal);
    }

    #[test]
    fn test_conversion_failures() {
        let doc = PolicyDocument {
            requirements: vec![req("BANNED_NAME", &[])],
        };
        assert!(matches!(
            Policy::from_requirements(&doc),
            Err(RequirementError::EmptyValue { .. })
        ));
        let doc = PolicyDocument {
            requirements: vec![req("BANNED_PATTERN", &["(unclosed"])],
        };
        assert!(matches!(
            Policy::from_requirements(&doc),
            Err(RequirementError::Pattern { .. })
        ));
        let mut bad_level = req("BANNED_NAME", &["eval"]);
        bad_level.level = Some("loud".into());
        let doc = PolicyDocument {
            requirements: vec![bad_level],
        };
        assert!(matches!(
            Policy::from_requirements(&doc),
            Err(RequirementError::Level { .. })
        ));
    }

    #[test]
    fn test_rule_matching_and_whitelist() {
        let mut r = req("BANNED_NAME", &["eval"]);
        r.whitelist = vec!["vendor/**".into()];
        let mut p = req("BANNED_PROPERTY", &["innerHTML"]);
        p.error_message = Some("no innerHTML".into());
        let doc = PolicyDocument {
            requirements: vec![r, p],
        };
        let pol = Policy::from_requirements(&doc).unwrap();

        let name = &pol.rules[0];
        let hits = name.find_in("var x = eval(y); evaluate(z);");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, 8);
        assert!(name.applies_to("src/a.js"));
        assert!(!name.applies_to("vendor/lib/a.js"));
        assert_eq!(name.message_for("eval"), "Use of banned name 'eval'");

        let prop = &pol.rules[1];
        let hits = prop.find_in("el.innerHTML = s; innerHTML = 1;");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, 3);
        assert_eq!(prop.message_for("innerHTML"), "no innerHTML");
    }
}
