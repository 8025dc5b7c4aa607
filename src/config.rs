//! Configuration discovery and effective settings resolution.
//!
//! lintrun reads `lintrun.toml|yaml|yml` from the working directory (or the
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `bowerdir`: `bower_components`
//! - `root`: empty (working directory)
//! - `policy`: none
//! - `output`: `human`
//!
//! Overrides precedence: CLI > config file > defaults. A `policy` path from a
//! config file is relative to that file's directory.

use crate::error::ConfigError;
use crate::reporter::OutputMode;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_BOWERDIR: &str = "bower_components";
const CONFIG_NAMES: [&str; 3] = ["lintrun.toml", "lintrun.yaml", "lintrun.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `lintrun.toml|yaml`.
pub struct LintrunConfig {
    pub bowerdir: Option<String>,
    pub policy: Option<String>,
    pub root: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, Default)]
/// CLI values that participate in precedence resolution.
pub struct CliOverrides<'a> {
    pub bowerdir: Option<&'a str>,
    pub policy: Option<&'a str>,
    pub root: Option<&'a str>,
    pub output: Option<&'a str>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration after applying precedence.
pub struct Effective {
    pub redirect: String,
    pub policy: Option<PathBuf>,
    pub root: Option<String>,
    pub output: OutputMode,
    /// Config file that contributed values, if any.
    pub source: Option<PathBuf>,
}

/// Walk upward from `start` looking for a config file.
///
/// Stops at the first directory holding a `lintrun.*` file or a `.git`
/// directory; returns the config file path when one is found.
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut cur = start;
    loop {
        for name in CONFIG_NAMES {
            let p = cur.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
        if cur.join(".git").exists() {
            return None;
        }
        cur = cur.parent()?;
    }
}

/// Load a config file, parsing YAML for `.yaml|.yml` and TOML otherwise.
pub fn load_config(path: &Path) -> Result<LintrunConfig, ConfigError> {
    let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        serde_yaml::from_str::<LintrunConfig>(&s).map_err(|e| e.to_string())
    } else {
        toml::from_str::<LintrunConfig>(&s).map_err(|e| e.to_string())
    };
    parsed.map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Locate and load the config for this run.
///
/// An explicit path must load; a discovered file that fails to load is
/// skipped with a warning.
pub fn find_config(
    explicit: Option<&Path>,
    start: &Path,
) -> Result<Option<(PathBuf, LintrunConfig)>, ConfigError> {
    if let Some(p) = explicit {
        return load_config(p).map(|c| Some((p.to_path_buf(), c)));
    }
    let Some(found) = discover_config(start) else {
        return Ok(None);
    };
    match load_config(&found) {
        Ok(c) => Ok(Some((found, c))),
        Err(e) => {
            warn!("ignoring config: {e}");
            Ok(None)
        }
    }
}

/// Resolve `Effective` by merging CLI flags, a loaded config, and defaults.
pub fn resolve_effective(cli: &CliOverrides<'_>, cfg: Option<(PathBuf, LintrunConfig)>) -> Effective {
    let (source, cfg) = match cfg {
        Some((p, c)) => (Some(p), c),
        None => (None, LintrunConfig::default()),
    };
    let cfg_dir = source
        .as_ref()
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let redirect = cli
        .bowerdir
        .map(str::to_string)
        .or(cfg.bowerdir)
        .unwrap_or_else(|| DEFAULT_BOWERDIR.to_string());

    let policy = match cli.policy {
        Some(p) => Some(PathBuf::from(p)),
        None => cfg.policy.map(|p| cfg_dir.join(p)),
    };

    let root = cli.root.map(str::to_string).or(cfg.root);

    let output_raw = cli.output.map(str::to_string).or(cfg.output);
    let output = match output_raw.as_deref() {
        None => OutputMode::Human,
        Some(s) => OutputMode::parse(s).unwrap_or_else(|| {
            warn!("unknown output mode '{s}', using human");
            OutputMode::Human
        }),
    };

    debug!(?source, redirect = %redirect, "effective configuration");
    Effective {
        redirect,
        policy,
        root,
        output,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_discover_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        let mut f = fs::File::create(root.join("lintrun.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
bowerdir = "deps"
policy = "conf/policy.json"
output = "json"
    "#
        )
        .unwrap();

        let found = find_config(None, &root.join("a/b")).unwrap();
        let eff = resolve_effective(&CliOverrides::default(), found);
        assert_eq!(eff.redirect, "deps");
        assert_eq!(eff.policy, Some(root.join("conf/policy.json")));
        assert_eq!(eff.output, OutputMode::Json);
        assert_eq!(eff.source, Some(root.join("lintrun.toml")));
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("lintrun.yaml"), "root: app\n").unwrap();

        let found = find_config(None, root).unwrap();
        let eff = resolve_effective(&CliOverrides::default(), found);
        assert_eq!(eff.root.as_deref(), Some("app"));
        assert_eq!(eff.redirect, DEFAULT_BOWERDIR);
        assert!(eff.policy.is_none());
        assert_eq!(eff.output, OutputMode::Human);
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("lintrun.toml"),
            "bowerdir = \"deps\"\nroot = \"cfgroot\"\npolicy = \"p.json\"\n",
        )
        .unwrap();
        let cli = CliOverrides {
            bowerdir: Some("vendor"),
            policy: Some("cli.json"),
            root: Some("cliroot"),
            output: None,
        };
        let eff = resolve_effective(&cli, find_config(None, root).unwrap());
        assert_eq!(eff.redirect, "vendor");
        assert_eq!(eff.root.as_deref(), Some("cliroot"));
        assert_eq!(eff.policy, Some(PathBuf::from("cli.json")));
    }

    #[test]
    fn test_discovery_stops_at_git_root() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("lintrun.toml"), "bowerdir = \"outer\"\n").unwrap();
        fs::create_dir_all(root.join("repo/.git")).unwrap();
        assert!(discover_config(&root.join("repo")).is_none());
    }

    #[test]
    fn test_explicit_config_errors_surface() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            find_config(Some(&missing), dir.path()),
            Err(ConfigError::Io { .. })
        ));
        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "bowerdir = [").unwrap();
        assert!(matches!(
            find_config(Some(&bad), dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_malformed_discovered_config_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("lintrun.toml"), "bowerdir = [").unwrap();
        assert!(find_config(None, dir.path()).unwrap().is_none());
    }
}
