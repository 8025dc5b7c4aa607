//! Bundled analyzer for HTML and JavaScript sources.
//!
//! For every file reached from an input it:
//! - applies the run policy's banned name/property/pattern rules;
//! - checks that HTML imports (`<link rel="import">`, `<script src>`) resolve,
//!   falling back to the dependency directory for `../pkg/...` references.
//!
//! Files of one input are checked in parallel; results are returned in path
//! order and, within a file, in source order.

use super::Analyzer;
use crate::error::AnalyzerError;
use crate::guard::FailureSink;
use crate::models::{RunConfig, Warning};
use async_trait::async_trait;
use glob::glob;
use rayon::prelude::*;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

const EXTENSIONS: [&str; 3] = ["html", "htm", "js"];

#[derive(Debug, Default, Clone, Copy)]
pub struct SourceAnalyzer;

impl SourceAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Analyzer for SourceAnalyzer {
    async fn analyze(
        &self,
        input: &str,
        config: &RunConfig,
        _failures: &FailureSink,
    ) -> Result<Vec<Warning>, AnalyzerError> {
        let resolved = config.resolve(input);
        let config = config.clone();
        tokio::task::spawn_blocking(move || scan_input(&resolved, &config))
            .await
            .map_err(|e| AnalyzerError::Task(e.to_string()))?
    }
}

/// Analyze one resolved input path synchronously.
pub fn scan_input(path: &str, config: &RunConfig) -> Result<Vec<Warning>, AnalyzerError> {
    let p = Path::new(path);
    if !p.exists() {
        return Err(AnalyzerError::NotFound(path.to_string()));
    }
    let targets = if p.is_dir() {
        collect_targets(p, &config.redirect)
    } else {
        vec![p.to_path_buf()]
    };
    debug!(input = path, files = targets.len(), "analyzing");

    let per_file: Vec<Vec<Warning>> = targets
        .par_iter()
        .map(|file| lint_file(file, config))
        .collect::<Result<_, _>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

/// Source files under `dir`, sorted, skipping the dependency directory.
fn collect_targets(dir: &Path, redirect: &str) -> Vec<PathBuf> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut targets: Vec<PathBuf> = Vec::new();
    for ext in EXTENSIONS {
        let pattern = format!("{base}/**/*.{ext}");
        let entries = match glob(&pattern) {
            Ok(e) => e,
            Err(e) => {
                debug!("bad glob pattern {pattern}: {e}");
                continue;
            }
        };
        for entry in entries.flatten() {
            let rel = entry.strip_prefix(dir).unwrap_or(&entry);
            let in_deps = !redirect.is_empty()
                && rel.components().any(|c| c.as_os_str() == redirect);
            if !in_deps && entry.is_file() {
                targets.push(entry);
            }
        }
    }
    targets.sort();
    targets.dedup();
    targets
}

fn lint_file(file: &Path, config: &RunConfig) -> Result<Vec<Warning>, AnalyzerError> {
    let text = fs::read_to_string(file).map_err(|source| AnalyzerError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    let filename = file.to_string_lossy().to_string();
    let rel = filename
        .strip_prefix(config.root.as_str())
        .unwrap_or(&filename)
        .to_string();
    let mut found: Vec<(usize, Warning)> = Vec::new();

    if let Some(policy) = config.policy.as_ref() {
        for rule in &policy.rules {
            if !(rule.applies_to(&filename) && rule.applies_to(&rel)) {
                continue;
            }
            for hit in rule.find_in(&text) {
                let (line, column) = line_col(&text, hit.offset);
                found.push((
                    hit.offset,
                    Warning::new(&filename, line, column, rule.message_for(hit.value), rule.fatal),
                ));
            }
        }
    }

    if is_html(file) {
        let dir = file.parent().unwrap_or_else(|| Path::new(""));
        for (offset, href) in html_imports(&text) {
            if !import_resolves(dir, &href, config) {
                let (line, column) = line_col(&text, offset);
                found.push((
                    offset,
                    Warning::new(
                        &filename,
                        line,
                        column,
                        format!("Unable to resolve import: {href}"),
                        true,
                    ),
                ));
            }
        }
    }

    found.sort_by_key(|(offset, _)| *offset);
    Ok(found.into_iter().map(|(_, w)| w).collect())
}

fn is_html(file: &Path) -> bool {
    matches!(
        file.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("html") | Some("htm")
    )
}

fn tag_regexes() -> &'static (Regex, Regex, Regex, Regex, Regex, Regex) {
    static RES: OnceLock<(Regex, Regex, Regex, Regex, Regex, Regex)> = OnceLock::new();
    RES.get_or_init(|| {
        let build = |s: &str| Regex::new(s).expect("static regex");
        // Attribute names must follow whitespace so `data-src=` is not `src=`.
        (
            build(r"(?s)<!--.*?-->"),
            build(r"(?is)<link\b[^>]*>"),
            build(r#"(?i)\srel\s*=\s*["']?import["']?"#),
            build(r#"(?i)\shref\s*=\s*["']([^"']+)["']"#),
            build(r"(?is)<script\b[^>]*>"),
            build(r#"(?i)\ssrc\s*=\s*["']([^"']+)["']"#),
        )
    })
}

/// Replace HTML comments with spaces, keeping newlines and byte offsets.
fn blank_comments(text: &str, comment: &Regex) -> String {
    let mut out = text.to_string();
    for m in comment.find_iter(text) {
        let blank: String = m
            .as_str()
            .chars()
            .map(|c| if c == '\n' { "\n".to_string() } else { " ".repeat(c.len_utf8()) })
            .collect();
        out.replace_range(m.range(), &blank);
    }
    out
}

/// `(byte offset, reference)` of every import-like reference in `text`.
fn html_imports(text: &str) -> Vec<(usize, String)> {
    let (comment, link, rel_import, href, script, src) = tag_regexes();
    let masked = blank_comments(text, comment);
    let text = masked.as_str();
    let mut out = Vec::new();
    for tag in link.find_iter(text) {
        let t = tag.as_str();
        if !rel_import.is_match(t) {
            continue;
        }
        if let Some(c) = href.captures(t).and_then(|c| c.get(1)) {
            out.push((tag.start() + c.start(), c.as_str().to_string()));
        }
    }
    for tag in script.find_iter(text) {
        if let Some(c) = src.captures(tag.as_str()).and_then(|c| c.get(1)) {
            out.push((tag.start() + c.start(), c.as_str().to_string()));
        }
    }
    out.sort_by_key(|(offset, _)| *offset);
    out
}

fn is_external(href: &str) -> bool {
    href.contains("://")
        || href.starts_with("//")
        || href.starts_with("data:")
        || href.starts_with('#')
        || href.contains("{{")
        || href.contains("[[")
}

/// Whether `href`, referenced from a file in `dir`, points at an existing file.
fn import_resolves(dir: &Path, href: &str, config: &RunConfig) -> bool {
    if is_external(href) {
        return true;
    }
    let clean = href.split(['?', '#']).next().unwrap_or(href);
    if clean.is_empty() {
        return true;
    }
    let direct = match clean.strip_prefix('/') {
        Some(abs) => PathBuf::from(format!("{}{}", config.root, abs)),
        None => dir.join(clean),
    };
    if direct.exists() {
        return true;
    }
    if config.redirect.is_empty() || !clean.starts_with("../") {
        return false;
    }
    let mut rest = clean;
    while let Some(r) = rest.strip_prefix("../") {
        rest = r;
    }
    let redirected = PathBuf::from(format!("{}{}/{}", config.root, config.redirect, rest));
    debug!(href, target = %redirected.display(), "trying dependency directory");
    redirected.exists()
}

/// 1-based line and column (in chars) of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
