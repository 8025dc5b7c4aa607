//! Small display helpers shared by the binary and the reporter.

use owo_colors::OwoColorize;
use std::path::Path;

/// Colors are on unless `NO_COLOR` is set.
pub fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Show `file` relative to the working directory when that is shorter.
pub fn display_path(file: &str) -> String {
    let path = Path::new(file);
    if !path.is_absolute() {
        return file.to_string();
    }
    std::env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(path, cwd))
        .filter(|rel| !rel.starts_with(".."))
        .map(|rel| rel.to_string_lossy().to_string())
        .unwrap_or_else(|| file.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_keeps_relative() {
        assert_eq!(display_path("x/y.html"), "x/y.html");
    }

    #[test]
    fn test_display_path_strips_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let abs = cwd.join("sub").join("a.html");
        let shown = display_path(&abs.to_string_lossy());
        assert_eq!(Path::new(&shown), Path::new("sub").join("a.html"));
    }
}
