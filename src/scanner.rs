use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub classes: Vec<String>,
    pub files_scanned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanError {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanGlobOptions {
    pub base_path: PathBuf,
    pub respect_gitignore: bool,
    pub include_node_modules: bool,
}

impl Default for ScanGlobOptions {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            respect_gitignore: true,
            include_node_modules: false,
        }
    }
}

pub fn scan(paths: &[PathBuf]) -> Result<ScanResult, ScanError> {
    let mut classes = Vec::new();
    let mut seen = HashSet::new();
    let mut files_scanned = 0;

    for path in paths {
        scan_path(path, &mut classes, &mut seen, &mut files_scanned)?;
    }

    Ok(ScanResult {
        classes,
        files_scanned,
    })
}

pub fn scan_globs_with_options(
    patterns: &[String],
    ignore_patterns: &[String],
    options: &ScanGlobOptions,
) -> Result<ScanResult, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError {
            message: "scan requires at least one glob pattern".to_string(),
        });
    }

    let globset = build_globset(patterns)?;
    let ignore_set = build_globset(ignore_patterns)?;
    let paths = collect_paths(&globset, &ignore_set, options);

    scan(&paths)
}

/// Scans each pattern from its own literal root, so absolute and nested
/// patterns work without a shared base path.
pub fn scan_patterns(
    patterns: &[String],
    ignore_patterns: &[String],
) -> Result<ScanResult, ScanError> {
    if patterns.is_empty() {
        return Err(ScanError {
            message: "scan requires at least one glob pattern".to_string(),
        });
    }

    let ignore_set = build_globset(ignore_patterns)?;
    let mut groups = BTreeMap::<PathBuf, Vec<String>>::new();
    for pattern in patterns {
        groups
            .entry(glob_root(pattern))
            .or_default()
            .push(pattern.clone());
    }

    let mut paths = Vec::new();
    let mut seen = HashSet::new();
    for (root, group) in groups {
        let options = ScanGlobOptions {
            base_path: root,
            ..ScanGlobOptions::default()
        };
        let globset = build_globset(&group)?;
        for path in collect_paths(&globset, &ignore_set, &options) {
            if seen.insert(path.clone()) {
                paths.push(path);
            }
        }
    }

    scan(&paths)
}

fn collect_paths(globset: &GlobSet, ignore_set: &GlobSet, options: &ScanGlobOptions) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let mut builder = WalkBuilder::new(&options.base_path);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore);

    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping unreadable entry: {}", err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.path();
        let relative_path = path.strip_prefix(&options.base_path).unwrap_or(path);
        if !globset.is_match(relative_path) && !globset.is_match(path) {
            continue;
        }
        if ignore_set.is_match(relative_path) || ignore_set.is_match(path) {
            continue;
        }
        if should_skip_file(path, options) {
            continue;
        }
        paths.push(path.to_path_buf());
    }

    paths
}

/// Directory part of `pattern` before its first glob metacharacter.
pub fn glob_root(pattern: &str) -> PathBuf {
    let Some(first_meta) = pattern.find(['*', '?', '[', '{']) else {
        let path = Path::new(pattern);
        if pattern.ends_with('/') || pattern.ends_with('\\') || path.extension().is_none() {
            return path.to_path_buf();
        }
        return match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
    };

    match pattern[..first_meta].rfind(['/', '\\']) {
        Some(idx) => PathBuf::from(&pattern[..=idx]),
        None => PathBuf::from("."),
    }
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|err| ScanError {
            message: format!("invalid glob pattern '{}': {}", pattern, err),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| ScanError {
        message: format!("failed to build glob set: {}", err),
    })
}

fn should_skip_file(path: &Path, options: &ScanGlobOptions) -> bool {
    if !options.include_node_modules
        && path
            .components()
            .any(|component| component.as_os_str() == "node_modules")
    {
        return true;
    }

    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase());
    matches!(
        ext.as_deref(),
        Some(
            "css"
                | "scss"
                | "png"
                | "jpg"
                | "jpeg"
                | "gif"
                | "webp"
                | "ico"
                | "pdf"
                | "zip"
                | "gz"
                | "woff"
                | "woff2"
                | "ttf"
                | "lock"
        )
    )
}

fn scan_path(
    path: &Path,
    classes: &mut Vec<String>,
    seen: &mut HashSet<String>,
    files_scanned: &mut usize,
) -> Result<(), ScanError> {
    if !path.exists() {
        return Err(ScanError {
            message: format!("path not found: {}", path.display()),
        });
    }

    if path.is_dir() {
        let entries = fs::read_dir(path).map_err(|err| ScanError {
            message: format!("failed to read directory {}: {}", path.display(), err),
        })?;
        for entry in entries.flatten() {
            scan_path(&entry.path(), classes, seen, files_scanned)?;
        }
        return Ok(());
    }

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            debug!(path = %path.display(), "skipping non-text file: {}", err);
            return Ok(());
        }
    };
    *files_scanned += 1;
    for class in extract_classes(&text) {
        if seen.insert(class.clone()) {
            classes.push(class);
        }
    }

    Ok(())
}

/// Class candidates from `class`-like attributes and string literals, in
/// first-seen order.
pub fn extract_classes(text: &str) -> Vec<String> {
    let mut candidates = extract_class_attributes(text);
    candidates.extend(extract_string_literals(text));

    let mut results = Vec::new();
    let mut seen = HashSet::new();
    for candidate in candidates {
        for token in tokenize_class_list(&candidate) {
            if is_valid_candidate(&token) && seen.insert(token.clone()) {
                results.push(token);
            }
        }
    }

    results
}

fn extract_class_attributes(text: &str) -> Vec<String> {
    const ATTRS: [&str; 4] = ["class", "className", "class:list", ":class"];
    let mut out = Vec::new();

    for attr in ATTRS {
        for (idx, _) in text.match_indices(attr) {
            if !is_attr_boundary(text, idx, attr.len()) {
                continue;
            }
            let pos = skip_whitespace(text, idx + attr.len());
            if !text[pos..].starts_with('=') {
                continue;
            }
            let pos = skip_whitespace(text, pos + 1);
            let Some((quote, size)) = next_char(text, pos) else {
                continue;
            };
            if quote == '"' || quote == '\'' || quote == '`' {
                if let Some((value, _)) = read_quoted(text, pos + size, quote) {
                    out.push(value);
                }
            }
        }
    }

    out
}

fn extract_string_literals(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut idx = 0;

    while let Some((ch, size)) = next_char(text, idx) {
        if ch == '"' || ch == '\'' || ch == '`' {
            match read_quoted(text, idx + size, ch) {
                Some((value, end)) => {
                    out.push(value);
                    idx = end;
                }
                None => idx += size,
            }
            continue;
        }
        idx += size;
    }

    out
}

/// Reads until the closing `quote`; returns the value and the index after it.
fn read_quoted(text: &str, mut idx: usize, quote: char) -> Option<(String, usize)> {
    let mut value = String::new();

    while let Some((ch, size)) = next_char(text, idx) {
        idx += size;
        if ch == '\\' {
            if let Some((next, next_size)) = next_char(text, idx) {
                value.push('\\');
                value.push(next);
                idx += next_size;
            }
            continue;
        }
        if ch == quote {
            return Some((value, idx));
        }
        if ch == '\n' && quote != '`' {
            return None;
        }
        value.push(ch);
    }

    None
}

fn tokenize_class_list(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut bracket_depth = 0usize;
    let mut paren_depth = 0usize;

    for ch in input.chars() {
        match ch {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            _ => {}
        }

        if ch.is_whitespace() && bracket_depth == 0 && paren_depth == 0 {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(ch);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn is_valid_candidate(token: &str) -> bool {
    if token.is_empty() || token.starts_with('.') || token.starts_with('/') {
        return false;
    }
    if token.ends_with(':') || token.ends_with('\\') {
        return false;
    }

    let mut depth = 0usize;
    let mut has_letter = false;
    for ch in token.chars() {
        if ch.is_ascii_alphabetic() {
            has_letter = true;
        }
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            '<' | '>' | '{' | '}' | '=' | ';' | '$' if depth == 0 => return false,
            '"' | '\'' | '`' if depth == 0 => return false,
            _ => {}
        }
    }

    depth == 0 && has_letter
}

fn is_attr_boundary(text: &str, idx: usize, len: usize) -> bool {
    let prev = text[..idx].chars().last();
    let next = text[idx + len..].chars().next();
    let prev_ok = prev.is_none_or(|c| c.is_whitespace() || matches!(c, '<' | '{' | '(' | ','));
    let next_ok = next.is_none_or(|c| c.is_whitespace() || c == '=');
    prev_ok && next_ok
}

fn skip_whitespace(text: &str, mut idx: usize) -> usize {
    while let Some((ch, size)) = next_char(text, idx) {
        if !ch.is_whitespace() {
            break;
        }
        idx += size;
    }
    idx
}

fn next_char(text: &str, idx: usize) -> Option<(char, usize)> {
    text.get(idx..)?.chars().next().map(|ch| (ch, ch.len_utf8()))
}
