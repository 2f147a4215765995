//! Turns user-supplied file patterns into concrete paths.
//!
//! A pattern is split at its first glob segment into a literal root directory
//! and a glob suffix. Patterns without any glob segment are passed through
//! unchanged and are not checked for existence. Glob suffixes are matched one
//! segment per directory level below the root, so a wildcard never spans a `/`.
//!
//! Supported syntax inside a segment: `*`, `?`, `[...]` (via [`glob::Pattern`])
//! and `{a,b}` alternation. A backslash escapes the next character.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use thiserror::Error;
use tracing::{debug, warn};

const GLOB_CHARS: [char; 4] = ['*', '{', '?', '['];

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid glob segment '{segment}': {source}")]
    InvalidGlob {
        segment: String,
        #[source]
        source: PatternError,
    },

    #[error("cannot read directory {}: {source}", .dir.display())]
    UnreadableRoot {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A pattern split into its literal directory prefix and glob remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternParts {
    /// No glob segment at all; the pattern names exactly one path.
    Literal(String),
    /// `root` is the directory to search from, `glob` the `/`-joined suffix.
    Glob { root: String, glob: String },
}

/// Returns true if `segment` contains an unescaped `*`, `{`, `?` or `[`.
pub fn has_glob_character(segment: &str) -> bool {
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if GLOB_CHARS.contains(&c) {
            return true;
        }
    }
    false
}

fn normalize_separators(pattern: &str) -> String {
    if cfg!(windows) {
        pattern.replace('\\', "/")
    } else {
        pattern.to_string()
    }
}

/// Splits a pattern into root prefix and glob suffix.
pub fn split_pattern(pattern: &str) -> PatternParts {
    let normalized = normalize_separators(pattern);

    let mut roots: Vec<&str> = Vec::new();
    let mut globs: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        if globs.is_empty() && !has_glob_character(part) {
            roots.push(part);
        } else {
            globs.push(part);
        }
    }

    if globs.is_empty() {
        return PatternParts::Literal(normalized);
    }

    let root = if roots.is_empty() {
        ".".to_string()
    } else {
        let joined = roots.join("/");
        // "/*.xml" leaves a single empty root segment
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    };

    PatternParts::Glob {
        root,
        glob: globs.join("/"),
    }
}

/// Resolves one pattern, reporting filesystem and syntax failures to the caller.
pub fn try_resolve(pattern: &str) -> Result<Vec<PathBuf>, ResolveError> {
    match split_pattern(pattern) {
        PatternParts::Literal(path) => {
            debug!(pattern, "Pattern has no glob segment, queueing it verbatim");
            Ok(vec![PathBuf::from(path)])
        }
        PatternParts::Glob { root, glob } => {
            let matchers = glob
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(SegmentMatcher::new)
                .collect::<Result<Vec<_>, _>>()?;

            let root = PathBuf::from(unescape(&root));
            debug!(pattern, root = %root.display(), glob = %glob, "Matching glob below root");

            let mut found = Vec::new();
            if matchers.is_empty() {
                return Ok(found);
            }
            walk(&root, &matchers, &mut found).map_err(|source| ResolveError::UnreadableRoot {
                dir: root.clone(),
                source,
            })?;
            Ok(found)
        }
    }
}

/// Resolves one pattern; a pattern whose root cannot be searched yields no paths.
pub fn resolve(pattern: &str) -> Vec<PathBuf> {
    match try_resolve(pattern) {
        Ok(paths) => {
            debug!(pattern, matches = paths.len(), "Resolved pattern");
            paths
        }
        Err(e) => {
            warn!(pattern, error = %e, "Pattern could not be resolved, treating it as matching nothing");
            Vec::new()
        }
    }
}

fn walk(dir: &Path, matchers: &[SegmentMatcher], found: &mut Vec<PathBuf>) -> io::Result<()> {
    let Some((current, rest)) = matchers.split_first() else {
        return Ok(());
    };

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            debug!(dir = %dir.display(), "Skipping entry with non UTF-8 name");
            continue;
        };
        if !current.matches(name) {
            continue;
        }

        let path = dir.join(name);
        if rest.is_empty() {
            found.push(path);
        } else if path.is_dir() {
            if let Err(e) = walk(&path, rest, found) {
                warn!(dir = %path.display(), error = %e, "Skipping unreadable directory");
            }
        }
    }
    Ok(())
}

/// All alternatives of one `/`-free glob segment.
struct SegmentMatcher {
    alternatives: Vec<Pattern>,
}

impl SegmentMatcher {
    fn new(segment: &str) -> Result<Self, ResolveError> {
        let alternatives = expand_braces(segment)
            .iter()
            .map(|alt| {
                Pattern::new(&to_glob_syntax(alt)).map_err(|source| ResolveError::InvalidGlob {
                    segment: segment.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    fn matches(&self, name: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.alternatives
            .iter()
            .any(|p| p.matches_with(name, options))
    }
}

/// Expands the first unescaped `{a,b}` group and recurses into the results.
/// An unbalanced `{` is kept as a literal character.
fn expand_braces(segment: &str) -> Vec<String> {
    let chars: Vec<char> = segment.chars().collect();

    let mut open = None;
    let mut in_class = false;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' if !in_class => {
                open = Some(i);
                break;
            }
            _ => {}
        }
        i += 1;
    }
    let Some(open) = open else {
        return vec![segment.to_string()];
    };

    let mut depth = 0;
    let mut commas = Vec::new();
    let mut close = None;
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '{' => depth += 1,
            '}' if depth == 0 => {
                close = Some(i);
                break;
            }
            '}' => depth -= 1,
            ',' if depth == 0 => commas.push(i),
            _ => {}
        }
        i += 1;
    }

    let prefix: String = chars[..open].iter().collect();
    let Some(close) = close else {
        // treat the dangling brace as a literal and keep expanding what follows
        let rest: String = chars[open + 1..].iter().collect();
        return expand_braces(&rest)
            .into_iter()
            .map(|tail| format!("{prefix}\\{{{tail}"))
            .collect();
    };
    let suffix: String = chars[close + 1..].iter().collect();

    let mut bounds = vec![open];
    bounds.extend(commas);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alt: String = chars[w[0] + 1..w[1]].iter().collect();
            expand_braces(&format!("{prefix}{alt}{suffix}"))
        })
        .collect()
}

/// Rewrites backslash escapes into the bracket escapes understood by [`glob::Pattern`].
///
/// A run of unescaped `*` collapses into one: a segment never spans `/`, and
/// [`glob::Pattern`] only accepts `**` as a whole path component.
fn to_glob_syntax(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    let mut after_star = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&Pattern::escape(&escaped.to_string())),
                None => out.push('\\'),
            },
            '*' if after_star => continue,
            other => out.push(other),
        }
        after_star = c == '*';
    }
    out
}

/// Drops escaping backslashes from a literal root prefix.
fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
                continue;
            }
        }
        out.push(c);
    }
    out
}
