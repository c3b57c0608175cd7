//! Local exception list: shell-style globs naming devices the operator has
//! already accounted for.
//!
//! The file is a JSON array of patterns, e.g.
//! `["pci:v00008086d00001234*", "0000:00:1f.*"]`. A pattern matches the whole
//! string; `*`, `?` and `[...]` (with `!` for negation) behave as in `fnmatch`.

use hwcompat_core::{DatabaseLoadError, DetectedDevice};
use regex::Regex;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExceptionList {
    patterns: Vec<String>,
    matcher: Option<Regex>,
}

impl ExceptionList {
    /// An empty list that exempts nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(patterns: Vec<String>) -> Result<Self, DatabaseLoadError> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }

        let alternatives: Vec<String> = patterns.iter().map(|p| glob_to_regex(p)).collect();
        let source = format!("^(?:{})$", alternatives.join("|"));
        let matcher = Regex::new(&source)
            .map_err(|e| DatabaseLoadError::Exceptions(format!("invalid exception pattern: {}", e)))?;

        Ok(Self {
            patterns,
            matcher: Some(matcher),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatabaseLoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DatabaseLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let list = Self::from_json(&content)?;
        tracing::info!(source = %path.display(), patterns = list.len(), "loaded exception list");
        Ok(list)
    }

    /// Like [`ExceptionList::load`], but a missing file yields an empty list
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self, DatabaseLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(source = %path.display(), "no exception list");
            return Ok(Self::empty());
        }
        Self::load(path)
    }

    pub fn from_json(json: &str) -> Result<Self, DatabaseLoadError> {
        let patterns: Vec<String> = serde_json::from_str(json)
            .map_err(|e| DatabaseLoadError::Exceptions(format!("expected a JSON array of patterns: {}", e)))?;
        Self::new(patterns)
    }

    pub fn is_exempt(&self, name: &str) -> bool {
        self.matcher.as_ref().map_or(false, |re| re.is_match(name))
    }

    /// The device's modalias is checked first, then its name
    pub fn exempts(&self, device: &DetectedDevice) -> bool {
        device.modalias.as_deref().map_or(false, |m| self.is_exempt(m)) || self.is_exempt(&device.name)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Translate one glob into an unanchored regex fragment
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&class_to_regex(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out
}

/// Translate the body of a glob class (between `[` and `]`).
///
/// Only `!` negates and only `a-z` forms a range. Every other member is
/// literal, including `^` and the set operators `&&`, `--` and `~~` of
/// regex classes. Reversed ranges match nothing.
fn class_to_regex(body: &[char]) -> String {
    let (negated, body) = match body.split_first() {
        Some(('!', rest)) => (true, rest),
        _ => (false, body),
    };

    let mut members = String::new();
    let mut k = 0;
    while k < body.len() {
        let c = body[k];
        if k + 2 < body.len() && body[k + 1] == '-' {
            let end = body[k + 2];
            if c <= end {
                push_class_member(&mut members, c);
                members.push('-');
                push_class_member(&mut members, end);
            }
            k += 3;
        } else {
            push_class_member(&mut members, c);
            k += 1;
        }
    }

    match (members.is_empty(), negated) {
        (true, true) => ".".to_string(),
        (true, false) => "[^\\x00-\\x{10FFFF}]".to_string(),
        (false, true) => format!("[^{}]", members),
        (false, false) => format!("[{}]", members),
    }
}

fn push_class_member(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

/// Index of the `]` closing the class opened at `start`. A `]` right after
/// `[` or `[!` is a literal member.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut j = start + 1;
    if chars.get(j) == Some(&'!') {
        j += 1;
    }
    if chars.get(j) == Some(&']') {
        j += 1;
    }
    while j < chars.len() {
        if chars[j] == ']' {
            return Some(j);
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(patterns: &[&str]) -> ExceptionList {
        ExceptionList::new(patterns.iter().map(|p| p.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_empty_list_exempts_nothing() {
        let empty = ExceptionList::empty();
        assert!(!empty.is_exempt("anything"));
        assert!(ExceptionList::from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn test_star_and_question() {
        let l = list(&["pci:v00008086d*", "usb:v046DpC52?*"]);
        assert!(l.is_exempt("pci:v00008086d00001234sv0sd0bc02sc00i00"));
        assert!(l.is_exempt("usb:v046DpC52Bd1201"));
        assert!(!l.is_exempt("pci:v000010ECd00008168"));
    }

    #[test]
    fn test_whole_string_match() {
        let l = list(&["floppy"]);
        assert!(l.is_exempt("floppy"));
        assert!(!l.is_exempt("floppy2"));
        assert!(!l.is_exempt("xfloppy"));
    }

    #[test]
    fn test_character_classes() {
        let l = list(&["0000:00:1[fe].?", "dev[!0-4]"]);
        assert!(l.is_exempt("0000:00:1f.2"));
        assert!(l.is_exempt("0000:00:1e.0"));
        assert!(!l.is_exempt("0000:00:1d.0"));
        assert!(l.is_exempt("dev7"));
        assert!(!l.is_exempt("dev3"));
    }

    #[test]
    fn test_class_members_are_literal() {
        let l = list(&["x[^a]", "y[a&&b]", "z[a--c]", "w[~~]", "v[]-]"]);

        assert!(l.is_exempt("x^"));
        assert!(l.is_exempt("xa"));
        assert!(!l.is_exempt("xb"));

        assert!(l.is_exempt("y&"));
        assert!(l.is_exempt("yb"));
        assert!(!l.is_exempt("yc"));

        // `a--` is the range a..=- (empty), then a literal `c`
        assert!(l.is_exempt("zc"));
        assert!(!l.is_exempt("zb"));
        assert!(!l.is_exempt("z-"));

        assert!(l.is_exempt("w~"));
        assert!(l.is_exempt("v]"));
        assert!(l.is_exempt("v-"));
    }

    #[test]
    fn test_reversed_range_matches_nothing() {
        let l = list(&["a[z-b]", "b[!z-b]"]);
        assert!(!l.is_exempt("ac"));
        assert!(!l.is_exempt("az"));
        assert!(l.is_exempt("bq"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let l = list(&["a.b+c", "[unclosed"]);
        assert!(l.is_exempt("a.b+c"));
        assert!(!l.is_exempt("axb+c"));
        assert!(l.is_exempt("[unclosed"));
    }

    #[test]
    fn test_exempts_device_by_modalias_or_name() {
        let l = list(&["pci:v00001000*", "/sys/devices/platform/i8042*"]);

        let by_alias = DetectedDevice::new("0000:03:00.0").with_modalias("pci:v00001000d00000071");
        let by_name = DetectedDevice::new("/sys/devices/platform/i8042/serio0");
        let neither = DetectedDevice::new("0000:00:02.0").with_modalias("pci:v00008086d00000166");

        assert!(l.exempts(&by_alias));
        assert!(l.exempts(&by_name));
        assert!(!l.exempts(&neither));
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ExceptionList::from_json("{\"patterns\": []}"),
            Err(DatabaseLoadError::Exceptions(_))
        ));
        assert!(ExceptionList::load_optional("/nonexistent/exceptions.json").unwrap().is_empty());
    }
}
