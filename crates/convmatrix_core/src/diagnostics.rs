//! Extraction of rejected conversions from compiler diagnostics.
//!
//! The compiler's wording is not a stable interface, so the pattern used to
//! read it is pinned and carries a version label. A line that carries the
//! marker but does not match the pattern aborts extraction instead of being
//! skipped, and so does any other positioned compiler error: the generated
//! program may only fail on conversions.

use crate::catalog::{Catalog, ConversionPair};
use crate::synth::RECEIVER;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Substring identifying an invalid-conversion diagnostic.
pub const CANNOT_CONVERT_MARKER: &str = "cannot convert";

/// Version label of the built-in pattern.
pub const PINNED_PATTERN_VERSION: &str = "go-types-v1";

/// Matches both `cannot convert p.bool (type bool) to type uint8` and
/// `cannot convert p.bool (variable of type bool) to type uint8`.
static PINNED_REGEX: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"cannot convert {}\.(?P<from>\w+) \(.+\) to type (?P<to>\w+)",
        regex::escape(RECEIVER)
    );
    Regex::new(&pattern).expect("pinned diagnostic pattern should compile")
});

/// `<file>:<line>:<col>: <message>`, the shape of every compiler error.
static POSITIONED_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.+?:\d+:\d+: (?P<message>.+)$")
        .expect("positioned diagnostic pattern should compile")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("diagnostic pattern '{pattern}' does not compile: {reason}")]
    Invalid { pattern: String, reason: String },
    #[error("diagnostic pattern '{pattern}' has no named capture group '{group}'")]
    MissingGroup {
        pattern: String,
        group: &'static str,
    },
    #[error("diagnostic marker must not be empty")]
    EmptyMarker,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error(
        "diagnostic line {line_number} does not match pattern {version}: {line:?}"
    )]
    ShapeMismatch {
        line_number: usize,
        line: String,
        version: String,
    },
    #[error("diagnostic line {line_number} names type '{name}' which is not in the catalog: {line:?}")]
    UnknownType {
        line_number: usize,
        name: String,
        line: String,
    },
    #[error("diagnostic line {line_number} is not a conversion error: {message:?}")]
    UnexpectedDiagnostic {
        line_number: usize,
        message: String,
        line: String,
    },
}

/// Versioned description of the compiler's "cannot convert" phrasing.
#[derive(Debug, Clone)]
pub struct DiagnosticPattern {
    version: String,
    marker: String,
    regex: Regex,
}

impl DiagnosticPattern {
    /// The pattern matching the Go type checker's current wording.
    pub fn pinned() -> Self {
        Self {
            version: PINNED_PATTERN_VERSION.to_string(),
            marker: CANNOT_CONVERT_MARKER.to_string(),
            regex: PINNED_REGEX.clone(),
        }
    }

    /// Builds a pattern from configuration. The regex must define the named
    /// groups `from` and `to`.
    pub fn custom(
        version: impl Into<String>,
        marker: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, PatternError> {
        let marker = marker.into();
        if marker.trim().is_empty() {
            return Err(PatternError::EmptyMarker);
        }

        let regex = Regex::new(pattern).map_err(|error| PatternError::Invalid {
            pattern: pattern.to_string(),
            reason: error.to_string(),
        })?;

        for group in ["from", "to"] {
            if !regex.capture_names().flatten().any(|name| name == group) {
                return Err(PatternError::MissingGroup {
                    pattern: pattern.to_string(),
                    group,
                });
            }
        }

        Ok(Self {
            version: version.into(),
            marker,
            regex,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_marked(&self, line: &str) -> bool {
        line.contains(&self.marker)
    }

    /// Extracts `(from, to)` from a single diagnostic line.
    pub fn parse_line<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let captures = self.regex.captures(line)?;
        let from = captures.name("from")?.as_str();
        let to = captures.name("to")?.as_str();
        Some((from, to))
    }
}

impl Default for DiagnosticPattern {
    fn default() -> Self {
        Self::pinned()
    }
}

/// Conversions the compiler rejected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureSet {
    pairs: BTreeSet<ConversionPair>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the pair was already present.
    pub fn insert(&mut self, pair: ConversionPair) -> bool {
        self.pairs.insert(pair)
    }

    pub fn contains(&self, pair: &ConversionPair) -> bool {
        self.pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversionPair> {
        self.pairs.iter()
    }
}

impl FromIterator<ConversionPair> for FailureSet {
    fn from_iter<I: IntoIterator<Item = ConversionPair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Scans `diagnostics` line by line and collects every rejected pair.
///
/// Both extracted names must belong to `catalog`; anything else means the
/// diagnostic shape has drifted and the run cannot be trusted.
pub fn extract_failures(
    diagnostics: &str,
    pattern: &DiagnosticPattern,
    catalog: &Catalog,
) -> Result<FailureSet, ExtractionError> {
    let mut failures = FailureSet::new();
    let mut marked = 0usize;

    for (index, raw_line) in diagnostics.lines().enumerate() {
        let line = raw_line.trim_end();
        let line_number = index + 1;
        if !pattern.is_marked(line) {
            if let Some(captures) = POSITIONED_DIAGNOSTIC.captures(line) {
                return Err(ExtractionError::UnexpectedDiagnostic {
                    line_number,
                    message: captures["message"].to_string(),
                    line: line.to_string(),
                });
            }
            continue;
        }
        marked += 1;

        let (from, to) =
            pattern
                .parse_line(line)
                .ok_or_else(|| ExtractionError::ShapeMismatch {
                    line_number,
                    line: line.to_string(),
                    version: pattern.version().to_string(),
                })?;

        let resolve = |name: &str| {
            catalog
                .lookup(name)
                .cloned()
                .ok_or_else(|| ExtractionError::UnknownType {
                    line_number,
                    name: name.to_string(),
                    line: line.to_string(),
                })
        };
        let pair = ConversionPair::new(resolve(from)?, resolve(to)?);

        if !failures.insert(pair.clone()) {
            debug!(%pair, line_number, "duplicate conversion diagnostic");
        }
    }

    if failures.is_empty() {
        warn!(
            version = pattern.version(),
            "no '{}' diagnostics found; every pair will report convertible", pattern.marker()
        );
    }
    debug!(marked, rejected = failures.len(), "extracted conversion failures");

    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("./conversions.go:25:6: cannot convert p.bool (variable of type bool) to type uint8", Some(("bool", "uint8")) ; "types2 phrasing")]
    #[test_case("./conversions.go:25:6: cannot convert p.bool (type bool) to type uint8", Some(("bool", "uint8")) ; "legacy phrasing")]
    #[test_case("output/conversions.go:40:11: cannot convert p.string (variable of type string) to type rune", Some(("string", "rune")) ; "alias destination")]
    #[test_case("conversions.go:9:7: cannot convert p.complex128 (variable of type complex128) to type float64\r", Some(("complex128", "float64")) ; "trailing carriage return")]
    #[test_case("./conversions.go:25:6: cannot convert x (variable of type bool) to type uint8", None ; "foreign receiver")]
    #[test_case("./conversions.go:25:6: cannot convert p.bool to type uint8", None ; "missing static type")]
    #[test_case("# command-line-arguments", None ; "package header")]
    #[test_case("./conversions.go:3:1: too many errors", None ; "truncation notice")]
    fn parse_line_table(line: &str, expected: Option<(&str, &str)>) {
        assert_eq!(DiagnosticPattern::pinned().parse_line(line), expected);
    }

    #[test]
    fn extracts_only_marked_lines() {
        let text = "\
# command-line-arguments
./conversions.go:26:8: cannot convert p.bool (variable of type bool) to type uint8
note: module requires Go 1.22
./conversions.go:27:8: cannot convert p.bool (variable of type bool) to type uint16
";
        let failures =
            extract_failures(text, &DiagnosticPattern::pinned(), &Catalog::go_primitives())
                .unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures.contains(&ConversionPair::new("bool", "uint8")));
        assert!(failures.contains(&ConversionPair::new("bool", "uint16")));
        assert!(!failures.contains(&ConversionPair::new("uint8", "bool")));
    }

    #[test]
    fn malformed_marked_line_is_fatal() {
        let text = "\
./conversions.go:26:8: cannot convert p.bool (variable of type bool) to type uint8
./conversions.go:27:8: cannot convert p.bool into uint16 (reworded)
";
        let error =
            extract_failures(text, &DiagnosticPattern::pinned(), &Catalog::go_primitives())
                .expect_err("reworded diagnostic must abort");
        match error {
            ExtractionError::ShapeMismatch {
                line_number,
                version,
                ..
            } => {
                assert_eq!(line_number, 2);
                assert_eq!(version, PINNED_PATTERN_VERSION);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_compiler_errors_are_fatal() {
        let catalog = Catalog::new(["int", "nosuch"]).unwrap();
        let text = "\
# command-line-arguments
output/conversions.go:7:9: undefined: nosuch
output/conversions.go:15:6: undefined: nosuch
";
        let error = extract_failures(text, &DiagnosticPattern::pinned(), &catalog)
            .expect_err("unrelated compiler error must abort");
        assert_eq!(
            error,
            ExtractionError::UnexpectedDiagnostic {
                line_number: 2,
                message: "undefined: nosuch".to_string(),
                line: "output/conversions.go:7:9: undefined: nosuch".to_string(),
            }
        );
    }

    #[test_case("./conversions.go:99:2: declared and not used: x" ; "unused variable")]
    #[test_case("output/conversions.go:3:1: syntax error: unexpected keyword func" ; "syntax error")]
    #[test_case(r"C:\work\output\conversions.go:3:1: too many errors" ; "windows path")]
    fn positioned_lines_without_marker_abort(line: &str) {
        let text = format!("./conversions.go:26:8: cannot convert p.bool (type bool) to type int\n{line}\n");
        assert!(matches!(
            extract_failures(&text, &DiagnosticPattern::pinned(), &Catalog::go_primitives()),
            Err(ExtractionError::UnexpectedDiagnostic { line_number: 2, .. })
        ));
    }

    #[test]
    fn names_outside_catalog_are_fatal() {
        let text = "x.go:1:1: cannot convert p.error (variable of type error) to type int\n";
        let error =
            extract_failures(text, &DiagnosticPattern::pinned(), &Catalog::go_primitives())
                .expect_err("unknown type must abort");
        assert!(matches!(
            error,
            ExtractionError::UnknownType { ref name, .. } if name == "error"
        ));
    }

    #[test]
    fn empty_stream_yields_empty_set() {
        let failures = extract_failures("", &DiagnosticPattern::pinned(), &Catalog::go_primitives())
            .unwrap();
        assert!(failures.is_empty());
    }

    #[test]
    fn duplicate_lines_collapse() {
        let line = "c.go:1:1: cannot convert p.string (type string) to type int\n";
        let text = format!("{line}{line}");
        let failures =
            extract_failures(&text, &DiagnosticPattern::pinned(), &Catalog::go_primitives())
                .unwrap();
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn custom_pattern_requires_named_groups() {
        let error = DiagnosticPattern::custom("v2", "cannot convert", r"cannot convert (\w+)")
            .expect_err("groups are mandatory");
        assert_eq!(
            error,
            PatternError::MissingGroup {
                pattern: r"cannot convert (\w+)".to_string(),
                group: "from",
            }
        );

        assert!(matches!(
            DiagnosticPattern::custom("v2", "cannot convert", r"(?P<from>"),
            Err(PatternError::Invalid { .. })
        ));
        assert_eq!(
            DiagnosticPattern::custom("v2", " ", r"(?P<from>a)(?P<to>b)").unwrap_err(),
            PatternError::EmptyMarker
        );
    }

    #[test]
    fn custom_pattern_parses_reworded_diagnostics() {
        let pattern = DiagnosticPattern::custom(
            "go-types-v2",
            "invalid conversion",
            r"invalid conversion from p\.(?P<from>\w+) to (?P<to>\w+)",
        )
        .unwrap();
        let text = "a.go:1:1: invalid conversion from p.float32 to string\n";
        let failures = extract_failures(text, &pattern, &Catalog::go_primitives()).unwrap();
        assert!(failures.contains(&ConversionPair::new("float32", "string")));
        assert_eq!(pattern.version(), "go-types-v2");
    }
}
