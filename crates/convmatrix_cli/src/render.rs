use convmatrix_core::{ConversionMatrix, Verdict};
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// Markers printed for each verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    pub convertible: &'static str,
    pub rejected: &'static str,
}

impl Glyphs {
    pub const EMOJI: Glyphs = Glyphs {
        convertible: "✅",
        rejected: "❌",
    };
    pub const ASCII: Glyphs = Glyphs {
        convertible: "yes",
        rejected: "no",
    };

    pub fn new(ascii: bool) -> Self {
        if ascii {
            Self::ASCII
        } else {
            Self::EMOJI
        }
    }

    pub fn for_verdict(&self, verdict: Verdict) -> &'static str {
        match verdict {
            Verdict::Convertible => self.convertible,
            Verdict::NotConvertible => self.rejected,
        }
    }
}

/// One section per source type, one line per target type.
pub fn write_text(
    out: &mut impl Write,
    matrix: &ConversionMatrix,
    glyphs: Glyphs,
) -> io::Result<()> {
    for row in matrix.rows() {
        writeln!(out, "---------- converting {} values ----------", row.from)?;
        for cell in &row.cells {
            writeln!(
                out,
                "{:>10} -> {:<10} {}",
                row.from.as_str(),
                cell.to.as_str(),
                glyphs.for_verdict(cell.verdict)
            )?;
        }
    }
    Ok(())
}

/// Rows are source types, columns are target types.
pub fn write_table(
    out: &mut impl Write,
    matrix: &ConversionMatrix,
    glyphs: Glyphs,
) -> io::Result<()> {
    let types = matrix.catalog().types();
    let label_width = types
        .iter()
        .map(|ty| ty.as_str().chars().count())
        .max()
        .unwrap_or(0)
        .max("from \\ to".len());

    write!(out, "{:<label_width$}", "from \\ to")?;
    for ty in types {
        let width = column_width(ty.as_str(), glyphs);
        write!(out, " {:>width$}", ty.as_str())?;
    }
    writeln!(out)?;

    for row in matrix.rows() {
        write!(out, "{:<label_width$}", row.from.as_str())?;
        for cell in &row.cells {
            let width = column_width(cell.to.as_str(), glyphs);
            write!(out, " {:>width$}", glyphs.for_verdict(cell.verdict))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn column_width(name: &str, glyphs: Glyphs) -> usize {
    name.chars()
        .count()
        .max(glyphs.convertible.chars().count())
        .max(glyphs.rejected.chars().count())
}

pub fn summary_line(matrix: &ConversionMatrix) -> String {
    format!(
        "{} of {} conversions allowed, {} rejected",
        matrix.convertible_count(),
        matrix.catalog().pair_count(),
        matrix.rejected_count()
    )
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub catalog: Vec<&'a str>,
    pub toolchain_version: Option<String>,
    pub pattern_version: &'a str,
    pub failure_count: usize,
    pub convertible_count: usize,
    pub elapsed_ms: u64,
    pub verdicts: Vec<JsonVerdict<'a>>,
}

#[derive(Debug, Serialize)]
pub struct JsonVerdict<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub verdict: Verdict,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        matrix: &'a ConversionMatrix,
        toolchain_version: Option<String>,
        pattern_version: &'a str,
        elapsed: Duration,
    ) -> Self {
        Self {
            catalog: matrix.catalog().types().iter().map(|ty| ty.as_str()).collect(),
            toolchain_version,
            pattern_version,
            failure_count: matrix.rejected_count(),
            convertible_count: matrix.convertible_count(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            verdicts: matrix
                .entries()
                .map(|(from, to, verdict)| JsonVerdict {
                    from: from.as_str(),
                    to: to.as_str(),
                    verdict,
                })
                .collect(),
        }
    }
}

pub fn write_json(out: &mut impl Write, report: &JsonReport<'_>) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use convmatrix_core::{Catalog, ConversionPair, FailureSet};

    fn sample() -> ConversionMatrix {
        let catalog = Catalog::new(["rune", "string"]).unwrap();
        let failures: FailureSet = [ConversionPair::new("string", "rune")].into_iter().collect();
        ConversionMatrix::from_failures(&catalog, &failures)
    }

    fn rendered(write: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buffer = Vec::new();
        write(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn text_lists_sections_in_catalog_order() {
        let text = rendered(|out| write_text(out, &sample(), Glyphs::EMOJI));
        let expected = "\
---------- converting rune values ----------
      rune -> rune       ✅
      rune -> string     ✅
---------- converting string values ----------
    string -> rune       ❌
    string -> string     ✅
";
        assert_eq!(text, expected);
    }

    #[test]
    fn ascii_glyphs_replace_emoji() {
        let text = rendered(|out| write_text(out, &sample(), Glyphs::new(true)));
        assert!(text.contains("string -> rune       no"));
        assert!(!text.contains('✅'));
    }

    #[test]
    fn table_has_header_and_one_row_per_type() {
        let text = rendered(|out| write_table(out, &sample(), Glyphs::ASCII));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "from \\ to rune string");
        assert_eq!(lines[1], "rune       yes    yes");
        assert_eq!(lines[2], "string      no    yes");
    }

    #[test]
    fn summary_counts_both_verdicts() {
        assert_eq!(summary_line(&sample()), "3 of 4 conversions allowed, 1 rejected");
    }

    #[test]
    fn json_report_lists_every_pair() {
        let matrix = sample();
        let report = JsonReport::new(
            &matrix,
            Some("go1.22.3".to_string()),
            "go-types-v1",
            Duration::from_millis(1500),
        );
        let text = rendered(|out| write_json(out, &report));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["catalog"], serde_json::json!(["rune", "string"]));
        assert_eq!(value["failure_count"], 1);
        assert_eq!(value["elapsed_ms"], 1500);
        assert_eq!(value["toolchain_version"], "go1.22.3");
        assert_eq!(value["verdicts"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["verdicts"][2]["verdict"], "not_convertible");
    }
}
