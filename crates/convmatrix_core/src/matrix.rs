use crate::catalog::{Catalog, ConversionPair, TypeName};
use crate::diagnostics::FailureSet;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Convertible,
    NotConvertible,
}

impl Verdict {
    pub fn from_convertible(convertible: bool) -> Self {
        if convertible {
            Verdict::Convertible
        } else {
            Verdict::NotConvertible
        }
    }

    pub fn is_convertible(self) -> bool {
        self == Verdict::Convertible
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Convertible => f.write_str("convertible"),
            Verdict::NotConvertible => f.write_str("not convertible"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixCell {
    pub to: TypeName,
    pub verdict: Verdict,
}

/// Verdicts for one source type, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub from: TypeName,
    pub cells: Vec<MatrixCell>,
}

/// Verdict for every ordered pair of a catalog.
///
/// A pair is convertible iff the compiler did not reject it; nothing is
/// special-cased, identity pairs included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionMatrix {
    catalog: Catalog,
    rows: Vec<MatrixRow>,
}

impl ConversionMatrix {
    pub fn from_failures(catalog: &Catalog, failures: &FailureSet) -> Self {
        let rows = catalog
            .types()
            .iter()
            .map(|from| MatrixRow {
                from: from.clone(),
                cells: catalog
                    .types()
                    .iter()
                    .map(|to| {
                        let pair = ConversionPair::new(from.clone(), to.clone());
                        MatrixCell {
                            to: to.clone(),
                            verdict: Verdict::from_convertible(!failures.contains(&pair)),
                        }
                    })
                    .collect(),
            })
            .collect();

        Self {
            catalog: catalog.clone(),
            rows,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn verdict(&self, from: &str, to: &str) -> Option<Verdict> {
        self.rows
            .iter()
            .find(|row| row.from.as_str() == from)?
            .cells
            .iter()
            .find(|cell| cell.to.as_str() == to)
            .map(|cell| cell.verdict)
    }

    pub fn is_convertible(&self, from: &str, to: &str) -> Option<bool> {
        self.verdict(from, to).map(Verdict::is_convertible)
    }

    /// Every pair with its verdict, outer loop `from`, inner loop `to`.
    pub fn entries(&self) -> impl Iterator<Item = (&TypeName, &TypeName, Verdict)> {
        self.rows.iter().flat_map(|row| {
            row.cells
                .iter()
                .map(move |cell| (&row.from, &cell.to, cell.verdict))
        })
    }

    pub fn convertible_count(&self) -> usize {
        self.entries()
            .filter(|(_, _, verdict)| verdict.is_convertible())
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.catalog.pair_count() - self.convertible_count()
    }

    /// Pairs convertible in one direction only, reported once as the
    /// convertible direction.
    pub fn one_way_pairs(&self) -> Vec<ConversionPair> {
        self.entries()
            .filter(|(from, to, verdict)| {
                verdict.is_convertible()
                    && self.verdict(to.as_str(), from.as_str()) == Some(Verdict::NotConvertible)
            })
            .map(|(from, to, _)| ConversionPair::new(from.clone(), to.clone()))
            .collect()
    }
}
