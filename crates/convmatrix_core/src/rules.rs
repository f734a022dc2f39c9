//! Reference model of Go's conversion rules for non-constant scalar values.
//!
//! Used to cross-check what the compiler reports: a disagreement means either
//! the toolchain changed its rules or the diagnostic scraping drifted.

use crate::catalog::{Catalog, ConversionPair, TypeName};
use crate::diagnostics::FailureSet;
use crate::matrix::{ConversionMatrix, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Boolean,
    Integer,
    Float,
    Complex,
    Text,
}

impl TypeClass {
    /// Classifies a predeclared Go type name.
    pub fn of(name: &str) -> Option<Self> {
        let class = match name {
            "bool" => TypeClass::Boolean,
            "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16"
            | "uint32" | "uint64" | "uintptr" | "byte" | "rune" => TypeClass::Integer,
            "float32" | "float64" => TypeClass::Float,
            "complex64" | "complex128" => TypeClass::Complex,
            "string" => TypeClass::Text,
            _ => return None,
        };
        Some(class)
    }

    fn is_real(self) -> bool {
        matches!(self, TypeClass::Integer | TypeClass::Float)
    }
}

/// Whether Go accepts `to(x)` for a variable `x` of type `from`. `None` when
/// either name is outside the model.
pub fn expected_convertible(from: &str, to: &str) -> Option<bool> {
    let source = TypeClass::of(from)?;
    let target = TypeClass::of(to)?;

    if from == to {
        return Some(true);
    }

    let allowed = match (source, target) {
        (TypeClass::Boolean, TypeClass::Boolean) => true,
        (TypeClass::Boolean, _) | (_, TypeClass::Boolean) => false,
        (s, t) if s.is_real() && t.is_real() => true,
        (TypeClass::Complex, TypeClass::Complex) => true,
        (TypeClass::Integer, TypeClass::Text) => true,
        (TypeClass::Text, TypeClass::Text) => true,
        _ => false,
    };
    Some(allowed)
}

/// Pairs of `catalog` the model expects the compiler to reject.
pub fn expected_failures(catalog: &Catalog) -> FailureSet {
    catalog
        .pairs()
        .filter(|pair| expected_convertible(pair.from.as_str(), pair.to.as_str()) == Some(false))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMismatch {
    pub pair: ConversionPair,
    pub observed: Verdict,
    pub expected: Verdict,
}

/// Compares a compiler-derived matrix with the model. Types the model does not
/// know are skipped.
pub fn verify(matrix: &ConversionMatrix) -> Vec<RuleMismatch> {
    let mut mismatches = Vec::new();
    for row in matrix.rows() {
        for cell in &row.cells {
            let Some(expected) = expected_convertible(row.from.as_str(), cell.to.as_str()) else {
                continue;
            };
            let expected = Verdict::from_convertible(expected);
            if expected != cell.verdict {
                mismatches.push(RuleMismatch {
                    pair: ConversionPair::new(row.from.clone(), cell.to.clone()),
                    observed: cell.verdict,
                    expected,
                });
            }
        }
    }
    mismatches
}

/// Catalog entries the model can reason about.
pub fn modelled_types(catalog: &Catalog) -> Vec<&TypeName> {
    catalog
        .types()
        .iter()
        .filter(|name| TypeClass::of(name.as_str()).is_some())
        .collect()
}
