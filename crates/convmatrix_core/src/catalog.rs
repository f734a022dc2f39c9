use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Go's predeclared scalar types, in report order.
///
/// `byte` and `rune` are aliases for `uint8` and `int32`; they are listed
/// separately so alias conversions show up in the matrix.
pub const GO_PRIMITIVES: &[&str] = &[
    "bool",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "int8",
    "int16",
    "int32",
    "int64",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "string",
    "int",
    "uint",
    "uintptr",
    "byte",
    "rune",
];

/// Name of a scalar type under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Ordered `(from, to)` combination being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConversionPair {
    pub from: TypeName,
    pub to: TypeName,
}

impl ConversionPair {
    pub fn new(from: impl Into<TypeName>, to: impl Into<TypeName>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

impl fmt::Display for ConversionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("type catalog is empty")]
    Empty,
    #[error("type name '{0}' is not a valid Go identifier")]
    InvalidName(String),
    #[error("type name '{0}' is a Go keyword or the blank identifier")]
    Reserved(String),
    #[error("type name '{0}' appears more than once in the catalog")]
    Duplicate(String),
}

/// Immutable, ordered list of type names.
///
/// Cloning is cheap; every pipeline stage receives the catalog it should work
/// against instead of reaching for a global list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    types: Arc<[TypeName]>,
}

impl Catalog {
    pub fn new<I, S>(names: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut types = Vec::new();
        for name in names {
            let name = name.into();
            if !is_identifier(&name) {
                return Err(CatalogError::InvalidName(name));
            }
            if is_reserved(&name) {
                return Err(CatalogError::Reserved(name));
            }
            if !seen.insert(name.clone()) {
                return Err(CatalogError::Duplicate(name));
            }
            types.push(TypeName(name));
        }

        if types.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self {
            types: types.into(),
        })
    }

    /// The 19 predeclared Go scalar types.
    pub fn go_primitives() -> Self {
        Self {
            types: GO_PRIMITIVES.iter().map(|name| TypeName::from(*name)).collect(),
        }
    }

    pub fn types(&self) -> &[TypeName] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Returns the catalog's own entry for `name`.
    pub fn lookup(&self, name: &str) -> Option<&TypeName> {
        self.types.iter().find(|entry| entry.as_str() == name)
    }

    pub fn pair_count(&self) -> usize {
        self.types.len() * self.types.len()
    }

    /// Cartesian product in report order: outer loop over `from`, inner loop
    /// over `to`, both in catalog order.
    pub fn pairs(&self) -> impl Iterator<Item = ConversionPair> + '_ {
        self.types.iter().flat_map(move |from| {
            self.types
                .iter()
                .map(move |to| ConversionPair::new(from.clone(), to.clone()))
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::go_primitives()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

fn is_reserved(name: &str) -> bool {
    name == "_" || GO_KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_primitives_has_nineteen_entries_in_order() {
        let catalog = Catalog::go_primitives();
        assert_eq!(catalog.len(), 19);
        assert_eq!(catalog.types()[0].as_str(), "bool");
        assert_eq!(catalog.types()[13].as_str(), "string");
        assert_eq!(catalog.types()[18].as_str(), "rune");
        assert_eq!(catalog.pair_count(), 361);
    }

    #[test]
    fn pairs_walk_outer_from_then_inner_to() {
        let catalog = Catalog::new(["a", "b", "c"]).unwrap();
        let pairs: Vec<String> = catalog.pairs().map(|pair| pair.to_string()).collect();
        assert_eq!(
            pairs,
            vec![
                "a -> a", "a -> b", "a -> c", "b -> a", "b -> b", "b -> c", "c -> a", "c -> b",
                "c -> c",
            ]
        );
    }

    #[test]
    fn rejects_empty_duplicate_and_invalid_catalogs() {
        assert_eq!(
            Catalog::new(Vec::<String>::new()).unwrap_err(),
            CatalogError::Empty
        );
        assert_eq!(
            Catalog::new(["int", "int"]).unwrap_err(),
            CatalogError::Duplicate("int".to_string())
        );
        assert_eq!(
            Catalog::new(["[]byte"]).unwrap_err(),
            CatalogError::InvalidName("[]byte".to_string())
        );
        assert_eq!(
            Catalog::new(["9lives"]).unwrap_err(),
            CatalogError::InvalidName("9lives".to_string())
        );
    }

    #[test]
    fn rejects_keywords_and_blank_identifier() {
        assert_eq!(
            Catalog::new(["int", "func"]).unwrap_err(),
            CatalogError::Reserved("func".to_string())
        );
        assert_eq!(
            Catalog::new(["_"]).unwrap_err(),
            CatalogError::Reserved("_".to_string())
        );
        assert!(Catalog::new(["funcs", "_int"]).is_ok());
    }

    #[test]
    fn lookup_returns_catalog_entry() {
        let catalog = Catalog::go_primitives();
        assert_eq!(catalog.lookup("rune").map(TypeName::as_str), Some("rune"));
        assert!(!catalog.contains("error"));
    }

    #[test]
    fn pair_helpers() {
        let pair = ConversionPair::new("rune", "string");
        assert!(!pair.is_identity());
        assert_eq!(pair.reversed(), ConversionPair::new("string", "rune"));
        assert!(ConversionPair::new("int", "int").is_identity());
    }
}
