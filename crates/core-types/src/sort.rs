use serde::{Deserialize, Serialize};

/// Direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A caller-supplied sort specification.
///
/// Callers express ordering in one of three equivalent shapes; all of them
/// normalize to the same canonical sequence of `(field, direction)` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortSpec {
    /// Space- or comma-separated field tokens, e.g. `"-votes title"`.
    /// A leading `-` marks the field as descending.
    Keys(String),
    /// One token per element, same `-` prefix rule as [`SortSpec::Keys`].
    List(Vec<String>),
    /// Explicit field/direction pairs in caller order; a strictly positive
    /// direction sorts ascending, anything else descending.
    Directions(Vec<(String, i32)>),
}

impl SortSpec {
    /// Normalizes this specification into the canonical ordered sequence of
    /// `(field, direction)` pairs.
    ///
    /// Pure and order-preserving: the output sequence follows the input
    /// order exactly. Empty input shapes yield an empty sequence, never an
    /// error.
    pub fn normalize(&self) -> Vec<(String, SortDirection)> {
        match self {
            SortSpec::Keys(keys) => keys
                .split([',', ' ', '\t'])
                .filter(|token| !token.is_empty())
                .map(normalize_token)
                .collect(),
            SortSpec::List(tokens) => tokens
                .iter()
                .filter(|token| !token.is_empty())
                .map(|token| normalize_token(token))
                .collect(),
            SortSpec::Directions(pairs) => pairs
                .iter()
                .map(|(field, direction)| {
                    let direction = if *direction > 0 {
                        SortDirection::Asc
                    } else {
                        SortDirection::Desc
                    };
                    (field.clone(), direction)
                })
                .collect(),
        }
    }
}

/// Normalizes an optional sort specification; `None` yields an empty
/// sequence.
pub fn normalize_sort(spec: Option<&SortSpec>) -> Vec<(String, SortDirection)> {
    spec.map(SortSpec::normalize).unwrap_or_default()
}

fn normalize_token(token: &str) -> (String, SortDirection) {
    match token.strip_prefix('-') {
        Some(field) => (field.to_string(), SortDirection::Desc),
        None => (token.to_string(), SortDirection::Asc),
    }
}
