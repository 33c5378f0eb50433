use crate::predicate::Predicate;
use crate::sort::SortSpec;
use serde::{Deserialize, Serialize};

/// The fields a text search applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchFields {
    /// Whitespace-separated field names, e.g. `"name email"`.
    Spaced(String),
    List(Vec<String>),
}

impl SearchFields {
    /// Normalizes to a plain list of field names.
    pub fn normalize(&self) -> Vec<String> {
        match self {
            SearchFields::Spaced(fields) => fields
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            SearchFields::List(fields) => fields.clone(),
        }
    }
}

/// The generic, engine-agnostic filter object accepted by `find` and
/// `count`.
///
/// Every field is optional. Non-positive `limit`/`offset` values are treated
/// as absent by the translator rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Raw predicate; absent means "match everything".
    pub query: Option<Predicate>,
    /// Substring to search for across `search_fields`.
    pub search: Option<String>,
    pub search_fields: Option<SearchFields>,
    pub sort: Option<SortSpec>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
