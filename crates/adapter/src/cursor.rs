use core_types::{normalize_sort, FilterParams, Predicate, SortDirection};

/// The native query descriptor handed to the storage engine.
///
/// Built from a [`FilterParams`] by [`QueryPlan::build`]; the same descriptor
/// serves both fetches and counts; the facade decides which native
/// operation to invoke with it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub predicate: Predicate,
    pub order: Vec<(String, SortDirection)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Default for QueryPlan {
    /// The unrestricted plan: fetch or count everything.
    fn default() -> Self {
        Self {
            predicate: Predicate::All,
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl QueryPlan {
    /// Translates a generic filter object into a native query descriptor.
    ///
    /// An absent filter yields the unrestricted plan. A non-empty `search`
    /// replaces the base predicate with an OR of substring tests over the
    /// normalized search fields; with zero fields that OR has no clauses and
    /// matches nothing. The literal behavior is kept rather than falling
    /// back to an unrestricted search. Non-positive `limit`/`offset` values
    /// are dropped, not clamped.
    pub fn build(params: Option<&FilterParams>) -> Self {
        let Some(params) = params else {
            return Self::default();
        };

        let mut predicate = params.query.clone().unwrap_or(Predicate::All);

        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            let fields = params
                .search_fields
                .as_ref()
                .map(|f| f.normalize())
                .unwrap_or_default();
            predicate = Predicate::Or(
                fields
                    .into_iter()
                    .map(|field| Predicate::Like(field, search.to_string()))
                    .collect(),
            );
        }

        let order = normalize_sort(params.sort.as_ref());

        Self {
            predicate,
            order,
            limit: params.limit.filter(|n| *n > 0),
            offset: params.offset.filter(|n| *n > 0),
        }
    }
}
