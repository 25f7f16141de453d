//! OData plumbing shared by every resource module.
//!
//! The balena cloud API is an OData-flavoured REST service:
//!
//! - Collections come wrapped as `{"d": [...]}`, including single-entity
//!   fetches by key (a one-element array). See [`Collection`].
//! - Related entities that are not expanded arrive as `{"__id": 42}`.
//!   Records store just the id; see [`Reference`] and the `reference_id`
//!   serde helpers.
//! - String literals in keys and filters are single-quoted, with embedded
//!   quotes doubled. See [`quote`].
//! - Lists are narrowed with a `$filter` query parameter. See [`Filter`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Query parameter name carrying a filter expression.
pub const FILTER_PARAM: &str = "$filter";

/// Collection envelope returned by every GET endpoint.
#[derive(Debug, Deserialize)]
pub struct Collection<T> {
    /// The result rows, in server order.
    pub d: Vec<T>,
}

/// A non-expanded navigation property: `{"__id": 42}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "__id")]
    pub id: u64,
}

/// Serde adapter storing a required [`Reference`] as its bare id.
pub(crate) mod reference_id {
    use super::Reference;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        Reference::deserialize(deserializer).map(|reference| reference.id)
    }

    pub fn serialize<S: Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        Reference { id: *id }.serialize(serializer)
    }
}

/// Serde adapter for a nullable [`Reference`].
pub(crate) mod option_reference_id {
    use super::Reference;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Option::<Reference>::deserialize(deserializer)
            .map(|reference| reference.map(|reference| reference.id))
    }

    pub fn serialize<S: Serializer>(id: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        id.map(|id| Reference { id }).serialize(serializer)
    }
}

/// Renders a string as an OData literal: `it's` becomes `'it''s'`.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// A scalar value on the right-hand side of an `eq` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Integer(i128),
    String(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Integer(value) => write!(f, "{value}"),
            Literal::String(value) => f.write_str(&quote(value)),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

macro_rules! integer_literal {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Literal {
            fn from(value: $ty) -> Self {
                Literal::Integer(i128::from(value))
            }
        })*
    };
}

integer_literal!(i32, i64, u32, u64);

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Clause {
    Comparison(String),
    Raw(String),
}

/// Builder for a `$filter` expression.
///
/// Clauses are combined with `and` in insertion order. An empty filter
/// renders nothing and adds no query parameter.
///
/// ```
/// use balena_cloud::odata::Filter;
///
/// let filter = Filter::new()
///     .eq("is_online", true)
///     .any("device", "d", "uuid", "abc");
/// assert_eq!(
///     filter.to_string(),
///     "is_online eq true and device/any(d:d/uuid eq 'abc')"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field eq <value>`.
    pub fn eq(mut self, field: &str, value: impl Into<Literal>) -> Self {
        self.clauses
            .push(Clause::Comparison(format!("{field} eq {}", value.into())));
        self
    }

    /// Adds a related-entity membership test:
    /// `relation/any(alias:alias/field eq <value>)`.
    pub fn any(
        mut self,
        relation: &str,
        alias: &str,
        field: &str,
        value: impl Into<Literal>,
    ) -> Self {
        self.clauses.push(Clause::Comparison(format!(
            "{relation}/any({alias}:{alias}/{field} eq {})",
            value.into()
        )));
        self
    }

    /// Adds a pre-built expression. It is parenthesized when combined with
    /// other clauses so an embedded `or` keeps its meaning.
    pub fn raw(mut self, expression: impl Into<String>) -> Self {
        self.clauses.push(Clause::Raw(expression.into()));
        self
    }

    /// Appends every clause of `other`.
    pub fn and(mut self, other: Filter) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Query parameters carrying this filter; empty when there is none.
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        if self.is_empty() {
            Vec::new()
        } else {
            vec![(FILTER_PARAM, self.to_string())]
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let combined = self.clauses.len() > 1;
        for (index, clause) in self.clauses.iter().enumerate() {
            if index > 0 {
                f.write_str(" and ")?;
            }
            match clause {
                Clause::Comparison(expression) => f.write_str(expression)?,
                Clause::Raw(expression) if combined => write!(f, "({expression})")?,
                Clause::Raw(expression) => f.write_str(expression)?,
            }
        }
        Ok(())
    }
}

/// Builds an all-`eq` filter from field/value pairs, e.g.
/// `[("is_online", true)].into_iter().collect::<Filter>()`.
impl<K: AsRef<str>, V: Into<Literal>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Filter::new(), |filter, (field, value)| {
                filter.eq(field.as_ref(), value)
            })
    }
}
