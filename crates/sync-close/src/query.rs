//! Structured search query expressions.
//!
//! A [`Query`] is a recursive tagged tree serialized exactly as the search
//! endpoint expects it: every node carries a `type` discriminator, composite
//! nodes hold child queries, and leaves pair one field with one condition.
//!
//! Construction is pure. Nothing here talks to the network, and field names
//! are not checked against a live schema: an unknown field is rejected by the
//! server at search time.
//!
//! # Example
//!
//! ```rust,ignore
//! use crm_sync_close::query::{self, Condition};
//!
//! let unassigned = query::and([
//!     query::custom_field_condition("cf_navigator", Condition::Exists).negate()?,
//!     query::field_condition("lead", "num_opportunities", Condition::gt(0.0)),
//! ])?;
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorKind, Result};

/// A node of a search query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Every child must match. Never empty.
    And { queries: Vec<Query> },
    /// At least one child must match. Never empty.
    Or { queries: Vec<Query> },
    /// Matches objects with at least one related object matching the inner
    /// query.
    HasRelated {
        this_object_type: String,
        related_object_type: String,
        related_query: Box<Query>,
        #[serde(default, skip_serializing_if = "is_false")]
        negate: bool,
    },
    /// A single field compared against a condition.
    FieldCondition {
        field: FieldRef,
        condition: Condition,
        #[serde(default, skip_serializing_if = "is_false")]
        negate: bool,
    },
    /// Restricts results to one object type.
    ObjectType { object_type: String },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// The field a condition applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldRef {
    /// A built-in field of an object type.
    RegularField {
        object_type: String,
        field_name: String,
    },
    /// An organization-defined field, addressed by its opaque id.
    CustomField { custom_field_id: String },
}

/// How a text condition matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    ExactValue,
    Phrase,
    FullWords,
}

/// Comparison applied to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Text {
        mode: TextMode,
        value: String,
    },
    /// Field equals one of `values`.
    Term { values: Vec<Value> },
    NumberRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gt: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lt: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<f64>,
    },
    MomentRange {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<Moment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_or_before: Option<Moment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after: Option<Moment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        on_or_after: Option<Moment>,
    },
    /// Field has any value.
    Exists,
    /// Field references one of the given objects.
    Reference {
        reference_type: String,
        object_ids: Vec<String>,
    },
}

impl Condition {
    /// Case-sensitive exact text match.
    pub fn exact(value: impl Into<String>) -> Self {
        Condition::Text {
            mode: TextMode::ExactValue,
            value: value.into(),
        }
    }

    /// Field equals any of the given values.
    pub fn term<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Condition::Term {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Strictly greater than `n`.
    pub fn gt(n: f64) -> Self {
        Condition::NumberRange {
            gt: Some(n),
            gte: None,
            lt: None,
            lte: None,
        }
    }

    /// Strictly less than `n`.
    pub fn lt(n: f64) -> Self {
        Condition::NumberRange {
            gt: None,
            gte: None,
            lt: Some(n),
            lte: None,
        }
    }

    /// Inclusive lower bound, exclusive upper bound.
    pub fn between(on_or_after: Moment, before: Moment) -> Self {
        Condition::MomentRange {
            before: Some(before),
            on_or_before: None,
            after: None,
            on_or_after: Some(on_or_after),
        }
    }

    /// Field references one of `object_ids` of `reference_type`.
    pub fn reference<I, S>(reference_type: impl Into<String>, object_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::Reference {
            reference_type: reference_type.into(),
            object_ids: object_ids.into_iter().map(Into::into).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Condition::Term { values } if values.is_empty() => {
                Err(invalid("term condition has no values"))
            }
            Condition::NumberRange {
                gt: None,
                gte: None,
                lt: None,
                lte: None,
            } => Err(invalid("number_range condition has no bounds")),
            Condition::MomentRange {
                before: None,
                on_or_before: None,
                after: None,
                on_or_after: None,
            } => Err(invalid("moment_range condition has no bounds")),
            Condition::Reference { object_ids, .. } if object_ids.is_empty() => {
                Err(invalid("reference condition has no object ids"))
            }
            _ => Ok(()),
        }
    }
}

/// A point in time as understood by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Moment {
    /// The time the search runs.
    Now,
    /// An absolute UTC instant.
    FixedUtc { value: DateTime<Utc> },
    /// A calendar date in the organization's time zone.
    FixedLocalDate {
        value: NaiveDate,
        which_day_end: DayEnd,
    },
    /// `moment` shifted by `offset` in `direction`.
    Offset {
        direction: Direction,
        moment: Box<Moment>,
        offset: MomentOffset,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        which_day_end: Option<DayEnd>,
    },
}

impl Moment {
    /// `offset` before now, rounded to the start of that day.
    pub fn ago(offset: MomentOffset) -> Self {
        Moment::Offset {
            direction: Direction::Past,
            moment: Box::new(Moment::Now),
            offset,
            which_day_end: Some(DayEnd::Start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Past,
    Future,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayEnd {
    Start,
    End,
}

/// Calendar offset. Every unit is always serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MomentOffset {
    #[serde(default)]
    pub years: u32,
    #[serde(default)]
    pub months: u32,
    #[serde(default)]
    pub weeks: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl MomentOffset {
    pub fn days(days: u32) -> Self {
        Self {
            days,
            ..Self::default()
        }
    }

    pub fn hours(hours: u32) -> Self {
        Self {
            hours,
            ..Self::default()
        }
    }

    pub fn minutes(minutes: u32) -> Self {
        Self {
            minutes,
            ..Self::default()
        }
    }
}

/// Sort direction for search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub direction: SortDirection,
    pub field: FieldRef,
}

impl SortSpec {
    pub fn asc(object_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Asc,
            field: FieldRef::RegularField {
                object_type: object_type.into(),
                field_name: field_name.into(),
            },
        }
    }

    pub fn desc(object_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            direction: SortDirection::Desc,
            field: FieldRef::RegularField {
                object_type: object_type.into(),
                field_name: field_name.into(),
            },
        }
    }
}

impl Query {
    /// Invert a field condition or a related-object query.
    ///
    /// Composite and object-type nodes cannot be negated.
    pub fn negate(self) -> Result<Self> {
        match self {
            Query::FieldCondition {
                field, condition, ..
            } => Ok(Query::FieldCondition {
                field,
                condition,
                negate: true,
            }),
            Query::HasRelated {
                this_object_type,
                related_object_type,
                related_query,
                ..
            } => Ok(Query::HasRelated {
                this_object_type,
                related_object_type,
                related_query,
                negate: true,
            }),
            Query::And { .. } | Query::Or { .. } => {
                Err(invalid("composite queries cannot be negated"))
            }
            Query::ObjectType { .. } => Err(invalid("object_type queries cannot be negated")),
        }
    }

    /// Check the tree's invariants: composites are non-empty, each leaf
    /// names exactly one field, and conditions carry at least one operand.
    pub fn validate(&self) -> Result<()> {
        match self {
            Query::And { queries } | Query::Or { queries } => {
                if queries.is_empty() {
                    return Err(invalid("composite query has no children"));
                }
                queries.iter().try_for_each(Query::validate)
            }
            Query::HasRelated {
                this_object_type,
                related_object_type,
                related_query,
                ..
            } => {
                require("this_object_type", this_object_type)?;
                require("related_object_type", related_object_type)?;
                related_query.validate()
            }
            Query::FieldCondition {
                field, condition, ..
            } => {
                match field {
                    FieldRef::RegularField {
                        object_type,
                        field_name,
                    } => {
                        require("object_type", object_type)?;
                        require("field_name", field_name)?;
                    }
                    FieldRef::CustomField { custom_field_id } => {
                        require("custom_field_id", custom_field_id)?;
                    }
                }
                condition.validate()
            }
            Query::ObjectType { object_type } => require("object_type", object_type),
        }
    }
}

fn invalid(message: &str) -> Error {
    Error::new(ErrorKind::InvalidQuery(message.to_string()))
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::new(ErrorKind::InvalidQuery(format!(
            "{} must not be empty",
            name
        ))))
    } else {
        Ok(())
    }
}

/// Leaf condition on a built-in field.
pub fn field_condition(
    object_type: impl Into<String>,
    field_name: impl Into<String>,
    condition: Condition,
) -> Query {
    Query::FieldCondition {
        field: FieldRef::RegularField {
            object_type: object_type.into(),
            field_name: field_name.into(),
        },
        condition,
        negate: false,
    }
}

/// Leaf condition on a custom field.
pub fn custom_field_condition(custom_field_id: impl Into<String>, condition: Condition) -> Query {
    Query::FieldCondition {
        field: FieldRef::CustomField {
            custom_field_id: custom_field_id.into(),
        },
        condition,
        negate: false,
    }
}

/// Conjunction. Fails with `InvalidQuery` when `children` is empty.
pub fn and(children: impl IntoIterator<Item = Query>) -> Result<Query> {
    let queries: Vec<Query> = children.into_iter().collect();
    if queries.is_empty() {
        return Err(invalid("and() requires at least one child"));
    }
    Ok(Query::And { queries })
}

/// Disjunction. Fails with `InvalidQuery` when `children` is empty.
pub fn or(children: impl IntoIterator<Item = Query>) -> Result<Query> {
    let queries: Vec<Query> = children.into_iter().collect();
    if queries.is_empty() {
        return Err(invalid("or() requires at least one child"));
    }
    Ok(Query::Or { queries })
}

pub fn has_related(
    this_object_type: impl Into<String>,
    related_object_type: impl Into<String>,
    related_query: Query,
) -> Query {
    Query::HasRelated {
        this_object_type: this_object_type.into(),
        related_object_type: related_object_type.into(),
        related_query: Box::new(related_query),
        negate: false,
    }
}

pub fn object_type_query(object_type: impl Into<String>) -> Query {
    Query::ObjectType {
        object_type: object_type.into(),
    }
}

/// Contacts with an email address equal to `email`, compared lower-cased.
pub fn contact_email_query(email: &str) -> Query {
    has_related(
        "contact",
        "contact_email",
        field_condition("contact_email", "email", Condition::exact(email.to_lowercase())),
    )
}

/// Leads with a contact whose email address equals `email`.
pub fn lead_email_query(email: &str) -> Query {
    has_related("lead", "contact", contact_email_query(email))
}

/// `field` falls in `[on_or_after, before)`.
pub fn date_range_query(
    object_type: impl Into<String>,
    field_name: impl Into<String>,
    on_or_after: Moment,
    before: Moment,
) -> Query {
    field_condition(
        object_type,
        field_name,
        Condition::between(on_or_after, before),
    )
}
