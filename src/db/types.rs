use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// A value that can be bound to a query.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Text (unlimited length)
    Text(String),
    /// Timestamp with time zone
    DateTime(DateTime<Utc>),
}

impl DbValue {
    /// Ordering between values of the same kind. Mixed kinds are unordered.
    pub fn compare(&self, other: &DbValue) -> Option<Ordering> {
        match (self, other) {
            (DbValue::Text(a), DbValue::Text(b)) => Some(a.cmp(b)),
            (DbValue::DateTime(a), DbValue::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for DbValue {
    fn from(value: DateTime<Utc>) -> Self {
        DbValue::DateTime(value)
    }
}

/// Single row INSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<DbValue>,
}

/// A condition on one column. Predicates in a query are joined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// column = value
    Eq(String, DbValue),
    /// column > value
    Gt(String, DbValue),
    /// column < value
    Lt(String, DbValue),
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::Eq(column, _) | Predicate::Gt(column, _) | Predicate::Lt(column, _) => {
                column
            }
        }
    }

    /// Evaluate the predicate against a column value.
    pub fn matches(&self, value: &DbValue) -> bool {
        match self {
            Predicate::Eq(_, expected) => value.compare(expected) == Some(Ordering::Equal),
            Predicate::Gt(_, bound) => value.compare(bound) == Some(Ordering::Greater),
            Predicate::Lt(_, bound) => value.compare(bound) == Some(Ordering::Less),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// SELECT over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    pub columns: Vec<String>,
    pub predicates: Vec<Predicate>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            predicates: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_predicates_are_strict() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let at = DbValue::DateTime(t);

        assert!(!Predicate::Gt("event_time".into(), at.clone()).matches(&at));
        assert!(!Predicate::Lt("event_time".into(), at.clone()).matches(&at));
        assert!(Predicate::Gt("event_time".into(), at.clone())
            .matches(&DbValue::DateTime(t + chrono::Duration::seconds(1))));
    }

    #[test]
    fn test_mixed_kinds_never_match() {
        let predicate = Predicate::Eq("subject".into(), DbValue::Text("1".into()));
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(!predicate.matches(&DbValue::DateTime(t)));
    }
}
