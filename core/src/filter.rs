//! List filters and pagination.

use crate::ticket::Ticket;
use serde::Serialize;

/// Columns a list request may filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterColumn {
    /// `client_id`
    ClientId,
    /// `operator_id`
    OperatorId,
    /// `status`
    Status,
    /// `region`
    Region,
}

impl FilterColumn {
    /// The full filter allow-list.
    pub const ALL: [Self; 4] = [Self::ClientId, Self::OperatorId, Self::Status, Self::Region];

    /// Look up an allow-listed column by its external name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "client_id" => Some(Self::ClientId),
            "operator_id" => Some(Self::OperatorId),
            "status" => Some(Self::Status),
            "region" => Some(Self::Region),
            _ => None,
        }
    }

    /// Column name in the `tickets` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::OperatorId => "operator_id",
            Self::Status => "status",
            Self::Region => "region",
        }
    }

    /// Read this column from a ticket.
    #[must_use]
    pub fn value_of(self, ticket: &Ticket) -> &str {
        match self {
            Self::ClientId => &ticket.client_id,
            Self::OperatorId => &ticket.operator_id,
            Self::Status => ticket.status.as_str(),
            Self::Region => &ticket.region,
        }
    }
}

/// Equality predicates over allow-listed columns.
///
/// Built from arbitrary caller pairs with [`TicketFilter::from_pairs`]; keys
/// outside the allow-list and empty values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    predicates: Vec<(FilterColumn, String)>,
}

impl TicketFilter {
    /// Filter that matches every ticket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate. An empty value is ignored and a repeated
    /// column replaces the earlier value.
    #[must_use]
    pub fn with(mut self, column: FilterColumn, value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            return self;
        }
        self.predicates.retain(|(c, _)| *c != column);
        self.predicates.push((column, value));
        self.predicates.sort_by_key(|(c, _)| *c);
        self
    }

    /// Build a filter from caller-supplied pairs such as query parameters.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        pairs.into_iter().fold(Self::new(), |filter, (key, value)| {
            match FilterColumn::from_key(key.as_ref()) {
                Some(column) => filter.with(column, value),
                None => filter,
            }
        })
    }

    /// Predicates in column order.
    #[must_use]
    pub fn predicates(&self) -> &[(FilterColumn, String)] {
        &self.predicates
    }

    /// Whether the filter has no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Case-insensitive equality check, the same semantics storage applies.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.predicates
            .iter()
            .all(|(column, value)| column.value_of(ticket).to_lowercase() == value.to_lowercase())
    }
}

/// Page window for list requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Maximum rows, `None` for all
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: u32,
}

impl Page {
    /// Normalize caller-supplied values: `limit <= 0` means no limit and a
    /// negative offset is treated as zero.
    #[must_use]
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: u32::try_from(limit).ok().filter(|l| *l > 0),
            offset: u32::try_from(offset.max(0)).unwrap_or(u32::MAX),
        }
    }

    /// Every row.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            limit: None,
            offset: 0,
        }
    }
}

/// One page of tickets plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketPage {
    /// Tickets on this page, newest first
    pub tickets: Vec<Ticket>,
    /// Matches before pagination
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored() {
        let filter = TicketFilter::from_pairs([
            ("client_id", "c1"),
            ("subject", "anything"),
            ("1=1; --", "x"),
        ]);
        assert_eq!(
            filter.predicates(),
            &[(FilterColumn::ClientId, "c1".to_string())]
        );
    }

    #[test]
    fn empty_values_are_ignored() {
        let filter = TicketFilter::from_pairs([("region", ""), ("status", "open")]);
        assert_eq!(
            filter.predicates(),
            &[(FilterColumn::Status, "open".to_string())]
        );
    }

    #[test]
    fn repeated_column_keeps_last_value() {
        let filter = TicketFilter::new()
            .with(FilterColumn::Region, "eu")
            .with(FilterColumn::Region, "us");
        assert_eq!(
            filter.predicates(),
            &[(FilterColumn::Region, "us".to_string())]
        );
    }

    #[test]
    fn page_normalizes_caller_values() {
        assert_eq!(Page::new(0, 0), Page::all());
        assert_eq!(Page::new(-5, -5), Page::all());
        assert_eq!(
            Page::new(10, 20),
            Page {
                limit: Some(10),
                offset: 20
            }
        );
    }
}
