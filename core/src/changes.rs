//! Whitelisted partial updates.
//!
//! A [`TicketChanges`] is whatever a caller sent: arbitrary keys mapped to
//! text. [`TicketChanges::into_patch`] intersects it with the update
//! allow-list ([`TicketField`]) and validates the status vocabulary, producing
//! a [`TicketPatch`] that storage adapters apply verbatim. Keys outside the
//! allow-list are dropped, never forwarded.

use crate::error::{Result, TicketError};
use crate::ticket::TicketStatus;
use std::collections::BTreeMap;

/// Fields a caller may change after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TicketField {
    /// `subject`
    Subject,
    /// `notes`
    Notes,
    /// `status`
    Status,
    /// `priority`
    Priority,
    /// `region`
    Region,
}

impl TicketField {
    /// The full update allow-list.
    pub const ALL: [Self; 5] = [
        Self::Subject,
        Self::Notes,
        Self::Status,
        Self::Priority,
        Self::Region,
    ];

    /// Look up an allow-listed field by its external name.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "subject" => Some(Self::Subject),
            "notes" => Some(Self::Notes),
            "status" => Some(Self::Status),
            "priority" => Some(Self::Priority),
            "region" => Some(Self::Region),
            _ => None,
        }
    }

    /// Column name in the `tickets` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Notes => "notes",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Region => "region",
        }
    }

    /// Column width in characters, `None` for unbounded text.
    #[must_use]
    pub const fn max_len(self) -> Option<usize> {
        match self {
            Self::Subject => Some(255),
            Self::Priority | Self::Status => Some(32),
            Self::Region => Some(64),
            Self::Notes => None,
        }
    }

    /// Reject values wider than the column.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] naming the field.
    pub fn check_len(self, value: &str) -> Result<()> {
        match self.max_len() {
            Some(max) if value.chars().count() > max => Err(TicketError::invalid_input(format!(
                "{} must be at most {max} characters",
                self.column()
            ))),
            _ => Ok(()),
        }
    }
}

/// Raw change set received from a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketChanges(BTreeMap<String, String>);

impl TicketChanges {
    /// Empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a change.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add or replace a change in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Number of raw entries, including ones that will be dropped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no entries were supplied at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Intersect with the allow-list and validate.
    ///
    /// Nothing is partially applied: the patch is either fully valid or an
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TicketError::InvalidInput`] when no allow-listed key remains or
    /// when `status` is outside the vocabulary.
    pub fn into_patch(self) -> Result<TicketPatch> {
        let mut patch = TicketPatch::default();

        for (key, value) in self.0 {
            let Some(field) = TicketField::from_key(&key) else {
                tracing::debug!(field = %key, "Dropping change outside the update allow-list");
                continue;
            };
            field.check_len(&value)?;
            match field {
                TicketField::Subject => patch.subject = Some(value),
                TicketField::Notes => patch.notes = Some(value),
                TicketField::Status => patch.status = Some(TicketStatus::parse(&value)?),
                TicketField::Priority => patch.priority = Some(value),
                TicketField::Region => patch.region = Some(value),
            }
        }

        if patch.is_empty() {
            return Err(TicketError::invalid_input("no changes provided"));
        }
        Ok(patch)
    }
}

impl<K, V> FromIterator<(K, V)> for TicketChanges
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Validated partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketPatch {
    /// New subject
    pub subject: Option<String>,
    /// New notes
    pub notes: Option<String>,
    /// New status
    pub status: Option<TicketStatus>,
    /// New priority
    pub priority: Option<String>,
    /// New region
    pub region: Option<String>,
}

impl TicketPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.notes.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.region.is_none()
    }

    /// Text-valued assignments in column order. `status` is handled separately
    /// because it also drives `closed_at`.
    #[must_use]
    pub fn text_assignments(&self) -> Vec<(TicketField, &str)> {
        [
            (TicketField::Subject, self.subject.as_deref()),
            (TicketField::Notes, self.notes.as_deref()),
            (TicketField::Priority, self.priority.as_deref()),
            (TicketField::Region, self.region.as_deref()),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }
}
