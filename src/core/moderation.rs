//! Moderation policy for listing status
//!
//! Decides the status a new listing starts in and which status changes a
//! moderator may make afterwards.

use thiserror::Error;

use crate::core::entity::ListingStatus;

/// Errors that can occur during moderation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModerationError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ListingStatus,
        to: ListingStatus,
    },
}

/// Moderation engine configured with the privileged submitters
#[derive(Debug, Clone, Default)]
pub struct ModerationEngine {
    auto_approve: Vec<String>,
}

impl ModerationEngine {
    /// Create an engine; listings from `auto_approve` authors skip review
    pub fn new(auto_approve: Vec<String>) -> Self {
        Self { auto_approve }
    }

    /// Status for a listing submitted by `author`
    pub fn initial_status(&self, author: &str) -> ListingStatus {
        let author = author.trim();
        if !author.is_empty() && self.auto_approve.iter().any(|a| a.trim() == author) {
            ListingStatus::Approved
        } else {
            ListingStatus::Pending
        }
    }

    /// Check if a status transition is valid
    pub fn is_valid_transition(&self, from: ListingStatus, to: ListingStatus) -> bool {
        matches!(
            (from, to),
            (ListingStatus::Pending, ListingStatus::Approved)
                | (ListingStatus::Pending, ListingStatus::Rejected)
                // Moderators may change their minds
                | (ListingStatus::Approved, ListingStatus::Rejected)
                | (ListingStatus::Rejected, ListingStatus::Approved)
        )
    }

    /// Get allowed transitions from the current status
    pub fn allowed_transitions(&self, current: ListingStatus) -> Vec<ListingStatus> {
        match current {
            ListingStatus::Pending => vec![ListingStatus::Approved, ListingStatus::Rejected],
            ListingStatus::Approved => vec![ListingStatus::Rejected],
            ListingStatus::Rejected => vec![ListingStatus::Approved],
        }
    }

    /// Verify a transition, returning an error describing the refused move
    pub fn check_transition(
        &self,
        from: ListingStatus,
        to: ListingStatus,
    ) -> Result<(), ModerationError> {
        if self.is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(ModerationError::InvalidTransition { from, to })
        }
    }
}
