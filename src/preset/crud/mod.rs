//! Stateful crud presets.
//!
//! Each submodule exposes a `seed` function matching [`SeedFn`] and a
//! `handlers` function matching [`MockHandler`].
//!
//! [`SeedFn`]: crate::preset::SeedFn
//! [`MockHandler`]: crate::preset::MockHandler

pub mod domains;
pub mod linodes;
pub mod placement_groups;
pub mod support_tickets;
pub mod volumes;

use serde::Deserialize;

use crate::interceptor::HandlerError;
use crate::state::{Linode, MockState};

/// Body accepted by label-only update endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct LabelUpdate {
    pub label: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Validate a label against the provider's rules.
pub(crate) fn validate_label(label: &str) -> Result<(), HandlerError> {
    if label.len() < 3 || label.len() > 64 {
        return Err(HandlerError::invalid_field(
            "label",
            "Label must be between 3 and 64 characters.",
        ));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(HandlerError::invalid_field(
            "label",
            "Label must include only ASCII letters, numbers, dashes, underscores, and periods.",
        ));
    }
    Ok(())
}

/// Look up a linode referenced from another resource's request body.
pub(crate) fn referenced_linode(state: &MockState, field: &str, id: u64) -> Result<Linode, HandlerError> {
    state
        .linode(id)
        .cloned()
        .ok_or_else(|| HandlerError::invalid_field(field, &format!("Linode {} not found", id)))
}
