//! Command line interface

pub mod commands;
pub mod shell;

use std::fmt::Write as _;

use crate::query::QueryDraft;

/// Render a draft for the terminal
pub fn format_draft(draft: &QueryDraft) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function: {}", draft.operation);
    let _ = writeln!(out, "model:    {}", draft.entity.as_deref().unwrap_or("<unset>"));
    let _ = writeln!(out, "filters:");
    for (idx, filter) in draft.filters.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", idx + 1, filter);
    }
    out
}
