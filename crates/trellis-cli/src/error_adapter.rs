//! Error adapter for converting TrellisError to miette diagnostics.
//!
//! This module provides the bridge between the library's error types and
//! miette's report formatting used in the CLI.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use trellis::TrellisError;

/// Adapter giving a [`TrellisError`] a diagnostic code and help text.
pub struct ErrorAdapter<'a>(pub &'a TrellisError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match &self.0 {
            TrellisError::Structural(_) => "trellis::structural",
            TrellisError::Integrity(_) => "trellis::integrity",
            TrellisError::Connection(_) => "trellis::connection",
            TrellisError::Registry(_) => "trellis::registry",
            TrellisError::TransactionOpen => "trellis::transaction",
            TrellisError::Io(_) => "trellis::io",
            TrellisError::Json(_) => "trellis::json",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match &self.0 {
            TrellisError::Integrity(_) => {
                "every parent and terminal id must name a record of the same snapshot, listed parents first"
            }
            TrellisError::Json(_) => r#"expected a snapshot object: {"cells": [...]}"#,
            TrellisError::Registry(_) => {
                "built-in routers: straight, orthogonal, elbow, side_to_side, top_to_bottom, loop"
            }
            TrellisError::Structural(_) => "use `--cell` with an id present in the snapshot",
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Wraps an error for rendering with miette.
pub fn to_reportable(err: &TrellisError) -> ErrorAdapter<'_> {
    ErrorAdapter(err)
}
