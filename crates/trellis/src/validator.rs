//! Connection rules.
//!
//! The [`Validator`] answers "may this edge connect these two ends?". Rules
//! run in a fixed order and the first failure wins:
//!
//! 1. Missing ends, unless dangling edges are allowed.
//! 2. Self-loops, unless loops are allowed.
//! 3. The per-cell connectable flags, and edges as terminals unless
//!    edge-to-edge connections are allowed.
//! 4. Duplicate connections, unless duplicates are allowed.
//! 5. Custom [`ConnectionRule`]s in registration order.
//!
//! A refusal is a [`ConnectionError`] value, never a fault.

use std::fmt;

use log::debug;

use trellis_core::{
    cell::{Cell, Connectable, TerminalEnd},
    identifier::Id,
};

use crate::{config::ValidationConfig, error::ConnectionError, model::Model};

/// A custom connection check.
///
/// `edge` is the edge being connected, or `None` when the question is
/// hypothetical (for example while dragging a new connection).
pub trait ConnectionRule {
    fn check(
        &self,
        model: &Model,
        edge: Option<Id>,
        source: &Cell,
        target: &Cell,
    ) -> Result<(), ConnectionError>;
}

impl<F> ConnectionRule for F
where
    F: Fn(&Model, Option<Id>, &Cell, &Cell) -> Result<(), ConnectionError>,
{
    fn check(
        &self,
        model: &Model,
        edge: Option<Id>,
        source: &Cell,
        target: &Cell,
    ) -> Result<(), ConnectionError> {
        self(model, edge, source, target)
    }
}

/// Limits the connections of cells whose style has `key = value`.
///
/// For the configured end, a matching cell may have at most `max` edges
/// (when set), and the cell at the other end must carry one of the listed
/// `key` values (when any are listed).
///
/// # Examples
///
/// ```
/// use trellis::validator::Multiplicity;
/// use trellis_core::cell::TerminalEnd;
///
/// // A "start" node has exactly one outgoing edge, into a "task".
/// let rule = Multiplicity::new(TerminalEnd::Source, "type", "start")
///     .with_max(1, "start has only one outgoing edge")
///     .with_neighbors(["task"], "start must lead to a task");
/// # let _ = rule;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Multiplicity {
    end: TerminalEnd,
    key: String,
    value: String,
    max: Option<usize>,
    count_message: String,
    neighbors: Vec<String>,
    neighbor_message: String,
}

impl Multiplicity {
    pub fn new(end: TerminalEnd, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            end,
            key: key.into(),
            value: value.into(),
            max: None,
            count_message: String::new(),
            neighbors: Vec::new(),
            neighbor_message: String::new(),
        }
    }

    /// Caps the number of edges at the configured end.
    pub fn with_max(mut self, max: usize, message: impl Into<String>) -> Self {
        self.max = Some(max);
        self.count_message = message.into();
        self
    }

    /// Restricts the `key` values allowed at the other end.
    pub fn with_neighbors<I, S>(mut self, neighbors: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.neighbors = neighbors.into_iter().map(Into::into).collect();
        self.neighbor_message = message.into();
        self
    }

    fn matches(&self, cell: &Cell) -> bool {
        cell.style().text(&self.key) == Some(self.value.as_str())
    }

    /// Edges already attached to `cell` at the configured end.
    fn count(&self, model: &Model, cell: Id, edge: Option<Id>) -> usize {
        model
            .edges_of(cell)
            .filter(|other| Some(*other) != edge)
            .filter(|other| model.terminal(*other, self.end).and_then(|t| t.cell()) == Some(cell))
            .count()
    }
}

impl ConnectionRule for Multiplicity {
    fn check(
        &self,
        model: &Model,
        edge: Option<Id>,
        source: &Cell,
        target: &Cell,
    ) -> Result<(), ConnectionError> {
        let (cell, other) = match self.end {
            TerminalEnd::Source => (source, target),
            TerminalEnd::Target => (target, source),
        };
        if !self.matches(cell) {
            return Ok(());
        }
        if let Some(max) = self.max {
            if self.count(model, cell.id(), edge) >= max {
                return Err(ConnectionError::new(self.count_message.as_str()));
            }
        }
        if !self.neighbors.is_empty() {
            let neighbor = other.style().text(&self.key);
            if !neighbor.is_some_and(|value| self.neighbors.iter().any(|n| n == value)) {
                return Err(ConnectionError::new(self.neighbor_message.as_str()));
            }
        }
        Ok(())
    }
}

/// Connection policy of a graph.
pub struct Validator {
    config: ValidationConfig,
    rules: Vec<Box<dyn ConnectionRule>>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            rules: Vec::new(),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Appends a custom rule; rules run in the order they were added.
    pub fn add_rule(&mut self, rule: impl ConnectionRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether a new edge from `source` to `target` would be accepted.
    pub fn can_connect(&self, model: &Model, source: Id, target: Id) -> Result<(), ConnectionError> {
        self.check_connection(model, None, Some(source), Some(target))
    }

    /// Checks a connection with possibly missing ends. `edge` is excluded
    /// from duplicate and multiplicity counts.
    pub fn check_connection(
        &self,
        model: &Model,
        edge: Option<Id>,
        source: Option<Id>,
        target: Option<Id>,
    ) -> Result<(), ConnectionError> {
        let result = self.run_rules(model, edge, source, target);
        if let Err(err) = &result {
            debug!(
                edge:? = edge.map(|id| id.to_string()),
                source:? = source.map(|id| id.to_string()),
                target:? = target.map(|id| id.to_string()),
                err:%;
                "Connection refused"
            );
        }
        result
    }

    fn run_rules(
        &self,
        model: &Model,
        edge: Option<Id>,
        source: Option<Id>,
        target: Option<Id>,
    ) -> Result<(), ConnectionError> {
        let (Some(source), Some(target)) = (source, target) else {
            return if self.config.allow_dangling() {
                Ok(())
            } else {
                Err(ConnectionError::Silent)
            };
        };

        if source == target && !self.config.allow_loops() {
            return Err(ConnectionError::Silent);
        }

        let (Some(source_cell), Some(target_cell)) = (model.cell(source), model.cell(target))
        else {
            return Err(ConnectionError::Silent);
        };
        if !source_cell.accepts(TerminalEnd::Source) || !target_cell.accepts(TerminalEnd::Target) {
            return Err(ConnectionError::Silent);
        }
        if (source_cell.is_edge() || target_cell.is_edge()) && !self.config.connectable_edges() {
            return Err(ConnectionError::Silent);
        }

        if !self.config.allow_duplicates()
            && model
                .edges_between(source, target, true)
                .into_iter()
                .any(|existing| Some(existing) != edge)
        {
            return Err(ConnectionError::new("already connected"));
        }

        for rule in &self.rules {
            rule.check(model, edge, source_cell, target_cell)?;
        }
        Ok(())
    }
}
