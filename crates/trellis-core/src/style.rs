//! Style dictionaries and the stylesheet that resolves them.
//!
//! A cell's [`Style`] only carries overrides. The effective style of a cell
//! is assembled by [`Stylesheet::resolve`] from four layers, lowest first:
//!
//! 1. the stylesheet default for the cell kind (node or edge),
//! 2. the named base style the cell refers to, if any,
//! 3. the cell's own entries,
//! 4. per-render overrides supplied by the view.

use std::fmt;

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::cell::CellKind;

/// Well-known style keys read by the view and the routing engine.
pub mod keys {
    /// Perimeter function name for a node.
    pub const PERIMETER: &str = "perimeter";
    /// Extra spacing between a node and the edges attached to it.
    pub const PERIMETER_SPACING: &str = "perimeterSpacing";
    /// Node rotation in degrees.
    pub const ROTATION: &str = "rotation";
    /// Router name for an edge.
    pub const EDGE_STYLE: &str = "edgeStyle";
    /// Elbow direction for elbow routers: `horizontal` or `vertical`.
    pub const ELBOW: &str = "elbow";
    /// Size of synthesized self-loops.
    pub const LOOP_SIZE: &str = "loopSize";
    pub const SOURCE_PERIMETER_SPACING: &str = "sourcePerimeterSpacing";
    pub const TARGET_PERIMETER_SPACING: &str = "targetPerimeterSpacing";
    pub const EXIT_X: &str = "exitX";
    pub const EXIT_Y: &str = "exitY";
    pub const EXIT_DX: &str = "exitDx";
    pub const EXIT_DY: &str = "exitDy";
    pub const EXIT_PERIMETER: &str = "exitPerimeter";
    pub const ENTRY_X: &str = "entryX";
    pub const ENTRY_Y: &str = "entryY";
    pub const ENTRY_DX: &str = "entryDx";
    pub const ENTRY_DY: &str = "entryDy";
    pub const ENTRY_PERIMETER: &str = "entryPerimeter";
}

/// A single style value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Bool(bool),
    Number(f32),
    Text(String),
}

impl StyleValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Number(value) => Some(*value != 0.0),
            Self::Text(value) => match value.as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(value) => value.parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for StyleValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Ordered key/value style dictionary with an optional named base style.
///
/// # Examples
///
/// ```
/// use trellis_core::style::{Style, keys};
///
/// let style = Style::new()
///     .with(keys::EDGE_STYLE, "orthogonal")
///     .with(keys::ROTATION, 45.0);
///
/// assert_eq!(style.text(keys::EDGE_STYLE), Some("orthogonal"));
/// assert_eq!(style.number(keys::ROTATION), Some(45.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    values: IndexMap<String, StyleValue>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the named base style (builder style).
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Sets an entry (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<StyleValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    /// Sets an entry, returning the previous value.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<StyleValue>,
    ) -> Option<StyleValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Removes an entry, returning the previous value.
    pub fn remove(&mut self, key: &str) -> Option<StyleValue> {
        self.values.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.values.get(key)
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(StyleValue::as_bool)
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(StyleValue::as_number)
    }

    /// Number lookup with a default for absent or non-numeric entries.
    pub fn number_or(&self, key: &str, default: f32) -> f32 {
        self.number(key).unwrap_or(default)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(StyleValue::as_text)
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_none() && self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Copies every entry of `upper` over `self`. The base name is kept from
    /// `upper` when it has one.
    fn overlay(&mut self, upper: &Style) {
        for (key, value) in &upper.values {
            self.values.insert(key.clone(), value.clone());
        }
        if upper.base.is_some() {
            self.base.clone_from(&upper.base);
        }
    }
}

/// The global default-style layer plus named styles cells may inherit from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stylesheet {
    #[serde(default)]
    default_node: Style,
    #[serde(default)]
    default_edge: Style,
    #[serde(default)]
    named: IndexMap<String, Style>,
}

impl Stylesheet {
    pub fn new(default_node: Style, default_edge: Style) -> Self {
        Self {
            default_node,
            default_edge,
            named: IndexMap::new(),
        }
    }

    /// Registers a named base style (builder style).
    pub fn with_named(mut self, name: impl Into<String>, style: Style) -> Self {
        self.named.insert(name.into(), style);
        self
    }

    pub fn default_node(&self) -> &Style {
        &self.default_node
    }

    pub fn default_edge(&self) -> &Style {
        &self.default_edge
    }

    pub fn named(&self, name: &str) -> Option<&Style> {
        self.named.get(name)
    }

    /// Resolves the effective style of a cell.
    ///
    /// Unknown base names are logged and skipped; resolution never fails.
    pub fn resolve(&self, kind: &CellKind, style: &Style, overrides: Option<&Style>) -> Style {
        let mut resolved = if kind.is_edge() {
            self.default_edge.clone()
        } else {
            self.default_node.clone()
        };

        if let Some(base) = style.base() {
            match self.named.get(base) {
                Some(named) => resolved.overlay(named),
                None => warn!(base = base; "Unknown base style, ignoring"),
            }
        }

        resolved.overlay(style);
        if let Some(overrides) = overrides {
            resolved.overlay(overrides);
        }
        resolved
    }
}
