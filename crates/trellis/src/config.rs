//! Configuration types for a Trellis graph.
//!
//! All types implement [`serde::Deserialize`] with every field defaulted, so
//! a configuration file only needs to name what it changes.
//!
//! # Overview
//!
//! - [`GraphConfig`] - Top-level configuration combining every section.
//! - [`ModelConfig`] - Undo history settings.
//! - [`ViewConfig`] - View transform and the default router and perimeter.
//! - [`ValidationConfig`] - Connection rules the validator enforces.
//! - The `style` section is a [`Stylesheet`].
//!
//! # Example
//!
//! ```
//! # use trellis::config::GraphConfig;
//! let config = GraphConfig::default();
//! assert_eq!(config.model().undo_depth(), 100);
//! assert_eq!(config.view().router(), "straight");
//! assert!(!config.validation().allow_loops());
//! ```

use serde::Deserialize;

use trellis_core::{
    routing::{DEFAULT_LOOP_SIZE, PerimeterKind, RouterKind},
    style::Stylesheet,
};

use crate::undo::DEFAULT_UNDO_DEPTH;

/// Top-level graph configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphConfig {
    /// Model and history section.
    #[serde(default)]
    model: ModelConfig,

    /// View section.
    #[serde(default)]
    view: ViewConfig,

    /// Validation section.
    #[serde(default)]
    validation: ValidationConfig,

    /// Default and named styles.
    #[serde(default)]
    style: Stylesheet,
}

impl GraphConfig {
    pub fn new(
        model: ModelConfig,
        view: ViewConfig,
        validation: ValidationConfig,
        style: Stylesheet,
    ) -> Self {
        Self {
            model,
            view,
            validation,
            style,
        }
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    pub fn validation(&self) -> &ValidationConfig {
        &self.validation
    }

    pub fn style(&self) -> &Stylesheet {
        &self.style
    }

    /// Replaces the view section (builder style).
    pub fn with_view(mut self, view: ViewConfig) -> Self {
        self.view = view;
        self
    }

    /// Replaces the validation section (builder style).
    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Replaces the stylesheet (builder style).
    pub fn with_style(mut self, style: Stylesheet) -> Self {
        self.style = style;
        self
    }

    /// Replaces the model section (builder style).
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }
}

/// Model and history settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Maximum number of undoable edits kept; 0 disables history.
    undo_depth: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            undo_depth: DEFAULT_UNDO_DEPTH,
        }
    }
}

impl ModelConfig {
    pub fn new(undo_depth: usize) -> Self {
        Self { undo_depth }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_depth
    }
}

/// View transform and routing defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    scale: f32,
    translate_x: f32,
    translate_y: f32,
    /// Router used when an edge has no `edgeStyle`.
    router: String,
    /// Perimeter used when a node has no `perimeter` style.
    perimeter: String,
    /// Size of synthesized self-loops, in model units.
    loop_size: f32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            router: RouterKind::Straight.name().to_string(),
            perimeter: PerimeterKind::Rectangle.name().to_string(),
            loop_size: DEFAULT_LOOP_SIZE,
        }
    }
}

impl ViewConfig {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translate(&self) -> (f32, f32) {
        (self.translate_x, self.translate_y)
    }

    pub fn router(&self) -> &str {
        &self.router
    }

    pub fn perimeter(&self) -> &str {
        &self.perimeter
    }

    pub fn loop_size(&self) -> f32 {
        self.loop_size
    }

    /// Sets the default router (builder style).
    pub fn with_router(mut self, router: impl Into<String>) -> Self {
        self.router = router.into();
        self
    }

    /// Sets the default perimeter (builder style).
    pub fn with_perimeter(mut self, perimeter: impl Into<String>) -> Self {
        self.perimeter = perimeter.into();
        self
    }

    /// Sets the scale (builder style).
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the translation (builder style).
    pub fn with_translate(mut self, x: f32, y: f32) -> Self {
        self.translate_x = x;
        self.translate_y = y;
        self
    }
}

/// Connection rules enforced by the validator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    allow_loops: bool,
    allow_duplicates: bool,
    allow_dangling: bool,
    connectable_edges: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allow_loops: false,
            allow_duplicates: true,
            allow_dangling: true,
            connectable_edges: false,
        }
    }
}

impl ValidationConfig {
    pub fn allow_loops(&self) -> bool {
        self.allow_loops
    }

    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    pub fn allow_dangling(&self) -> bool {
        self.allow_dangling
    }

    pub fn connectable_edges(&self) -> bool {
        self.connectable_edges
    }

    pub fn with_allow_loops(mut self, allow: bool) -> Self {
        self.allow_loops = allow;
        self
    }

    pub fn with_allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    pub fn with_allow_dangling(mut self, allow: bool) -> Self {
        self.allow_dangling = allow;
        self
    }

    pub fn with_connectable_edges(mut self, allow: bool) -> Self {
        self.connectable_edges = allow;
        self
    }
}
