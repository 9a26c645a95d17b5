//! Name-keyed lookup of perimeter and router functions.

use std::collections::HashMap;

use log::debug;
use thiserror::Error;

use super::{PerimeterFn, PerimeterKind, RouterFn, RouterKind};

/// Failed registry lookups. Callers are expected to log and fall back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown router `{0}`")]
    UnknownRouter(String),

    #[error("unknown perimeter `{0}`")]
    UnknownPerimeter(String),
}

/// A registered router and how its free ends attach.
#[derive(Debug, Clone, Copy)]
pub struct RouterEntry {
    route: RouterFn,
    orthogonal: bool,
}

impl RouterEntry {
    pub fn new(route: RouterFn, orthogonal: bool) -> Self {
        Self { route, orthogonal }
    }

    pub fn route(&self) -> RouterFn {
        self.route
    }

    /// Whether the router's segments are axis-aligned, so free ends should
    /// attach with an orthogonal projection.
    pub fn is_orthogonal(&self) -> bool {
        self.orthogonal
    }
}

/// Perimeter and router registries.
///
/// # Examples
///
/// ```
/// use trellis_core::routing::{Registry, RegistryError};
///
/// let registry = Registry::with_builtins();
/// assert!(registry.perimeter("ellipse").is_ok());
/// assert_eq!(
///     registry.router("zigzag").unwrap_err(),
///     RegistryError::UnknownRouter("zigzag".to_string()),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Registry {
    perimeters: HashMap<String, PerimeterFn>,
    routers: HashMap<String, RouterEntry>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`PerimeterKind`] and [`RouterKind`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for kind in PerimeterKind::ALL {
            registry.register_perimeter(kind.name(), kind.function());
        }
        for kind in RouterKind::ALL {
            registry.register_router(kind.name(), kind.entry());
        }
        registry
    }

    /// Registers a perimeter, replacing any previous one with that name.
    pub fn register_perimeter(&mut self, name: impl Into<String>, perimeter: PerimeterFn) {
        let name = name.into();
        debug!(name = name.as_str(); "Registering perimeter");
        self.perimeters.insert(name, perimeter);
    }

    /// Registers a router, replacing any previous one with that name.
    pub fn register_router(&mut self, name: impl Into<String>, router: RouterEntry) {
        let name = name.into();
        debug!(name = name.as_str(), orthogonal = router.is_orthogonal(); "Registering router");
        self.routers.insert(name, router);
    }

    pub fn perimeter(&self, name: &str) -> Result<PerimeterFn, RegistryError> {
        self.perimeters
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownPerimeter(name.to_string()))
    }

    pub fn router(&self, name: &str) -> Result<RouterEntry, RegistryError> {
        self.routers
            .get(name)
            .copied()
            .ok_or_else(|| RegistryError::UnknownRouter(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::{Bounds, Point},
        routing::RouteRequest,
        style::Style,
    };

    fn centered(bounds: Bounds, _style: &Style, _next: Point, _orthogonal: bool) -> Point {
        bounds.center()
    }

    fn no_bends(_request: &RouteRequest<'_>) -> Vec<Point> {
        Vec::new()
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        for kind in PerimeterKind::ALL {
            assert!(registry.perimeter(kind.name()).is_ok(), "{kind}");
        }
        for kind in RouterKind::ALL {
            let entry = registry.router(kind.name()).expect("builtin router");
            assert_eq!(entry.is_orthogonal(), kind.is_orthogonal());
        }
    }

    #[test]
    fn test_unknown_names() {
        let registry = Registry::new();
        assert_eq!(
            registry.perimeter("blob").unwrap_err(),
            RegistryError::UnknownPerimeter("blob".to_string())
        );
        assert_eq!(
            registry.router("zigzag").unwrap_err().to_string(),
            "unknown router `zigzag`"
        );
    }

    #[test]
    fn test_register_custom() {
        let mut registry = Registry::with_builtins();
        registry.register_perimeter("centered", centered);
        registry.register_router("direct", RouterEntry::new(no_bends, false));

        let perimeter = registry.perimeter("centered").expect("registered");
        let bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(
            perimeter(bounds, &Style::new(), Point::new(100.0, 0.0), false),
            Point::new(5.0, 5.0)
        );
        assert!(!registry.router("direct").expect("registered").is_orthogonal());
    }
}
