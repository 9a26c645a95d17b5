//! Trellis Core Types and Routing
//!
//! This crate provides the value types the Trellis diagram engine is built
//! from, plus the pure routing functions the view uses to lay out edges. It
//! includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Geometry**: Points, sizes and bounds ([`geometry`] module)
//! - **Cells**: Nodes, edges, terminals and constraints ([`cell`] module)
//! - **Styles**: Style dictionaries and the stylesheet ([`style`] module)
//! - **Routing**: Perimeter and router functions and their registry
//!   ([`routing`] module)
//!
//! Nothing in this crate owns a diagram; the `trellis` crate stores cells in
//! a model and keeps their computed state.

pub mod cell;
pub mod geometry;
pub mod identifier;
pub mod routing;
pub mod style;
