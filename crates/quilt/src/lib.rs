#![forbid(unsafe_code)]

//! quilt public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use quilt_dom as dom;
    pub use quilt_reconcile as reconcile;
    pub use quilt_runtime as runtime;

    pub use quilt_dom::{Document, Event, Node, Selector};
    pub use quilt_runtime::{
        Component, ComponentSpec, Location, Model, Registry, RouteTable, Router, RouterSpec,
    };
}
