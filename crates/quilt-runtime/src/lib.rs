#![forbid(unsafe_code)]

//! Runtime: observable models, component lifecycle, and hash routing.
//!
//! Everything here is single-threaded and synchronous: model mutation,
//! render, diff, and patch application all run to completion on the host's
//! own event-processing loop. Asynchronous work lives outside the engine;
//! when it resolves, its continuation calls back in as an ordinary
//! synchronous caller.

pub mod component;
pub mod error;
pub mod location;
pub mod model;
pub mod model_component;
pub mod registry;
pub mod router;

pub use component::{Component, ComponentSpec, RenderFn};
pub use error::{EngineError, Result};
pub use location::{Location, SubscriptionId};
pub use model::{Model, ModelData, ObserverId};
pub use model_component::{RenderContext, merged_context, resolve_bind_path};
pub use registry::{DynamicChildContext, Registry};
pub use router::{RouteEntry, RouteTable, Router, RouterSpec};
