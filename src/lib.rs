//! Cloudmock - composable simulated backend for a cloud provider API.
//!
//! Cloudmock lets a console run against a fake API. An operator picks a
//! set of presets and the crate composes them into a mock layer: an owned
//! in-memory state plus the request interceptors that serve it.
//!
//! # Architecture
//!
//! - `state`: the `MockState` snapshot, entity shapes and factories
//! - `preset`: preset descriptors, the built-in registry and all handlers
//! - `compose`: turns a `Selection` into a `ComposedMock`
//! - `interceptor`: simulated requests and responses, route matching
//! - `layer`: the installed state plus interceptors, and dispatch
//! - `session`: activation with latest-wins semantics
//! - `config`: YAML configuration files
//! - `report`: activation summaries (pretty, JSON)
//! - `logging`: tracing subscriber setup
//!
//! # Adding a New Preset
//!
//! Write a handler factory (and a seeder for crud presets) under
//! `src/preset/` and add a descriptor to `catalogue()` in
//! `preset/registry.rs`.

pub mod compose;
pub mod config;
pub mod interceptor;
pub mod layer;
pub mod logging;
pub mod preset;
pub mod report;
pub mod session;
pub mod state;

pub use compose::{ComposeError, ComposedMock, Composer, Selection};
pub use config::MockConfig;
pub use interceptor::{
    HandlerError, Interceptor, Method, MockRequest, MockResponse, RequestContext, Resolution,
};
pub use layer::MockLayer;
pub use preset::{
    MockHandler, MockPreset, MockSeeder, PresetCategory, PresetRegistry, RegistryError, SeedOptions,
};
pub use report::ActivationReport;
pub use session::MockSession;
pub use state::MockState;
