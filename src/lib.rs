//! Siteconf - layered site-configuration resolver
//!
//! This crate resolves the configuration for a static-site build: a
//! base layer of site defaults plus any number of override layers
//! (e.g. a "publish" overlay) are folded, in order, into one
//! immutable, validated configuration that the external generator
//! consumes.

pub mod layer;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use layer::{Layer, LayerOrigin, LayerProvenance, LoadError};
pub use resolve::{ResolveError, ResolvedConfig};
pub use schema::{Schema, Setting, SettingKind, UnknownSetting};
pub use validate::ValidationError;
