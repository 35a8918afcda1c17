//! A conformance fixture for shader parameter marshalling.
//!
//! A kernel declares one parameter of every supported type in a [`Catalog`]. Given a selector,
//! the [dispatcher](dispatch::evaluate) emits a solid color from which a test harness recovers
//! the value of exactly one of those parameters. Rendering the fixture once per selector then
//! checks that the host parsed, stored, defaulted and passed through each type correctly.
//!
//! Encodings, by type family:
//! - booleans are written as `0.0` or `1.0`,
//! - integers and floats are divided by `256.0`,
//! - pixel channels are written unchanged.
//!
//! One lane lands in green, two lanes in green and blue, more in red, green and blue. Matrices
//! are read row-major and contribute only their first three elements.
pub mod buffer;
pub mod catalog;
pub mod color;
pub mod dispatch;
pub mod harness;
pub mod param;

pub use catalog::{Catalog, CatalogError, ParamKey, Parameter};
pub use color::Color4;
pub use dispatch::{evaluate, evaluate_into, evaluate_selected, Selector, SELECTOR_PARAMETER};
pub use param::{Encoding, Family, TypeTag, Value};
