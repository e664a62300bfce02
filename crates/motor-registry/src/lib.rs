//! motor-registry: fixed table of leg joints and their bus IDs
//!
//! Each leg carries a Protocol 2.0 hip and knee and a Protocol 1.0 wheel. The
//! table is validated once (unique, non-broadcast IDs) and then only read.

mod error;
pub use error::RegistryError;

mod types;
pub use types::*;

mod loader;
pub use loader::load_registry_file;

mod encode;
pub use encode::JOINT_COUNT;
