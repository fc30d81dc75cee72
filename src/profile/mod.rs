//! Equipment Profile engine
//!
//! A Profile describes how one device family's payload bytes map to named,
//! typed, unit-scaled fields:
//! - **field**: field specs, affine scales, enum tables, decoded values
//! - **bits**: shift/mask bit access over byte buffers
//! - **codec**: payload bytes <-> value maps, driven by a profile
//! - **registry**: startup-built, immutable catalog keyed by (rorg, func, type)
//! - **catalog**: the built-in profile definitions
//!
//! The registry is built once; after that every structure in this module is
//! immutable and safe to share across threads by reference.

pub mod bits;
pub mod catalog;
pub mod codec;
pub mod field;
pub mod registry;

pub use codec::CodecError;
pub use field::{DecodedValue, FieldSpec, FieldValue, Scale};
pub use registry::{
    Direction, Profile, ProfileKey, ProfileRegistry, ProfileRegistryBuilder, RegistryError,
};
