//! Event types the engine broadcasts to its host.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so hosts can
//! forward them to a UI layer unchanged.

pub mod events;
