//! Adapters between the outside world and the provisioner: JSON files in and
//! out, and the console as a minimal UI surface.

pub mod console;
pub mod json;
