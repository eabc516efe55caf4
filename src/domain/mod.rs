pub mod host;
pub mod message;
pub mod payload;
pub mod pipeline;
pub mod ports;
pub mod preferences;
pub mod profile;
pub mod region;
