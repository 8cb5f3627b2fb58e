pub mod service;
pub mod snapshot;
pub mod source;
