//! Context assembly: profile, goals and history packaging for requests.

pub mod assembly;
pub mod profile_source;

pub use assembly::{ChatContext, ContextAssembler};
pub use profile_source::{ProfileSource, StaticProfileSource};
