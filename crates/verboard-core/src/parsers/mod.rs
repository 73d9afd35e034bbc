//! Parsers for files owned by external collaborators

pub mod state;

pub use state::StateParser;
