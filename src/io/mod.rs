//! CSV ingestion and export at the boundary of the engine.

pub mod export;
pub mod import;
