//! The résumé analysis core: the document gate, the extraction & scoring
//! agent, the ranking agent, and the pure helpers they share (status state
//! machine, coercing schema, content hashing, weighted scoring).

pub mod extraction;
pub mod gate;
pub mod hashing;
pub mod prompts;
pub mod ranking;
pub mod schema;
pub mod scoring;
pub mod status;
