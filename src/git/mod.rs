//! Git plumbing collaborators.
//!
//! The decomposition core consumes plain strings; this module owns every
//! interaction with the repository: listing staged and changed files,
//! producing the staged unified diff, staging paths, and creating the
//! final commit.

pub mod ignore;
pub mod repository;

pub use ignore::ScribeIgnore;
pub use repository::Repo;
