//! Doc index: FTS5 schema, ingest API, ranked search with filters (spec §4.4).

pub mod ingest;
pub mod schema;
pub mod search;
