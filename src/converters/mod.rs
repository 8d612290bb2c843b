//! Content converters (spec §4.1): pure input -> normalized-output
//! transforms shared by the crawl engine and the sample indexer.

pub mod html_markdown;
pub mod json_api;
pub mod swift_symbols;
