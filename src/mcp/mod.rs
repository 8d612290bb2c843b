//! MCP stdio JSON-RPC server: tool registry plus `ServerHandler` adapter
//! (spec §4.7).

pub mod server;
pub mod tools;
