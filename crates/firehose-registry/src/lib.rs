//! # firehose-registry
//!
//! Schema resolution for the firehose client.
//!
//! ## Pieces
//! 1. **`ChainQuery`**: the chain-query collaborator (`get_abi`, `get_contract_types`)
//! 2. **`SchemaResolver`**: single-flight, process-lifetime cache of
//!    `TypeDescriptor`s keyed by contract + table (or action)
//! 3. **`StaticChainQuery`**: in-memory ABIs for tests and offline use
//! 4. **`HttpChainQuery`** (feature `remote`): `POST /v1/chain/get_abi`

#[cfg(feature = "remote")]
pub mod http;
pub mod memory;
pub mod query;
pub mod resolver;

#[cfg(feature = "remote")]
pub use http::HttpChainQuery;
pub use memory::StaticChainQuery;
pub use query::ChainQuery;
pub use resolver::{ResolverStats, SchemaResolver};
