//! Winding Tree read API core
//!
//! Field-selectable reads over entities whose data is split between an
//! on-chain index and off-chain documents.
//!
//! A request names the fields it wants as dotted public paths. The gateway
//! maps them to internal names, reads the on-chain properties and flattens
//! the off-chain documents down to exactly those paths, then validates the
//! result against a schema whose `required` constraints were pruned to the
//! same paths.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use wt_read_api::{classify, flatten, HOTELS};
//!
//! let fields = classify(&HOTELS, &["managerAddress", "roomTypes.name", "ratePlans"]);
//! assert_eq!(fields.on_chain, vec!["manager"]);
//! assert_eq!(
//!     fields.to_flatten,
//!     vec!["descriptionUri.roomTypes.name", "ratePlansUri"]
//! );
//!
//! let description = json!({
//!     "roomTypes": [
//!         { "id": "single", "name": "Single", "totalQuantity": 3 },
//!         { "id": "double", "name": "Double", "totalQuantity": 1 }
//!     ]
//! });
//! let projected = flatten(&description, &["roomTypes.name"]);
//! assert_eq!(
//!     projected,
//!     json!({ "roomTypes": [
//!         { "id": "single", "name": "Single" },
//!         { "id": "double", "name": "Double" }
//!     ] })
//! );
//! ```
//!
//! # Field classification
//!
//! | Mapped field | Source |
//! |--------------|--------|
//! | on-chain property (`manager`) | read from the index record |
//! | description field (`name`, `roomTypes.name`) | `descriptionUri` document |
//! | document root (`ratePlansUri`, `bookingUri`) | passed through from the data index |
//! | anything else | dropped |

mod config;
mod entity;
mod error;
mod fields;
mod flatten;
mod gateway;
mod intersect;
mod listing;
mod loader;
mod mapping;
mod memory;
mod pagination;
mod types;
mod validator;

pub use config::GatewayConfig;
pub use entity::{entity_meta, resolve_entity, ItemError, RemoteEntity, DATA_INDEX_KEY};
pub use error::{
    GatewayError, LoadError, PaginationError, RemoteError, SchemaError, ValidationFailure,
};
pub use fields::{classify, classify_query, parse_field_query};
pub use flatten::{flatten, project, storage_contents, storage_reference, Projection};
pub use gateway::{lookup, Detail, Gateway, ListQuery};
pub use intersect::{intersect_required, reference_name};
pub use listing::{assemble, ListLink, ListPage};
pub use loader::{
    collect_remote_refs, inline_remote_refs, is_url, load_schema, load_schema_str, models,
    OfflineFetcher, SchemaCache, SchemaFetcher,
};
pub use mapping::FieldMapper;
pub use memory::{MemoryEntity, MemoryIndex};
pub use pagination::{paginate, parse_limit, Page};
pub use types::{
    DocumentRoot, FieldSet, Segment, AIRLINES, DATA_FORMAT_VERSION, DEFAULT_PAGE_SIZE, HOTELS,
    MAX_PAGE_SIZE,
};
pub use validator::{pruned_schema, ModelValidator};

#[cfg(feature = "remote")]
pub use loader::{load_schema_url, HttpSchemaFetcher};
