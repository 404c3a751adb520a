//! Rust SDK for headless CMS admin REST APIs.
//!
//! Requests are built per call with [`EndpointRequest`]: an endpoint path
//! template with `{token}` placeholders plus query arguments for filtering,
//! sorting, pagination and field expansion. Responses are mapped into typed
//! models with serde and can be cached for a TTL.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use headless_admin::{ApiAdminUser, Client, Endpoint, FilterCondition, MemoryCache};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), headless_admin::Error> {
//!     let client = Client::builder("https://cms.example.com")
//!         .access_token("your-api-token")
//!         .cache(Arc::new(MemoryCache::default()))
//!         .build()?;
//!
//!     let users = ApiAdminUser::find()?
//!         .filter(FilterCondition::eq("is_deleted", 0)?)
//!         .cache(Duration::from_secs(60))
//!         .all(&client)
//!         .await?;
//!
//!     for user in users {
//!         println!("{}", user.full_name());
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod client;
mod error;
mod filter;
mod models;
mod query;
mod request;
mod response;
mod tokens;
mod version;

pub use cache::{generate_cache_key, get_or_set, get_or_set_if, hash_string, Cache, CacheEntry, MemoryCache};
pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use filter::{FilterCondition, LogicalKind, Operator};
pub use models::{ApiAdminUser, ApiStorageFile, ApiStorageImage};
pub use query::{encode_query, SortDirection, SortSpec};
pub use request::{Endpoint, EndpointRequest, RenderedRequest};
pub use response::{EndpointResponse, Pagination};
pub use reqwest::Method;
pub use tokens::{parse_tokens, ENDPOINT_NAME_TOKEN};
pub use version::SDK_VERSION;
