//! Resolution of value domains for input fields
//!
//! A value domain lists the admissible values of a field, either embedded in
//! the field specification or served by a remote endpoint. [`ValuesResolver`]
//! turns a domain plus [`FetchValuesOptions`] into a [`ValuesPage`]:
//!
//! - embedded domains are filtered and paged locally
//! - remote domains are debounced per request key, served from a
//!   [`CacheProvider`] when their cache strategy allows it, and otherwise
//!   fetched through a [`Transport`] and parsed per the domain's response
//!   mapping
//!
//! Transport and cache are injected, so hosts can swap in their own
//! networking or storage. [`HttpTransport`] and [`InMemoryCache`] are the
//! stock implementations, and [`ResolverConfig`] carries their defaults.
//!
//! ```no_run
//! use inputspec_fields::ValuesEndpoint;
//! use inputspec_values::{FetchValuesOptions, ResolverConfig, ValuesResolver};
//!
//! # async fn demo() -> inputspec_values::Result<()> {
//! let resolver = ValuesResolver::http(ResolverConfig::load(None)?)?;
//! let countries = ValuesEndpoint::remote("https://example.test/api/countries");
//! let page = resolver
//!     .resolve(&countries, FetchValuesOptions::new().with_search("fr"))
//!     .await?;
//! println!("{} matches", page.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
mod debounce;
pub mod error;
pub mod request;
pub mod resolver;
pub mod response;
pub mod transport;

pub use cache::{CacheProvider, InMemoryCache};
pub use config::{ResolverConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_LIMIT, ENV_PREFIX};
pub use error::{ResolverError, Result, TransportError};
pub use request::{request_key, FetchValuesOptions, ValuesRequest};
pub use resolver::ValuesResolver;
pub use response::{parse_page, ValuesPage};
pub use transport::{HttpTransport, Transport};
