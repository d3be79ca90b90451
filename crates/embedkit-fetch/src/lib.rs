//! Fetching provider data for a URL and caching the resulting assets.
//!
//! [`OembedClient`] gathers page metadata and oEmbed data over HTTP into a
//! [`ProviderData`]; [`CacheFront`] turns that into shared
//! [`embedkit_core::EmbeddedAsset`] values with a time-to-live.

pub mod cache;
pub mod client;
pub mod error;
pub mod oembed;
pub mod page;
pub mod provider;
pub(crate) mod rate_limit;

pub use cache::{cache_key, CacheFront, Clock, SystemClock};
pub use client::{EmbedFetcher, FetchOptions, OembedClient};
pub use error::FetchError;
pub use oembed::{parse_link_header, OembedResponse};
pub use page::{parse_page, PageMetadata};
pub use provider::ProviderData;
