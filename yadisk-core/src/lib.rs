mod client;
mod listing;

pub use client::{ApiErrorClass, DEFAULT_BASE_URL, PublicApiError, PublicClient};
pub use listing::{Listing, ListingPage, PublicFile, RemoteEntry, ResourceType};
