//! fleetcheck-discovery — read-only access to the announcement directory.
//!
//! The health engine only needs one capability from discovery: "give me
//! every announcement that is registered right now". That capability is
//! the [`AnnouncementSource`] trait; [`DiscoveryClient`] implements it
//! over `GET <base>/state`.

pub mod client;
pub mod error;
pub mod source;

pub use client::{BACKEND_HEADER, DiscoveryClient};
pub use error::DiscoveryError;
pub use source::{AnnouncementSource, DiscoverySnapshot};
