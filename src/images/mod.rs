//! Images Module
//!
//! URL resolution, progressive sets, network-adaptive sizing and batch
//! preloading for CDN-hosted artwork.

pub mod network;
pub mod preload;
pub mod progressive;
pub mod size;
pub mod url;

pub use network::{preferred_size, NetworkClass};
pub use preload::{HttpProbe, Preloader, ResourceProbe};
pub use progressive::ProgressiveSet;
pub use size::{parse_width, SizeToken, DEFINED_SIZES, SMALLEST};
pub use url::{cache_key, SharedCache, UrlBuilder};
