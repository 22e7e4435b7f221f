pub mod crawl;
pub mod detail;
pub mod directory;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod listing_page;
pub mod source;

mod extract;

pub use directory::{DirectoryScraper, ScraperConfig};
pub use error::ScraperError;
pub use fetch::{HttpSession, RetryPolicy};
pub use identity::Identity;
pub use listing_page::{parse_listing_page, ListingPage};
pub use source::ListingSource;
