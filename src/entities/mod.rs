//! Record types: directories and the listings submitted into them

pub mod directory;
pub mod listing;

pub use directory::{Directory, NewDirectory};
pub use listing::{Listing, ListingData, NewListing};
