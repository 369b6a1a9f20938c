//! Listings - value normalization, facets and filtering

pub mod facet;
pub mod normalize;

pub use facet::{Facet, FacetEngine, FilterState};
