pub mod catalog;
pub mod providers;
pub mod recommendations;

pub use catalog::CatalogService;
pub use recommendations::RecommendationService;
