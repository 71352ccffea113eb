pub mod extractors;
pub mod pagination;
pub mod response;
pub mod state;

pub use extractors::{AppJson, AppPath, AuthUser, OptionalJson, Viewer};
pub use pagination::{LimitParam, PageParams};
pub use response::{ApiResponse, Pagination};
pub use state::{AppState, Repositories};
