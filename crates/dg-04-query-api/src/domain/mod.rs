pub mod cache;
pub mod config;
pub mod errors;
pub mod hal;
pub mod page;
pub mod single_flight;

pub use cache::{cleanup_task, ResponseCache};
pub use config::{ApiConfig, ConfigError};
pub use errors::{ApiError, Problem, PROBLEM_CONTENT_TYPE};
pub use hal::{Hal, HalLink, HAL_CONTENT_TYPE};
pub use page::{PageRequest, MAX_PAGE_LIMIT};
pub use single_flight::SingleFlight;
