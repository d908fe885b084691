pub mod crawler;
pub mod error;
pub mod extract;
pub mod http;
pub mod inject;
pub mod model;
pub mod normalize;
pub mod robots;

pub use crawler::{CrawlOutcome, Crawler, ProgressCallback, SessionState};
pub use error::ScanError;
pub use extract::{PageModel, TokenKeywords};
pub use http::HttpSettings;
pub use inject::Injector;
pub use model::{FormDescriptor, FormInputDescriptor, FormMethod, PageRecord, ProbeOutcome};
pub use robots::{RobotsCache, RobotsPolicy};
