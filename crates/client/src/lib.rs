pub mod aggregator;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use aggregator::{
    AggregationRun, AvailabilityAggregator, AvailabilitySource, BatchSettings, Progress, RunEvent, RunId, RunReport,
};
pub use config::{ClientConfig, ConfigOverrides, FileConfig};
pub use error::{ConfigError, FetchError};
pub use http::HttpStudioApi;
pub use session::{CardStatus, FailureBanner, SearchSession, StudioCard};
