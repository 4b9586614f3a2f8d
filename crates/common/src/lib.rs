pub mod api;
pub mod clock;
pub mod display;
pub mod error;
pub mod models;

pub use api::{ApiEnvelope, ApiErrorBody, AvailabilityData, AvailabilityMeta};
pub use clock::ClockTime;
pub use display::{group_by_room, RoomTimeRanges, UNSPECIFIED_ROOM};
pub use error::WindowError;
pub use models::{
    validate_selection, AvailableTimeSlot, FailureKind, FetchFailure, FetchOutcome, SearchWindow, Studio,
    StudioAvailability, StudioId, MAX_SELECTED_STUDIOS,
};
