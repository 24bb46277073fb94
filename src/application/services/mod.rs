//! Application services driving the list consumer.

mod row_images;
mod search_session;
mod viewport;

pub use row_images::{RowImageEvent, RowImageSlots, RowImageUpdate, RowToken};
pub use search_session::{PageCompletion, SearchSession, SessionPhase, SessionUpdate};
pub use viewport::ScrollMetrics;
