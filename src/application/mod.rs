//! Application layer with the search session and row image services.

/// Session and list services.
pub mod services;

pub use services::{
    RowImageSlots, RowImageUpdate, RowToken, ScrollMetrics, SearchSession, SessionPhase,
    SessionUpdate,
};
