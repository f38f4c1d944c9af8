pub mod events;
pub mod metaphor;
pub mod metrics;
pub mod models;
pub mod runs;
pub mod social;
