pub mod health;
pub mod metrics;
pub mod tracking;
pub mod ws;
