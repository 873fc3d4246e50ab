//! Shared types for the PlacementLog backend: wire DTOs, domain records and
//! the JSON response envelope. Kept free of HTTP and database dependencies so
//! every other crate can depend on it.

pub mod api;
pub mod models;
