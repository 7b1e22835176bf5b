pub mod auth;
pub mod facilities;
pub mod statistics;
