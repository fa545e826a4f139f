//! Business logic services

pub mod explanation;
pub mod geo;
pub mod optimizer;
pub mod tour;
