//! Business logic services

pub mod admission;
pub mod catalog;
pub mod favorites;
