// src/services/mod.rs

pub mod builder;
pub mod gradebook;
pub mod ledger;
pub mod scoring;
pub mod window;
