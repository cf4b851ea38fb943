// src/handlers/mod.rs

pub mod gradebook;
pub mod quiz;
