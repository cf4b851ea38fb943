// src/models/mod.rs

pub mod assignment;
pub mod gradebook;
pub mod question;
pub mod quiz;
pub mod submission;
pub mod user;
