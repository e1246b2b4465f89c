//! HTTP handlers

pub mod dna;
pub mod health;
pub mod pipeline;
pub mod pirs;
pub mod threats;
