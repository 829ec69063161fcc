//! Command handlers

pub mod config;
pub mod explore;
pub mod index;
pub mod link;
pub mod status;
