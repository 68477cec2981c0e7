//! Types and configuration shared between the task tracker server and anything
//! that talks to it over HTTP.

pub mod config;
pub mod types;
