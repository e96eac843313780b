//! Library crate for portcheck-rs exposing the probing engine and its collaborators.
pub mod config;
pub mod interfaces;
pub mod output;
pub mod ports;
pub mod probe;
pub mod resolve;
pub mod scanner;
pub mod targets;
pub mod tasks;
pub mod types;
