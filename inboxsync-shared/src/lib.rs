#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Shared wire models and configuration for the `InboxSync` platform inbox.

pub mod config;
pub mod models;
