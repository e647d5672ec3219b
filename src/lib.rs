//! apkscout - concurrent apk package metadata fetcher
//!
//! This library crate exposes the apk integration and config loading for
//! integration testing.

pub mod apk;
pub mod config;
