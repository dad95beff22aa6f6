//! gp-admin: Garage admin API adapter for garage-provider
//!
//! This crate provides the HTTP implementation of the gp-core admin
//! traits against the Garage v2 admin API. It is the only crate that
//! directly depends on an HTTP client.

pub mod client;

pub use client::AdminClient;
