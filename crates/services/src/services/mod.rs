//! Outbound integrations and background jobs.
//!
//! - [`oauth1`], [`twitter`], [`youtube`], [`meta`] and [`discord`] talk to
//!   the external APIs.
//! - [`scheduler`] and [`discord_digest`] are the periodic jobs started by the
//!   server binary.
//! - [`kpi_period`] and [`csv_import`] are pure helpers used by the handlers.

pub mod config;
pub mod csv_import;
pub mod discord;
pub mod discord_digest;
pub mod kpi_period;
pub mod meta;
pub mod oauth1;
pub mod scheduler;
pub mod twitter;
pub mod youtube;
