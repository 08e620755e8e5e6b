//! Row types and repositories.
//!
//! Every repository is a set of associated functions taking a [`Db`](crate::Db)
//! handle, so the same code runs against the local SQLite file and the remote
//! D1 backend. Callers are expected to have checked ownership with
//! [`ownership::Resource`] before touching rows addressed by id alone.

pub mod board;
pub mod discord;
pub mod document;
pub mod goal;
pub mod kpi;
pub mod meta;
pub mod note;
pub mod overview;
pub mod ownership;
pub mod project;
pub mod project_board;
pub mod project_document;
pub mod standalone_document;
pub mod tiktok;
pub mod twitter;
pub mod user;
pub mod youtube;
