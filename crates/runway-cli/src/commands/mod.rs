//! CLI command handlers.

pub(crate) mod assets;
pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod doctor;
pub(crate) mod id;
pub(crate) mod launch;
pub(crate) mod list;
pub(crate) mod session;
pub(crate) mod update;
