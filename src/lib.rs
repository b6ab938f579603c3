#![warn(missing_docs)]
//! Wikiwatch is a long-running watcher for the Wikimedia recent-changes feed,
//! tracking edit activity for a configured set of page titles.

pub mod config;
pub mod engine;
pub mod models;
pub mod persistence;
pub mod providers;
pub mod supervisor;
pub mod test_helpers;
