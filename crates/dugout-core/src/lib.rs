// Shared foundation for the dugout workspace: configuration, league
// categories, row types and the SQLite store.

pub mod categories;
pub mod config;
pub mod db;
pub mod model;
