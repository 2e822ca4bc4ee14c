// Library root: formation catalog, lineup editor and viewer, and the
// backends lineups are loaded from and saved to.

pub mod config;
pub mod db;
pub mod formation;
pub mod lineup;
pub mod optimistic;
pub mod remote;
pub mod roster;
pub mod roster_import;
pub mod store;
pub mod viewer;
