//! Token-holder bubble maps: holder and interaction loading, graph assembly and a
//! force-directed layout that survives incremental updates.

pub mod address;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod graph;
pub mod layout;
pub mod session;
pub mod source;
pub mod util;
