//! Live-data core of an options trading desk: socket ingestion, the lowest
//! combined premium reducer, the in-memory store and the REST command worker.

pub mod app;
pub mod candle_agg;
pub mod config;
pub mod debug_hooks;
pub mod error;
pub mod feed;
pub mod model;
pub mod mtm;
pub mod notify;
pub mod premium;
pub mod rest;
pub mod trade_desk;

pub use error::{DeskError, Result};
