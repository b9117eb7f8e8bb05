pub mod aggregator;
pub mod binance;
pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod persist;
pub mod tracker;
