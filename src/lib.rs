pub mod charts;
pub mod config;
pub mod dataset;
pub mod demo;
pub mod error;
pub mod export;
pub mod features;
pub mod http_client;
pub mod logging;
pub mod player;
pub mod similarity;
pub mod state;
pub mod storyteller;
pub mod worker;
