pub mod clock;
pub mod config;
pub mod error;
pub mod host;
pub mod messages;
pub mod monitor;
pub mod output;
pub mod packet;
pub mod parser;
pub mod resolver;
pub mod socket;
pub mod stats;
