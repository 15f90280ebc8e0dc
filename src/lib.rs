pub mod anonymize;
pub mod association;
pub mod classify;
pub mod cli;
pub mod client;
pub mod config;
pub mod console;
pub mod cursor;
pub mod export;
pub mod intake;
pub mod registry;
pub mod report;
pub mod session;
pub mod util;
