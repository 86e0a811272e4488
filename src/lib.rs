// Client for loto.ro: public draw results and the ticket history behind
// the bilete.loto.ro login.
pub mod auth;
pub mod client;
pub mod config;
pub mod cookies;
pub mod error;
pub mod jar;
pub mod results;
pub mod session;
pub mod stats;
pub mod tickets;
pub mod types;
pub mod utils;

#[cfg(test)]
mod testing;

pub use auth::AuthState;
pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use stats::TicketStats;
pub use types::*;
