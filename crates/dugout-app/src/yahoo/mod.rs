pub mod client;
pub mod oauth;
pub mod parse;

pub use client::YahooClient;
