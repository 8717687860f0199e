// League analytics over the stored rows. Every function here is pure:
// rows in, rows out. Fetching and persistence live in the app crate.

pub mod allplay;
pub mod elo;
pub mod error;
pub mod h2h;
pub mod innings;
pub mod luck;
pub mod power;
pub mod prediction;
pub mod ranking;
pub mod results;
pub mod sos;
pub mod standings;

pub use error::StatsError;
