// Library root: the binary and the integration tests share these modules.

pub mod cli;
pub mod error;
pub mod export;
pub mod jobs;
pub mod report;
pub mod source;
pub mod yahoo;
