pub mod baserow;
pub mod brevo;
pub mod config;
pub mod error;
pub mod helloasso;
pub mod renewal;
pub mod utils;

pub use error::{Result, RenewalError};
pub use config::Config;
