pub mod client;
pub mod types;

pub use client::{HelloAssoClient, PaymentSource};
pub use types::PaymentRecord;
