pub mod client;

pub use client::{BrevoClient, EmailMessage, EmailSender};
