pub mod client;
pub mod types;

pub use client::{BaserowClient, MemberStore};
pub use types::{MemberRecord, MemberUpdate};
