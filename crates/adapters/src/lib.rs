//! alfred-brief adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `store`: SQLite, in-memory and Supabase (PostgREST) stores
//! - `sources`: GOV.UK guidance, BBC RSS and exchange-rate news sources
//! - `mail`: Resend API mailer and JSONL outbox

mod store_memory;
mod store_sqlite;
mod supabase;

pub mod mail;
pub mod outbox;
pub mod sources;

/// Re-exports for store adapters
pub mod store {
    pub use crate::store_memory::InMemoryStore;
    pub use crate::store_sqlite::SqliteStore;
    pub use crate::supabase::SupabaseStore;
}
