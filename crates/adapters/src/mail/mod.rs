//! Mail transport adapters

mod resend;

pub use crate::outbox::{OutboxMailer, OutboxWriter};
pub use resend::ResendMailer;
