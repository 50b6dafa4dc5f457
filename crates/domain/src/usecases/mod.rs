//! Application use cases / business logic

pub mod digest;
pub mod dispatch;
pub mod ingest;
pub mod render;
pub mod subscription;

pub use digest::{DigestSelection, select_for};
pub use dispatch::{DispatchConfig, DispatchError, DispatchLoop};
pub use ingest::IngestUseCase;
pub use render::{DigestRenderer, RenderConfig};
pub use subscription::{SubscribeOutcome, SubscriptionError, SubscriptionUseCase, normalize_email};
