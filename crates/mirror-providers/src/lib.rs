//! Mirror Providers - reqwest adapters for the external services.
//!
//! Implements the `mirror-core` capability seams against HTTP providers: the
//! content-moderation classifier and the text-completion service. Both
//! adapters enforce request timeouts at the client level and perform no
//! retries; failure policy (fail-open moderation, fallback replies) belongs
//! to the pipeline and composer, not to the transport.

pub mod completion;
pub mod moderation;

pub use completion::CompletionApi;
pub use moderation::ModerationApi;

/// Default upstream API base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
