//! External collaborator contracts and their in-memory implementations.

pub mod chat;
pub mod identity;
pub mod sink;
pub mod username;

pub use chat::{ChatService, InMemoryChatService};
pub use identity::{AccountProfile, IdentityClient, InMemoryIdentityClient};
pub use sink::{ErrorReportingSink, InMemoryErrorSink, TracingErrorSink};
pub use username::{AnonymousUsernameRegistry, UsernameRegistry};
