pub mod client;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod rate_limit;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{FailureKind, Invocation, InvocationClient, InvocationFailure};
pub use models::{ModelTier, SamplingParams, Usage};
pub use parse::{parse_fields, parse_verdict, ParseError};
pub use transport::{HttpTransport, Transport, TransportFailure};
