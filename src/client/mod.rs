//! HTTP adapters for the remote collaborators.

pub mod central;
pub mod openai;

pub use central::{CentralClient, HttpLookup, QueryReply};
pub use openai::{parse_seed_reply, SeedExtractor};
