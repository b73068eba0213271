pub mod config;
pub mod error;
pub mod graph;
pub mod closure;
pub mod cache;
pub mod client;

pub use config::Config;
pub use error::{RelsearchError, Result};
pub use closure::{ClosureOutcome, ClosureSearch, Lookup, SearchOptions, SearchReport, Seeds};
pub use graph::{build_graph, shortest_path, SocialGraph};
