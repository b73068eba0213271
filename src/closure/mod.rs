//! Bipartite closure search over people and places.
//!
//! People are looked up to find the places they were seen in, places are
//! looked up to find the people seen there. The search alternates between the
//! two directions until a place reply mentions the target, or until nothing new
//! turns up.

mod search;
mod token;

pub use search::{ClosureOutcome, ClosureSearch, ExhaustReason, RoundSummary, SearchOptions, SearchReport};
pub use token::{extract_tokens, is_plausible_token, normalize_token};

use std::fmt;
use std::future::Future;

use crate::Result;

/// Which side of the relation a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Place,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => write!(f, "person"),
            EntityKind::Place => write!(f, "place"),
        }
    }
}

/// Remote query-by-name / query-by-place capability.
///
/// `Ok(None)` means the service had nothing for the token. `Err` is a
/// transport or service failure; the search logs it and treats the token as
/// having no data for that round.
pub trait Lookup {
    fn lookup(
        &self,
        kind: EntityKind,
        token: &str,
    ) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// Initial frontier, usually extracted from a free-text note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Seeds {
    pub people: Vec<String>,
    pub places: Vec<String>,
}

impl Seeds {
    pub fn from_places<I, S>(places: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            people: Vec::new(),
            places: places.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty() && self.places.is_empty()
    }
}
