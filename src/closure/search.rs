//! Round-based closure search state machine.

use std::collections::BTreeSet;

use futures_util::{stream, StreamExt};
use serde::Serialize;

use super::token::{extract_tokens, normalize_token};
use super::{EntityKind, Lookup, Seeds};
use crate::config::ClosureConfig;
use crate::Result;

/// Tuning for a single search invocation.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Substring that marks the place we are looking for in a place reply.
    pub target_marker: String,
    /// Hard cap on expansion rounds.
    pub max_rounds: usize,
    /// Lookups in flight at once within a round (1 = sequential).
    pub concurrency: usize,
}

impl SearchOptions {
    pub fn new(target_marker: impl Into<String>) -> Self {
        Self {
            target_marker: target_marker.into(),
            max_rounds: 20,
            concurrency: 1,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

impl From<&ClosureConfig> for SearchOptions {
    fn from(config: &ClosureConfig) -> Self {
        Self {
            target_marker: config.target_marker.clone(),
            max_rounds: config.max_rounds,
            concurrency: config.concurrency,
        }
    }
}

/// Why a search stopped without finding the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustReason {
    /// A whole round discovered nothing new in either direction.
    FixedPoint,
    /// `max_rounds` rounds ran without a hit.
    RoundLimit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClosureOutcome {
    Found { token: String, round: usize },
    Exhausted { reason: ExhaustReason },
}

impl ClosureOutcome {
    pub fn found_token(&self) -> Option<&str> {
        match self {
            ClosureOutcome::Found { token, .. } => Some(token),
            ClosureOutcome::Exhausted { .. } => None,
        }
    }
}

/// Tokens first discovered in one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round: usize,
    pub new_people: BTreeSet<String>,
    pub new_places: BTreeSet<String>,
    /// Lookups that failed this round; such a round never counts as a fixed point.
    pub failed_lookups: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub outcome: ClosureOutcome,
    pub rounds: Vec<RoundSummary>,
    /// Everything discovered on the person side, seeds included.
    pub people: BTreeSet<String>,
    /// Everything discovered on the place side, seeds included.
    pub places: BTreeSet<String>,
}

/// Alternating people/places expansion against a [`Lookup`].
///
/// Each round:
/// 1. every known place is looked up and its people are added,
/// 2. every known person is looked up and their places are added,
/// 3. each place first seen this round is looked up again and its reply is
///    checked for the target marker.
///
/// Stops on the first hit, on a round that adds nothing and had no failed
/// lookups, or at `max_rounds`. A place whose marker check failed is checked
/// again in the next round.
pub struct ClosureSearch<'a, L> {
    lookup: &'a L,
    options: SearchOptions,
}

impl<'a, L: Lookup> ClosureSearch<'a, L> {
    pub fn new(lookup: &'a L, options: SearchOptions) -> Self {
        Self { lookup, options }
    }

    pub async fn run(&self, seeds: &Seeds) -> SearchReport {
        let mut people = normalize_all(&seeds.people);
        let mut places = normalize_all(&seeds.places);
        let mut rounds = Vec::new();
        let mut unchecked: BTreeSet<String> = BTreeSet::new();

        log::info!(
            "Closure search seeded with {} people, {} places (marker {:?}, max {} rounds)",
            people.len(),
            places.len(),
            self.options.target_marker,
            self.options.max_rounds
        );

        for round in 1..=self.options.max_rounds {
            let people_before = people.clone();
            let places_before = places.clone();

            let (found_people, people_failures) = self.expand(EntityKind::Place, &places).await;
            people.extend(found_people);
            let (found_places, place_failures) = self.expand(EntityKind::Person, &people).await;
            places.extend(found_places);

            let new_people: BTreeSet<String> = people.difference(&people_before).cloned().collect();
            let new_places: BTreeSet<String> = places.difference(&places_before).cloned().collect();

            unchecked.extend(new_places.iter().cloned());
            let (hit, check_failures) = self.find_target(&mut unchecked).await;

            let summary = RoundSummary {
                round,
                new_people,
                new_places,
                failed_lookups: people_failures + place_failures + check_failures,
            };
            log::info!(
                "Round {}: +{} people, +{} places (totals {} / {}, {} failed lookups)",
                round,
                summary.new_people.len(),
                summary.new_places.len(),
                people.len(),
                places.len(),
                summary.failed_lookups
            );
            log::debug!("Round {} new places: {:?}", round, summary.new_places);

            let fixed_point = summary.new_people.is_empty()
                && summary.new_places.is_empty()
                && summary.failed_lookups == 0;
            rounds.push(summary);

            if let Some(token) = hit {
                log::info!("Target marker found in place {} (round {})", token, round);
                return SearchReport {
                    outcome: ClosureOutcome::Found { token, round },
                    rounds,
                    people,
                    places,
                };
            }

            if fixed_point {
                log::info!("Fixed point reached after {} rounds, target not found", round);
                return SearchReport {
                    outcome: ClosureOutcome::Exhausted {
                        reason: ExhaustReason::FixedPoint,
                    },
                    rounds,
                    people,
                    places,
                };
            }
        }

        log::warn!(
            "Round limit {} reached without finding the target",
            self.options.max_rounds
        );
        SearchReport {
            outcome: ClosureOutcome::Exhausted {
                reason: ExhaustReason::RoundLimit,
            },
            rounds,
            people,
            places,
        }
    }

    /// Look up every token of `kind`; return the union of plausible reply
    /// tokens and the number of failed lookups.
    async fn expand(&self, kind: EntityKind, tokens: &BTreeSet<String>) -> (BTreeSet<String>, usize) {
        let replies: Vec<Result<Option<String>>> = stream::iter(tokens.iter())
            .map(|token| self.lookup_logged(kind, token))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut failures = 0;
        let mut found = BTreeSet::new();
        for reply in replies {
            match reply {
                Ok(Some(message)) => found.extend(extract_tokens(&message)),
                Ok(None) => {}
                Err(_) => failures += 1,
            }
        }
        (found, failures)
    }

    /// First unchecked place (ascending) whose raw reply contains the target
    /// marker (case-sensitive substring). Places are removed from `unchecked` once their
    /// lookup succeeds; failed ones stay for the next round.
    async fn find_target(&self, unchecked: &mut BTreeSet<String>) -> (Option<String>, usize) {
        let mut failures = 0;
        let candidates: Vec<String> = unchecked.iter().cloned().collect();
        for place in candidates {
            match self.lookup_logged(EntityKind::Place, &place).await {
                Ok(reply) => {
                    unchecked.remove(&place);
                    if reply.is_some_and(|message| message.contains(&self.options.target_marker)) {
                        return (Some(place), failures);
                    }
                }
                Err(_) => failures += 1,
            }
        }
        (None, failures)
    }

    /// Failures are logged here and counted by the caller, never propagated.
    async fn lookup_logged(&self, kind: EntityKind, token: &str) -> Result<Option<String>> {
        let reply = self.lookup.lookup(kind, token).await;
        match &reply {
            Ok(message) => log::debug!("lookup({}, {}) -> {:?}", kind, token, message),
            Err(e) => log::warn!("lookup({}, {}) failed, treating as no data: {}", kind, token, e),
        }
        reply
    }
}

fn normalize_all(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .map(|token| normalize_token(token))
        .filter(|token| !token.is_empty())
        .collect()
}
