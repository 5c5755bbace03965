//! Fuzzy contact resolution
//!
//! Scores every candidate against the query and applies a tie-aware policy:
//! a clear winner is accepted, near-equal winners become an ambiguity the
//! user has to settle, and weak matches turn into suggestions.

use ahash::AHashSet;

use crate::contacts::{normalize, Contact};
use crate::core::config::ResolverConfig;

/// Outcome of resolving a name against the directory
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Exactly one plausible contact
    Match { contact: Contact, score: f32 },
    /// Several contacts scored within the tie window of the best one
    Ambiguous(Vec<Contact>),
    /// Nothing acceptable; `suggestions` holds "did you mean" candidates
    NoMatch { suggestions: Vec<Contact> },
}

impl Resolution {
    pub fn contact(&self) -> Option<&Contact> {
        match self {
            Resolution::Match { contact, .. } => Some(contact),
            _ => None,
        }
    }
}

/// Resolves spoken names against a candidate list
#[derive(Debug, Clone, Default)]
pub struct ContactResolver {
    config: ResolverConfig,
}

impl ContactResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `query` against `candidates`
    ///
    /// Deterministic: candidates with equal scores keep their directory order.
    pub fn resolve(&self, query: &str, candidates: &[Contact]) -> Resolution {
        let query = normalize(query);
        if query.is_empty() || candidates.is_empty() {
            return Resolution::NoMatch {
                suggestions: Vec::new(),
            };
        }

        let normalized: Vec<String> = candidates
            .iter()
            .map(|c| normalize(&c.display_name))
            .collect();

        // Two contacts stored under the same name are still ambiguous.
        let exact: Vec<usize> = normalized
            .iter()
            .enumerate()
            .filter(|(_, name)| **name == query)
            .map(|(i, _)| i)
            .collect();
        if exact.len() == 1 {
            return Resolution::Match {
                contact: candidates[exact[0]].clone(),
                score: 1.0,
            };
        }

        let mut scored: Vec<(usize, f32)> = normalized
            .iter()
            .enumerate()
            .map(|(i, name)| (i, score(&query, name)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let top = scored[0].1;
        if top <= 0.0 {
            return Resolution::NoMatch {
                suggestions: Vec::new(),
            };
        }

        let tie_floor = top * (1.0 - self.config.tie_window);
        let ties: Vec<usize> = scored
            .iter()
            .take_while(|(_, s)| *s >= tie_floor && *s >= self.config.suggest_threshold)
            .map(|(i, _)| *i)
            .collect();

        // A top score above accept_threshold always lands in `ties`, so a
        // single entry covers both the clear-winner and lone-candidate cases.
        match ties.len() {
            0 => {}
            1 => {
                return Resolution::Match {
                    contact: candidates[ties[0]].clone(),
                    score: top,
                }
            }
            _ => {
                return Resolution::Ambiguous(
                    ties.into_iter()
                        .take(self.config.max_ambiguous)
                        .map(|i| candidates[i].clone())
                        .collect(),
                )
            }
        }

        // Once the best candidate clears the floor, the runners-up come along
        // even when they score lower.
        let suggestions = if top >= self.config.suggestion_floor {
            scored
                .iter()
                .filter(|(_, s)| *s > 0.0)
                .take(self.config.max_suggestions)
                .map(|(i, _)| candidates[*i].clone())
                .collect()
        } else {
            Vec::new()
        };
        Resolution::NoMatch { suggestions }
    }
}

/// Similarity of two normalized names, in [0, 1]
pub fn score(query: &str, candidate: &str) -> f32 {
    substring_score(query, candidate).max(token_overlap(query, candidate))
}

fn substring_score(query: &str, candidate: &str) -> f32 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }

    let q_len = query.chars().count() as f32;
    let c_len = candidate.chars().count() as f32;

    if candidate.contains(query) {
        return 0.7 + 0.3 * (q_len / c_len);
    }

    let candidate_tokens: AHashSet<&str> = candidate.split_whitespace().collect();
    if query
        .split_whitespace()
        .all(|token| candidate_tokens.contains(token))
    {
        return (0.25 + 0.75 * (q_len / c_len)).min(1.0);
    }

    0.0
}

fn token_overlap(query: &str, candidate: &str) -> f32 {
    let q: AHashSet<&str> = query.split_whitespace().collect();
    let c: AHashSet<&str> = candidate.split_whitespace().collect();
    if q.is_empty() || c.is_empty() {
        return 0.0;
    }
    let shared = q.intersection(&c).count() as f32;
    (shared / q.len() as f32 + shared / c.len() as f32) / 2.0
}
