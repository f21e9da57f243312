//! Candidate selection
//!
//! Ranks candidates per persona and draws one from the viable pool. The random
//! source is always passed in by the caller; nothing here touches global state.

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::error::PersonaError;
use crate::types::{Candidate, Persona};

/// Default pool size; 1 makes selection deterministic
pub const DEFAULT_TOP_K: usize = 1;

/// Default viability threshold (top-K already filters)
pub const DEFAULT_THRESHOLD: f64 = 0.0;

/// Pool size, seed and viability threshold for selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionConfig {
    pub top_k: usize,
    /// `None` draws from OS entropy and is not reproducible
    pub seed: Option<u64>,
    pub threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            seed: None,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), PersonaError> {
        if self.top_k == 0 {
            return Err(PersonaError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(PersonaError::InvalidConfig(format!(
                "threshold must be finite, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Top `top_k` candidates per persona, best first.
///
/// The sort is stable, so equal scores keep their input order.
pub fn select_top_candidates(
    candidates: &[Candidate],
    top_k: usize,
) -> BTreeMap<Persona, Vec<Candidate>> {
    let mut by_persona: BTreeMap<Persona, Vec<Candidate>> = BTreeMap::new();
    for candidate in candidates {
        by_persona
            .entry(candidate.persona)
            .or_default()
            .push(candidate.clone());
    }

    for pool in by_persona.values_mut() {
        pool.sort_by(|a, b| b.fit_score.total_cmp(&a.fit_score));
        pool.truncate(top_k);
    }
    by_persona
}

/// Pick uniformly among candidates scoring at least `threshold`.
///
/// A single survivor is returned without drawing from `rng`.
pub fn select_random_from_viable<'a, R: Rng>(
    candidates: &'a [Candidate],
    threshold: f64,
    rng: &mut R,
) -> Result<&'a Candidate, PersonaError> {
    let viable: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.fit_score >= threshold)
        .collect();

    let selected = match viable.as_slice() {
        [] => {
            let persona = candidates
                .first()
                .map(|c| c.persona.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(PersonaError::NoViableCandidates { persona, threshold });
        }
        [only] => *only,
        pool => pool[rng.gen_range(0..pool.len())],
    };

    info!(
        viable = viable.len(),
        threshold,
        selected = %selected,
        "selected candidate"
    );
    Ok(selected)
}

/// Ranked table of the first `count` candidates for one persona
pub fn format_candidate_summary(candidates: &[Candidate], persona: Persona, count: usize) -> String {
    let rule = "=".repeat(70);
    let mut lines = vec![
        rule.clone(),
        format!("Top {count} Candidates for Persona {persona}"),
        rule.clone(),
        format!("{:<6} {:<25} {:<12} {:<10}", "Rank", "ID", "Start Date", "Fit Score"),
        "-".repeat(70),
    ];
    lines.extend(candidates.iter().take(count).enumerate().map(|(i, c)| {
        format!(
            "{:<6} {:<25} {:<12} {:.4}",
            i + 1,
            c.participant_id,
            c.start_date.to_string(),
            c.fit_score
        )
    }));
    lines.push(rule);
    lines.join("\n")
}

/// Locally scoped selection generator
pub fn selection_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use pretty_assertions::assert_eq;

    fn candidate(id: &str, offset: i64, persona: Persona, score: f64) -> Candidate {
        Candidate {
            participant_id: id.to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset),
            persona,
            fit_score: score,
        }
    }

    fn pool() -> Vec<Candidate> {
        vec![
            candidate("p1", 0, Persona::A, 0.40),
            candidate("p1", 0, Persona::B, 0.90),
            candidate("p1", 1, Persona::A, 0.75),
            candidate("p1", 1, Persona::B, 0.20),
            candidate("p2", 0, Persona::A, 0.75),
            candidate("p2", 0, Persona::B, 0.55),
            candidate("p2", 1, Persona::A, 0.10),
            candidate("p2", 1, Persona::B, 0.65),
        ]
    }

    #[test]
    fn test_top_k_per_persona_descending() {
        let top = select_top_candidates(&pool(), 3);

        let a_scores: Vec<f64> = top[&Persona::A].iter().map(|c| c.fit_score).collect();
        assert_eq!(a_scores, vec![0.75, 0.75, 0.40]);
        let b_scores: Vec<f64> = top[&Persona::B].iter().map(|c| c.fit_score).collect();
        assert_eq!(b_scores, vec![0.90, 0.65, 0.55]);
    }

    #[test]
    fn test_top_k_ties_keep_discovery_order() {
        let top = select_top_candidates(&pool(), 2);
        let a = &top[&Persona::A];
        assert_eq!(a[0].participant_id, "p1");
        assert_eq!(a[1].participant_id, "p2");
    }

    #[test]
    fn test_top_one_is_deterministic_regardless_of_seed() {
        let top = select_top_candidates(&pool(), 1);
        for seed in [0, 1, 42, 9999] {
            let mut rng = selection_rng(Some(seed));
            let chosen = select_random_from_viable(&top[&Persona::B], 0.0, &mut rng).unwrap();
            assert_eq!(chosen.fit_score, 0.90);
        }
    }

    #[test]
    fn test_same_seed_same_selection() {
        let candidates = pool();
        let a: Vec<Candidate> = candidates
            .iter()
            .filter(|c| c.persona == Persona::A)
            .cloned()
            .collect();

        let first = select_random_from_viable(&a, 0.0, &mut selection_rng(Some(7))).unwrap();
        for _ in 0..10 {
            let again = select_random_from_viable(&a, 0.0, &mut selection_rng(Some(7))).unwrap();
            assert_eq!(again, first);
        }
    }

    #[test]
    fn test_threshold_filters_pool() {
        let a: Vec<Candidate> = pool()
            .into_iter()
            .filter(|c| c.persona == Persona::A)
            .collect();
        let mut rng = selection_rng(Some(3));
        for _ in 0..20 {
            let chosen = select_random_from_viable(&a, 0.5, &mut rng).unwrap();
            assert_eq!(chosen.fit_score, 0.75);
        }
    }

    #[test]
    fn test_empty_pool_is_an_error() {
        let mut rng = selection_rng(Some(1));
        let err = select_random_from_viable(&[], 0.0, &mut rng).unwrap_err();
        assert!(matches!(err, PersonaError::NoViableCandidates { .. }));

        let low = vec![candidate("p1", 0, Persona::B, 0.2)];
        let err = select_random_from_viable(&low, 0.5, &mut rng).unwrap_err();
        match err {
            PersonaError::NoViableCandidates { persona, threshold } => {
                assert_eq!(persona, "B");
                assert_eq!(threshold, 0.5);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_candidate_summary_table() {
        let top = select_top_candidates(&pool(), 2);
        let table = format_candidate_summary(&top[&Persona::B], Persona::B, 5);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[1], "Top 5 Candidates for Persona B");
        assert!(lines[3].starts_with("Rank   ID"));
        assert!(lines[5].starts_with("1      p1"));
        assert!(lines[5].ends_with("2024-01-01   0.9000"));
        assert_eq!(lines.len(), 8);
    }

    #[test]
    fn test_config_validation() {
        assert!(SelectionConfig::default().validate().is_ok());
        let bad = SelectionConfig {
            top_k: 0,
            ..SelectionConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
