use crate::cache::GraphCache;
use crate::methods::{ComparisonContainer, ScoreKey};
use anyhow::anyhow;
use std::fmt;

/// A pair that could not be scored, with the column that failed.
#[derive(Debug)]
pub struct PairFailure {
    pub column: ScoreKey,
    pub error: anyhow::Error,
}

impl fmt::Display for PairFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {:#}", self.column, self.error) }
}

impl std::error::Error for PairFailure {}

/// Score one document pair on every column. Stateless: the caches are only read.
///
/// The container is returned whole or not at all, so a pair is never published with a
/// partial score set.
pub fn compare_pair(a: &GraphCache<'_>, b: &GraphCache<'_>, columns: &[ScoreKey]) -> Result<ComparisonContainer, PairFailure> {
    let (first, second) = if a.title() <= b.title() { (a, b) } else { (b, a) };
    let mut container = ComparisonContainer::new(first.title(), second.title());
    for column in columns {
        let fail = |error| PairFailure { column: column.clone(), error };
        let g1 = first.graph(column).map_err(fail)?;
        let g2 = second.graph(column).map_err(fail)?;
        let score = g1.value_similarity(&g2);
        if !(0.0..=1.0).contains(&score) {
            return Err(fail(anyhow!("similarity {score} outside [0, 1]")));
        }
        container.scores.insert(column.clone(), score);
    }
    Ok(container)
}
