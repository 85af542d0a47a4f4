use tracing::debug;

use crate::dataset::Population;
use crate::error::{Result, ScoutError};
use crate::features::{FeatureMatrix, VectorizerConfig};
use crate::player::{PlayerId, PlayerRecord, Position};

pub const DEFAULT_K: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    Cosine,
    /// `1 / (1 + distance)`, so identical vectors score 1.
    Euclidean,
}

impl Metric {
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cosine" => Some(Metric::Cosine),
            "euclidean" | "l2" => Some(Metric::Euclidean),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
        }
    }

    pub fn score(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::Cosine => cosine(a, b),
            Metric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        }
    }
}

pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0)
}

pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexConfig {
    pub vectorizer: VectorizerConfig,
    pub metric: Metric,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarPlayer {
    pub rank: usize,
    pub id: PlayerId,
    pub score: f64,
}

/// Top-K request with optional candidate filters. Filters apply before
/// truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarQuery {
    pub k: usize,
    pub position: Option<Position>,
    pub competition: Option<String>,
}

impl Default for SimilarQuery {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            position: None,
            competition: None,
        }
    }
}

impl SimilarQuery {
    pub fn top(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    fn accepts(&self, candidate: &PlayerRecord) -> bool {
        if let Some(pos) = self.position
            && candidate.main_position != pos
        {
            return false;
        }
        if let Some(comp) = &self.competition
            && !candidate.comp.eq_ignore_ascii_case(comp.trim())
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub field: String,
    pub a: Option<f64>,
    pub b: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub a: PlayerId,
    pub b: PlayerId,
    pub rows: Vec<ComparisonRow>,
    pub score: f64,
}

/// Owns the population and its feature matrix. Queries are brute-force
/// scans and never mutate the index.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    population: Population,
    matrix: FeatureMatrix,
    metric: Metric,
}

impl SimilarityIndex {
    pub fn build(population: Population, config: &IndexConfig) -> Result<Self> {
        let matrix = FeatureMatrix::build(&population, &config.vectorizer)?;
        debug!(
            players = population.len(),
            dimension = matrix.dimension(),
            metric = config.metric.label(),
            "similarity index ready"
        );
        Ok(Self {
            population,
            matrix,
            metric: config.metric,
        })
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn matrix(&self) -> &FeatureMatrix {
        &self.matrix
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn vector_for(&self, id: PlayerId) -> Result<&[f64]> {
        self.matrix
            .vector(id)
            .ok_or_else(|| ScoutError::NotFound(format!("player {id}")))
    }

    pub fn find_similar(&self, id: PlayerId, k: usize) -> Result<Vec<SimilarPlayer>> {
        self.find_similar_with(id, &SimilarQuery::top(k))
    }

    pub fn find_similar_with(
        &self,
        id: PlayerId,
        query: &SimilarQuery,
    ) -> Result<Vec<SimilarPlayer>> {
        let row = self
            .matrix
            .row_of(id)
            .ok_or_else(|| ScoutError::NotFound(format!("player {id}")))?;
        if query.k == 0 {
            return Ok(Vec::new());
        }
        let target = self.matrix.vector_at(row);
        let players = self.population.players();

        let mut scored: Vec<(usize, f64)> = (0..self.matrix.len())
            .filter(|&i| i != row)
            .filter(|&i| query.accepts(&players[i]))
            .map(|i| (i, self.metric.score(target, self.matrix.vector_at(i))))
            .collect();
        // stable sort keeps dataset order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(query.k);

        let ids = self.matrix.ids();
        let out: Vec<SimilarPlayer> = scored
            .into_iter()
            .enumerate()
            .map(|(n, (i, score))| SimilarPlayer {
                rank: n + 1,
                id: ids[i],
                score,
            })
            .collect();
        debug!(player = %id, k = query.k, returned = out.len(), "similarity query");
        Ok(out)
    }

    pub fn find_similar_by_name(&self, name: &str, k: usize) -> Result<Vec<SimilarPlayer>> {
        let player = self.population.find_by_name(name)?;
        self.find_similar(player.id, k)
    }

    pub fn score_between(&self, a: PlayerId, b: PlayerId) -> Result<f64> {
        Ok(self.metric.score(self.vector_for(a)?, self.vector_for(b)?))
    }

    pub fn compare(&self, a: PlayerId, b: PlayerId) -> Result<Comparison> {
        let score = self.score_between(a, b)?;
        let pa = self.population.get(a)?;
        let pb = self.population.get(b)?;
        let rows = self
            .matrix
            .fields()
            .iter()
            .map(|field| ComparisonRow {
                field: field.clone(),
                a: pa.stat(field),
                b: pb.stat(field),
            })
            .collect();
        Ok(Comparison { a, b, rows, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureSet;

    fn index(rows: &[(u32, f64, f64, &str)]) -> SimilarityIndex {
        let players = rows
            .iter()
            .map(|(id, x, y, pos)| {
                PlayerRecord::new(PlayerId(*id), format!("P{id}"), *pos, "Club", "League")
                    .with_stat("X", *x)
                    .with_stat("Y", *y)
            })
            .collect();
        let population =
            Population::from_records(vec!["X".into(), "Y".into()], players).unwrap();
        let config = IndexConfig {
            vectorizer: VectorizerConfig {
                features: FeatureSet::Custom(vec!["X".into(), "Y".into()]),
                ..VectorizerConfig::default()
            },
            metric: Metric::Cosine,
        };
        SimilarityIndex::build(population, &config).unwrap()
    }

    #[test]
    fn cosine_of_zero_vector_is_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert!((cosine(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-12);
        assert!((cosine(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn euclidean_similarity_of_identical_vectors_is_one() {
        assert_eq!(Metric::Euclidean.score(&[0.3, 0.4], &[0.3, 0.4]), 1.0);
        assert_eq!(Metric::Euclidean.score(&[0.0, 0.0], &[3.0, 4.0]), 1.0 / 6.0);
    }

    #[test]
    fn ranks_and_excludes_query() {
        let idx = index(&[(1, 1.0, 0.0, "FW"), (2, 1.0, 0.0, "FW"), (3, 0.0, 1.0, "DF")]);
        let out = idx.find_similar(PlayerId(1), 2).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, PlayerId(2));
        assert_eq!(out[0].rank, 1);
        assert!((out[0].score - 1.0).abs() < 1e-12);
        assert_eq!(out[1].id, PlayerId(3));
        assert_eq!(out[1].score, 0.0);
    }

    #[test]
    fn ties_keep_dataset_order() {
        let idx = index(&[
            (1, 1.0, 0.0, "FW"),
            (5, 1.0, 0.0, "FW"),
            (3, 1.0, 0.0, "FW"),
            (4, 1.0, 0.0, "FW"),
        ]);
        let ids: Vec<u32> = idx
            .find_similar(PlayerId(3), 5)
            .unwrap()
            .iter()
            .map(|s| s.id.0)
            .collect();
        assert_eq!(ids, vec![1, 5, 4]);
    }

    #[test]
    fn filters_apply_before_truncation() {
        let idx = index(&[
            (1, 1.0, 0.0, "FW"),
            (2, 1.0, 0.0, "MF"),
            (3, 1.0, 0.1, "MF"),
            (4, 0.0, 1.0, "DF"),
            (5, 0.2, 1.0, "DF"),
        ]);
        let query = SimilarQuery {
            k: 2,
            position: Some(Position::Defender),
            competition: None,
        };
        let out = idx.find_similar_with(PlayerId(1), &query).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.id.0 >= 4));
    }

    #[test]
    fn k_zero_and_unknown_id() {
        let idx = index(&[(1, 1.0, 0.0, "FW"), (2, 0.0, 1.0, "FW")]);
        assert!(idx.find_similar(PlayerId(1), 0).unwrap().is_empty());
        assert!(idx.find_similar(PlayerId(99), 5).unwrap_err().is_not_found());
        assert!(idx.vector_for(PlayerId(99)).unwrap_err().is_not_found());
    }

    #[test]
    fn compare_reports_raw_values_and_score() {
        let idx = index(&[(1, 4.0, 0.0, "FW"), (2, 2.0, 3.0, "FW")]);
        let cmp = idx.compare(PlayerId(1), PlayerId(2)).unwrap();
        assert_eq!(cmp.rows.len(), 2);
        assert_eq!(cmp.rows[0].field, "X");
        assert_eq!(cmp.rows[0].a, Some(4.0));
        assert_eq!(cmp.rows[1].b, Some(3.0));
        assert_eq!(cmp.score, idx.score_between(PlayerId(2), PlayerId(1)).unwrap());
    }
}
