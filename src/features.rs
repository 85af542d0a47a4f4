use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dataset::Population;
use crate::error::{Result, ScoutError};
use crate::player::{PlayerId, PlayerRecord, Position};

pub const COMMON_FEATURES: &[&str] = &[
    "Gls", "Ast", "G+A", "xG", "xAG", "Cmp", "Att", "PrgP", "Tkl", "TklW", "Int", "Touches",
    "Carries", "PrgC", "PrgR", "90s",
];

pub const FORWARD_FEATURES: &[&str] = &[
    "Gls", "Ast", "G+A", "xG", "xAG", "npxG", "G-PK", "Sh", "SoT", "Sh/90", "SoT/90", "G-xG",
    "Touches", "Carries", "PrgC", "PrgR", "KP", "PPA", "CrsPA", "90s",
];

pub const MIDFIELDER_FEATURES: &[&str] = &[
    "Gls", "Ast", "G+A", "xG", "xAG", "Cmp", "Att", "TotDist", "PrgDist", "KP", "1/3", "PPA",
    "PrgP", "Tkl", "TklW", "Int", "Touches", "Carries", "PrgC", "PrgR", "90s",
];

pub const DEFENDER_FEATURES: &[&str] = &[
    "Tkl", "TklW", "Def 3rd", "Mid 3rd", "Int", "Clr", "Err", "Cmp", "Att", "TotDist", "PrgDist",
    "PrgP", "Touches", "Carries", "PrgC", "Ast", "xAG", "90s",
];

pub const GOALKEEPER_FEATURES: &[&str] = &["90s", "MP", "Starts", "Min"];

/// Which statistic columns make up a feature vector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeatureSet {
    #[default]
    Common,
    Forward,
    Midfielder,
    Defender,
    Goalkeeper,
    Custom(Vec<String>),
}

impl FeatureSet {
    pub fn for_position(pos: Position) -> Self {
        match pos {
            Position::Forward => FeatureSet::Forward,
            Position::Midfielder => FeatureSet::Midfielder,
            Position::Defender => FeatureSet::Defender,
            Position::Goalkeeper => FeatureSet::Goalkeeper,
            Position::Unknown => FeatureSet::Common,
        }
    }

    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "common" | "all" => Some(FeatureSet::Common),
            "fw" | "forward" => Some(FeatureSet::Forward),
            "mf" | "midfielder" => Some(FeatureSet::Midfielder),
            "df" | "defender" => Some(FeatureSet::Defender),
            "gk" | "goalkeeper" => Some(FeatureSet::Goalkeeper),
            _ => None,
        }
    }

    pub fn fields(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            FeatureSet::Common => COMMON_FEATURES,
            FeatureSet::Forward => FORWARD_FEATURES,
            FeatureSet::Midfielder => MIDFIELDER_FEATURES,
            FeatureSet::Defender => DEFENDER_FEATURES,
            FeatureSet::Goalkeeper => GOALKEEPER_FEATURES,
            FeatureSet::Custom(fields) => return fields.clone(),
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeatureSet::Common => "common",
            FeatureSet::Forward => "forward",
            FeatureSet::Midfielder => "midfielder",
            FeatureSet::Defender => "defender",
            FeatureSet::Goalkeeper => "goalkeeper",
            FeatureSet::Custom(_) => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scaling {
    #[default]
    MinMax,
    ZScore,
}

impl Scaling {
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "minmax" | "min-max" => Some(Scaling::MinMax),
            "zscore" | "z-score" | "standard" => Some(Scaling::ZScore),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scaling::MinMax => "min-max",
            Scaling::ZScore => "z-score",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    #[default]
    Zero,
    Mean,
}

impl MissingPolicy {
    pub fn from_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zero" | "0" => Some(MissingPolicy::Zero),
            "mean" => Some(MissingPolicy::Mean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorizerConfig {
    pub features: FeatureSet,
    pub scaling: Scaling,
    pub missing: MissingPolicy,
    /// Drop configured fields that the dataset lacks instead of failing.
    pub allow_partial: bool,
}

/// Population parameters for one field, fitted once at build time.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldParams {
    pub name: String,
    pub fill: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

const STD_EPSILON: f64 = 1e-12;

impl FieldParams {
    fn fit(name: &str, raw: &[Option<f64>], missing: MissingPolicy) -> Self {
        let present: Vec<f64> = raw.iter().flatten().copied().collect();
        let fill = match missing {
            MissingPolicy::Zero => 0.0,
            MissingPolicy::Mean if present.is_empty() => 0.0,
            MissingPolicy::Mean => present.iter().sum::<f64>() / present.len() as f64,
        };
        let values: Vec<f64> = raw.iter().map(|v| v.unwrap_or(fill)).collect();
        if values.is_empty() {
            return Self {
                name: name.to_string(),
                fill,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                std: 0.0,
            };
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self {
            name: name.to_string(),
            fill,
            min,
            max,
            mean,
            std: var.sqrt(),
        }
    }

    /// Whether every parameter `scaling` reads is finite. Sums of values
    /// near `f64::MAX` overflow, and the scaled vectors would carry NaN.
    pub fn is_finite_for(&self, scaling: Scaling) -> bool {
        let bounds = [self.fill, self.min, self.max, self.max - self.min];
        let moments = [self.mean, self.std];
        bounds.iter().all(|v| v.is_finite())
            && (scaling == Scaling::MinMax || moments.iter().all(|v| v.is_finite()))
    }

    pub fn scale(&self, raw: Option<f64>, scaling: Scaling) -> f64 {
        let v = raw.filter(|v| v.is_finite()).unwrap_or(self.fill);
        match scaling {
            Scaling::MinMax => {
                let range = self.max - self.min;
                if range <= STD_EPSILON {
                    0.0
                } else {
                    (v - self.min) / range
                }
            }
            Scaling::ZScore => {
                if self.std <= STD_EPSILON {
                    0.0
                } else {
                    (v - self.mean) / self.std
                }
            }
        }
    }
}

/// One scaled vector per player, all sharing the same field order and the
/// same population parameters.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    fields: Vec<String>,
    params: Vec<FieldParams>,
    scaling: Scaling,
    ids: Vec<PlayerId>,
    rows: HashMap<PlayerId, usize>,
    vectors: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn build(population: &Population, config: &VectorizerConfig) -> Result<Self> {
        let configured = config.features.fields();
        if configured.is_empty() {
            return Err(ScoutError::Data("no feature fields configured".to_string()));
        }

        let (fields, absent): (Vec<String>, Vec<String>) = configured
            .into_iter()
            .partition(|f| population.has_column(f));
        if !absent.is_empty() {
            if !config.allow_partial {
                return Err(ScoutError::Data(format!(
                    "dataset is missing feature columns: {}",
                    absent.join(", ")
                )));
            }
            warn!(
                feature_set = config.features.label(),
                missing = %absent.join(", "),
                "dropping feature columns absent from dataset"
            );
        }
        if fields.is_empty() {
            return Err(ScoutError::Data(
                "none of the configured feature columns exist in the dataset".to_string(),
            ));
        }

        let players = population.players();
        let params: Vec<FieldParams> = fields
            .iter()
            .map(|field| {
                let raw: Vec<Option<f64>> = players.iter().map(|p| p.stat(field)).collect();
                FieldParams::fit(field, &raw, config.missing)
            })
            .collect();
        if let Some(bad) = params.iter().find(|p| !p.is_finite_for(config.scaling)) {
            return Err(ScoutError::Data(format!(
                "feature column {} has values too large to scale",
                bad.name
            )));
        }

        let vectors: Vec<Vec<f64>> = players
            .iter()
            .map(|p| scale_record(p, &params, config.scaling))
            .collect();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id).collect();
        let rows = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        debug!(
            players = ids.len(),
            dimension = fields.len(),
            scaling = config.scaling.label(),
            "built feature matrix"
        );

        Ok(Self {
            fields,
            params,
            scaling: config.scaling,
            ids,
            rows,
            vectors,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn dimension(&self) -> usize {
        self.fields.len()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn params(&self) -> &[FieldParams] {
        &self.params
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    pub fn ids(&self) -> &[PlayerId] {
        &self.ids
    }

    pub fn row_of(&self, id: PlayerId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    pub fn vector_at(&self, row: usize) -> &[f64] {
        &self.vectors[row]
    }

    pub fn vector(&self, id: PlayerId) -> Option<&[f64]> {
        self.row_of(id).map(|row| self.vectors[row].as_slice())
    }

    /// Applies the stored population parameters to an arbitrary raw row.
    pub fn transform(&self, raw: &[Option<f64>]) -> Result<Vec<f64>> {
        if raw.len() != self.dimension() {
            return Err(ScoutError::Data(format!(
                "expected {} raw values, got {}",
                self.dimension(),
                raw.len()
            )));
        }
        Ok(self
            .params
            .iter()
            .zip(raw)
            .map(|(p, v)| p.scale(*v, self.scaling))
            .collect())
    }

    pub fn raw_values(&self, player: &PlayerRecord) -> Vec<Option<f64>> {
        self.fields.iter().map(|f| player.stat(f)).collect()
    }
}

fn scale_record(player: &PlayerRecord, params: &[FieldParams], scaling: Scaling) -> Vec<f64> {
    params
        .iter()
        .map(|p| p.scale(player.stat(&p.name), scaling))
        .collect()
}
