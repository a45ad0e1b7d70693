use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{OracleError, Result};

/// Maps a default probability to the signed reputation adjustment:
/// `floor((p - 0.5) * 200)`, in `[-100, 100]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreMapper;

impl ScoreMapper {
    /// Products within this distance of an integer are treated as that integer,
    /// so `0.82` maps to `64` rather than to the floor of `63.99999999999999`.
    const SNAP_EPSILON: f64 = 1e-9;
    
    pub fn map(&self, probability: f64) -> Result<i64> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(OracleError::Scoring(format!(
                "probability {} is outside [0, 1]",
                probability
            )));
        }
        
        let scaled = (probability - 0.5) * 200.0;
        let nearest = scaled.round();
        let delta = if (scaled - nearest).abs() < Self::SNAP_EPSILON {
            nearest
        } else {
            scaled.floor()
        };
        Ok(delta as i64)
    }
}

/// Probability as reported in responses: four decimal places.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round() / 10_000.0
}

/// Named numeric model inputs from one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    /// Accepts a non-empty JSON object whose values are all finite numbers.
    pub fn from_json(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| OracleError::Validation("'features' must be a JSON object".to_string()))?;
        if object.is_empty() {
            return Err(OracleError::Validation("'features' must not be empty".to_string()));
        }
        
        let mut features = BTreeMap::new();
        for (name, value) in object {
            let number = value
                .as_f64()
                .filter(|n| n.is_finite())
                .ok_or_else(|| OracleError::Validation(format!("feature '{}' must be a finite number", name)))?;
            features.insert(name.clone(), number);
        }
        Ok(Self(features))
    }
    
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
    
    pub fn len(&self) -> usize {
        self.0.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Opaque scoring function: features in, probability of default out.
pub trait CreditModel: Send + Sync {
    fn predict_default_probability(&self, features: &FeatureVector) -> Result<f64>;
}

/// Serialized form of [`LogisticModel`], produced by the offline training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature names in the order the coefficients expect.
    pub features: Vec<String>,
    /// Standard-scaler parameters, one per feature.
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Missing features are scored as `0.0` instead of rejected.
    #[serde(default)]
    pub fill_missing: bool,
}

/// Standardize then apply logistic regression.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    artifact: ModelArtifact,
}

impl LogisticModel {
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse model artifact {}", path.display()))?;
        Self::from_artifact(artifact)
    }
    
    pub fn from_artifact(artifact: ModelArtifact) -> AnyResult<Self> {
        let n = artifact.features.len();
        if n == 0 {
            anyhow::bail!("model artifact lists no features");
        }
        if artifact.mean.len() != n || artifact.scale.len() != n || artifact.coefficients.len() != n {
            anyhow::bail!(
                "model artifact dimensions disagree: {} features, {} means, {} scales, {} coefficients",
                n,
                artifact.mean.len(),
                artifact.scale.len(),
                artifact.coefficients.len()
            );
        }
        let all_finite = artifact
            .mean
            .iter()
            .chain(&artifact.scale)
            .chain(&artifact.coefficients)
            .chain(std::iter::once(&artifact.intercept))
            .all(|v| v.is_finite());
        if !all_finite {
            anyhow::bail!("model artifact contains non-finite parameters");
        }
        Ok(Self { artifact })
    }
    
    pub fn feature_names(&self) -> &[String] {
        &self.artifact.features
    }
}

impl CreditModel for LogisticModel {
    fn predict_default_probability(&self, features: &FeatureVector) -> Result<f64> {
        let a = &self.artifact;
        let mut logit = a.intercept;
        
        for (i, name) in a.features.iter().enumerate() {
            let raw = match features.get(name) {
                Some(value) => value,
                None if a.fill_missing => 0.0,
                None => return Err(OracleError::Scoring(format!("missing feature '{}'", name))),
            };
            // Zero-variance features scale by 1, matching the training scaler.
            let scale = if a.scale[i] == 0.0 { 1.0 } else { a.scale[i] };
            logit += a.coefficients[i] * (raw - a.mean[i]) / scale;
        }
        
        let probability = 1.0 / (1.0 + (-logit).exp());
        if !probability.is_finite() {
            return Err(OracleError::Scoring("model produced a non-finite probability".to_string()));
        }
        Ok(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    
    fn artifact() -> ModelArtifact {
        ModelArtifact {
            features: vec!["income".into(), "debt_ratio".into()],
            mean: vec![50_000.0, 0.3],
            scale: vec![10_000.0, 0.1],
            coefficients: vec![-0.5, 2.0],
            intercept: 0.0,
            fill_missing: false,
        }
    }
    
    #[test]
    fn test_score_mapper_scenarios() {
        let mapper = ScoreMapper;
        assert_eq!(mapper.map(0.82).unwrap(), 64);
        assert_eq!(mapper.map(0.5).unwrap(), 0);
        assert_eq!(mapper.map(0.1).unwrap(), -80);
        assert_eq!(mapper.map(0.0).unwrap(), -100);
        assert_eq!(mapper.map(1.0).unwrap(), 100);
        assert_eq!(mapper.map(0.123).unwrap(), -76);
        assert_eq!(mapper.map(0.7777).unwrap(), 55);
    }
    
    #[test]
    fn test_score_mapper_rejects_out_of_range() {
        let mapper = ScoreMapper;
        for p in [-0.01, 1.01, f64::NAN, f64::INFINITY] {
            assert!(matches!(mapper.map(p), Err(OracleError::Scoring(_))), "accepted {}", p);
        }
    }
    
    #[test]
    fn test_round_probability() {
        assert_eq!(round_probability(0.123456), 0.1235);
        assert_eq!(round_probability(0.5), 0.5);
    }
    
    #[test]
    fn test_feature_vector_validation() {
        let features = FeatureVector::from_json(&json!({"income": 42000, "debt_ratio": 0.4})).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features.get("income"), Some(42000.0));
        
        assert!(matches!(FeatureVector::from_json(&json!({})), Err(OracleError::Validation(_))));
        assert!(matches!(FeatureVector::from_json(&json!([1, 2])), Err(OracleError::Validation(_))));
        assert!(matches!(
            FeatureVector::from_json(&json!({"income": "high"})),
            Err(OracleError::Validation(_))
        ));
    }
    
    #[test]
    fn test_logistic_model_at_mean_is_sigmoid_of_intercept() {
        let model = LogisticModel::from_artifact(artifact()).unwrap();
        let features: FeatureVector = [("income".to_string(), 50_000.0), ("debt_ratio".to_string(), 0.3)]
            .into_iter()
            .collect();
        assert!((model.predict_default_probability(&features).unwrap() - 0.5).abs() < 1e-12);
    }
    
    #[test]
    fn test_logistic_model_direction() {
        let model = LogisticModel::from_artifact(artifact()).unwrap();
        let risky: FeatureVector = [("income".to_string(), 30_000.0), ("debt_ratio".to_string(), 0.6)]
            .into_iter()
            .collect();
        let p = model.predict_default_probability(&risky).unwrap();
        // logit = -0.5 * -2 + 2.0 * 3 = 7
        assert!((p - 1.0 / (1.0 + (-7.0f64).exp())).abs() < 1e-12);
    }
    
    #[test]
    fn test_missing_feature_handling() {
        let partial: FeatureVector = [("income".to_string(), 50_000.0)].into_iter().collect();
        
        let strict = LogisticModel::from_artifact(artifact()).unwrap();
        assert!(matches!(
            strict.predict_default_probability(&partial),
            Err(OracleError::Scoring(_))
        ));
        
        let mut lenient = artifact();
        lenient.fill_missing = true;
        let lenient = LogisticModel::from_artifact(lenient).unwrap();
        // debt_ratio 0.0 standardizes to -3
        let p = lenient.predict_default_probability(&partial).unwrap();
        assert!((p - 1.0 / (1.0 + 6.0f64.exp())).abs() < 1e-12);
    }
    
    #[test]
    fn test_artifact_dimension_mismatch() {
        let mut bad = artifact();
        bad.coefficients.pop();
        assert!(LogisticModel::from_artifact(bad).is_err());
    }
    
    #[test]
    fn test_model_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, serde_json::to_string(&artifact()).unwrap()).unwrap();
        let model = LogisticModel::from_file(&path).unwrap();
        assert_eq!(model.feature_names(), &["income".to_string(), "debt_ratio".to_string()]);
        
        assert!(LogisticModel::from_file(dir.path().join("missing.json")).is_err());
    }
}
