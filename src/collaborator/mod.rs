//! External services the engine calls out to.
//!
//! The engine is provider-agnostic: it defines the traits and callers plug in their
//! own implementations (an LLM gateway, a model server, the asset register). The
//! in-memory implementations here are deterministic and meant for tests, demos and the
//! CLI's `--mock-collaborators` mode.

use crate::error::CollaboratorError;
use crate::graph::ModelKind;
use ahash::AHashMap;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A request to a text-completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f64>,
}

/// An opaque text-completion provider.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CollaboratorError>;
}

/// A request to an inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    pub model_id: String,
    pub model_kind: ModelKind,
    pub features: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: Value,
    pub confidence: f64,
}

/// A machine-learning inference provider.
#[async_trait]
pub trait InferenceModel: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<Prediction, CollaboratorError>;
}

/// The register of business assets that source-asset nodes read from.
#[async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Returns the asset's exposed fields, or `None` when the id is unknown.
    async fn asset(&self, asset_id: &str) -> Result<Option<Map<String, Value>>, CollaboratorError>;
}

/// The collaborators available to a run. Unset collaborators make the nodes that need
/// them fail with `CollaboratorUnavailable`.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub completion: Option<Arc<dyn TextCompletion>>,
    pub inference: Option<Arc<dyn InferenceModel>>,
    pub assets: Option<Arc<dyn AssetCatalog>>,
}

impl Collaborators {
    /// Wires the deterministic completion and inference mocks. Assets stay unset so
    /// source-asset nodes echo their configured id.
    pub fn mocks() -> Self {
        Self {
            completion: Some(Arc::new(EchoCompletion)),
            inference: Some(Arc::new(WeightedSumModel::default())),
            assets: None,
        }
    }

    pub fn with_assets(mut self, assets: Arc<dyn AssetCatalog>) -> Self {
        self.assets = Some(assets);
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("completion", &self.completion.is_some())
            .field("inference", &self.inference.is_some())
            .field("assets", &self.assets.is_some())
            .finish()
    }
}

/// Answers every prompt with the prompt itself, prefixed by the model id.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoCompletion;

#[async_trait]
impl TextCompletion for EchoCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CollaboratorError> {
        Ok(format!("[{}] {}", request.model, request.prompt))
    }
}

/// Scores the sum of the numeric features.
///
/// Regression returns the score, classification returns `"positive"`/`"negative"`
/// around zero, anomaly flags scores above `anomaly_threshold`, clustering buckets the
/// score into integer clusters.
#[derive(Debug, Clone)]
pub struct WeightedSumModel {
    pub weights: AHashMap<String, f64>,
    pub anomaly_threshold: f64,
}

impl Default for WeightedSumModel {
    fn default() -> Self {
        Self {
            weights: AHashMap::new(),
            anomaly_threshold: 100.0,
        }
    }
}

#[async_trait]
impl InferenceModel for WeightedSumModel {
    async fn infer(&self, request: InferenceRequest) -> Result<Prediction, CollaboratorError> {
        let score: f64 = request
            .features
            .iter()
            .map(|(name, value)| {
                let weight = self.weights.get(name).copied().unwrap_or(1.0);
                crate::value::as_number(value).unwrap_or(0.0) * weight
            })
            .sum();
        let prediction = match request.model_kind {
            ModelKind::Regression => crate::value::number(score),
            ModelKind::Classification => Value::from(if score >= 0.0 {
                "positive"
            } else {
                "negative"
            }),
            ModelKind::Anomaly => Value::Bool(score > self.anomaly_threshold),
            ModelKind::Clustering => Value::from((score / 10.0).floor().max(0.0) as u64),
        };
        let confidence = 1.0 / (1.0 + (-score.abs() / 10.0).exp());
        Ok(Prediction {
            prediction,
            confidence,
        })
    }
}

/// An asset register held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    assets: AHashMap<String, Map<String, Value>>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, asset_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        self.assets.insert(asset_id.into(), fields);
        self
    }
}

#[async_trait]
impl AssetCatalog for InMemoryAssets {
    async fn asset(&self, asset_id: &str) -> Result<Option<Map<String, Value>>, CollaboratorError> {
        Ok(self.assets.get(asset_id).cloned())
    }
}
