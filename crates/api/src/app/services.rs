use std::sync::Arc;

use anyhow::Context;
use sqlx::SqlitePool;

use meditrust_forecast::{ArtifactPaths, DemandForecaster, DemandPredictor, InferenceBackend};
use meditrust_infra::{CatalogRepository, OrderRepository};
use meditrust_license::{BertLicenseClassifier, LicenseClassifier};

use crate::config::ServiceConfig;

/// Shared state behind every handler.
///
/// Models are optional: the service starts without them and the endpoints
/// that need one answer `model_unavailable`.
pub struct AppServices {
    pub catalog: CatalogRepository,
    pub orders: OrderRepository,
    forecaster: Option<Arc<dyn DemandForecaster>>,
    license: Option<Arc<dyn LicenseClassifier>>,
}

impl AppServices {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            catalog: CatalogRepository::new(pool.clone()),
            orders: OrderRepository::new(pool),
            forecaster: None,
            license: None,
        }
    }

    pub fn with_forecaster(mut self, forecaster: Arc<dyn DemandForecaster>) -> Self {
        self.forecaster = Some(forecaster);
        self
    }

    pub fn with_license_classifier(mut self, classifier: Arc<dyn LicenseClassifier>) -> Self {
        self.license = Some(classifier);
        self
    }

    pub fn forecaster(&self) -> Option<Arc<dyn DemandForecaster>> {
        self.forecaster.clone()
    }

    pub fn license_classifier(&self) -> Option<Arc<dyn LicenseClassifier>> {
        self.license.clone()
    }
}

/// Connect the store and load both models from disk.
///
/// A missing or broken model is logged and left unloaded; a store failure is
/// fatal.
pub async fn build_services(config: &ServiceConfig) -> anyhow::Result<AppServices> {
    let pool = meditrust_infra::connect(&config.database_url, config.db_pool)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let mut services = AppServices::new(pool);

    let paths = ArtifactPaths::new(&config.artifacts_dir);
    let demand = tokio::task::spawn_blocking(move || {
        DemandPredictor::<InferenceBackend>::load(&paths, Default::default())
    })
    .await
    .context("demand model loader panicked")?;
    match demand {
        Ok(predictor) => services = services.with_forecaster(Arc::new(predictor)),
        Err(e) => tracing::warn!(
            dir = %config.artifacts_dir.display(),
            error = %e,
            "demand model not loaded; prediction endpoints disabled"
        ),
    }

    let license_dir = config.license_model_dir.clone();
    let license = tokio::task::spawn_blocking(move || BertLicenseClassifier::load(&license_dir))
        .await
        .context("license model loader panicked")?;
    match license {
        Ok(classifier) => services = services.with_license_classifier(Arc::new(classifier)),
        Err(e) => tracing::warn!(
            dir = %config.license_model_dir.display(),
            error = %e,
            "license model not loaded; verification endpoint disabled"
        ),
    }

    Ok(services)
}
