use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::PostgrestClient;

use crate::models::{Provider, ProviderError, WeeklySchedule};

/// Durable registry of providers and their working-hours policies.
#[async_trait]
pub trait ProviderDirectory: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Provider, ProviderError>;

    /// Like `get` but treats an inactive provider as absent.
    async fn get_active(&self, id: Uuid) -> Result<Provider, ProviderError>;

    async fn list_active(&self) -> Result<Vec<Provider>, ProviderError>;

    async fn create(&self, provider: Provider) -> Result<Provider, ProviderError>;

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
    ) -> Result<Provider, ProviderError>;
}

// ==============================================================================
// IN-MEMORY DIRECTORY
// ==============================================================================

/// Process-local directory used by tests and standalone deployments.
#[derive(Default)]
pub struct MemoryProviderDirectory {
    providers: RwLock<HashMap<Uuid, Provider>>,
}

impl MemoryProviderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> Arc<dyn ProviderDirectory> {
        Arc::new(self)
    }
}

#[async_trait]
impl ProviderDirectory for MemoryProviderDirectory {
    async fn get(&self, id: Uuid) -> Result<Provider, ProviderError> {
        let providers = self.providers.read().expect("provider map poisoned");
        providers.get(&id).cloned().ok_or(ProviderError::NotFound)
    }

    async fn get_active(&self, id: Uuid) -> Result<Provider, ProviderError> {
        let provider = self.get(id).await?;
        if !provider.is_active {
            return Err(ProviderError::NotFound);
        }
        Ok(provider)
    }

    async fn list_active(&self) -> Result<Vec<Provider>, ProviderError> {
        let providers = self.providers.read().expect("provider map poisoned");
        let mut active: Vec<Provider> = providers.values().filter(|p| p.is_active).cloned().collect();
        active.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(active)
    }

    async fn create(&self, provider: Provider) -> Result<Provider, ProviderError> {
        provider.schedule.validate()?;
        let mut providers = self.providers.write().expect("provider map poisoned");
        providers.insert(provider.id, provider.clone());
        Ok(provider)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
    ) -> Result<Provider, ProviderError> {
        schedule.validate()?;
        let mut providers = self.providers.write().expect("provider map poisoned");
        let provider = providers.get_mut(&id).ok_or(ProviderError::NotFound)?;
        provider.schedule = schedule;
        provider.updated_at = Utc::now();
        Ok(provider.clone())
    }
}

// ==============================================================================
// POSTGREST-BACKED DIRECTORY
// ==============================================================================

pub struct PostgrestProviderDirectory {
    client: Arc<PostgrestClient>,
}

impl PostgrestProviderDirectory {
    pub fn new(client: Arc<PostgrestClient>) -> Self {
        Self { client }
    }

    fn parse_one(result: Vec<Value>) -> Result<Provider, ProviderError> {
        let row = result.into_iter().next().ok_or(ProviderError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| ProviderError::Store(format!("Failed to parse provider: {}", e)))
    }
}

#[async_trait]
impl ProviderDirectory for PostgrestProviderDirectory {
    async fn get(&self, id: Uuid) -> Result<Provider, ProviderError> {
        debug!("Fetching provider: {}", id);

        let path = format!("/rest/v1/providers?id=eq.{}", id);
        let result: Vec<Value> = self.client.request(Method::GET, &path, None).await?;
        Self::parse_one(result)
    }

    async fn get_active(&self, id: Uuid) -> Result<Provider, ProviderError> {
        let path = format!("/rest/v1/providers?id=eq.{}&is_active=eq.true", id);
        let result: Vec<Value> = self.client.request(Method::GET, &path, None).await?;
        Self::parse_one(result)
    }

    async fn list_active(&self) -> Result<Vec<Provider>, ProviderError> {
        let path = "/rest/v1/providers?is_active=eq.true&order=display_name.asc";
        let result: Vec<Value> = self.client.request(Method::GET, path, None).await?;

        result
            .into_iter()
            .map(|row| serde_json::from_value(row))
            .collect::<Result<Vec<Provider>, _>>()
            .map_err(|e| ProviderError::Store(format!("Failed to parse providers: {}", e)))
    }

    async fn create(&self, provider: Provider) -> Result<Provider, ProviderError> {
        provider.schedule.validate()?;
        debug!("Creating provider {}", provider.id);

        let body = serde_json::to_value(&provider)
            .map_err(|e| ProviderError::Store(e.to_string()))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .client
            .request_with_headers(Method::POST, "/rest/v1/providers", Some(body), Some(headers))
            .await?;

        Self::parse_one(result)
    }

    async fn update_schedule(
        &self,
        id: Uuid,
        schedule: WeeklySchedule,
    ) -> Result<Provider, ProviderError> {
        schedule.validate()?;
        debug!("Updating schedule for provider {}", id);

        let update = json!({
            "schedule": schedule,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let path = format!("/rest/v1/providers?id=eq.{}", id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .client
            .request_with_headers(Method::PATCH, &path, Some(update), Some(headers))
            .await?;

        Self::parse_one(result)
    }
}
