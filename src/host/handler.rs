//! Command routing from bridge envelopes onto the catalog façade.

use gourmet_query::{Catalog, QueryExecutor};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{HostError, Result};
use crate::host::contract::{
    CommandEnvelope, CommandName, EVENT_VERSION, PagePayload, RegionPayload, ResponseEnvelope,
};

/// Routes validated command envelopes to a shared [`Catalog`].
pub struct CatalogHandler<E> {
    catalog: Arc<Catalog<E>>,
}

impl<E> Clone for CatalogHandler<E> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<E: QueryExecutor> CatalogHandler<E> {
    pub fn new(catalog: Arc<Catalog<E>>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog<E> {
        &self.catalog
    }

    /// Handle one envelope. Failures become error envelopes; this never fails.
    pub async fn handle(
        &self,
        envelope: CommandEnvelope,
        cancel: CancellationToken,
    ) -> ResponseEnvelope {
        if let Err(e) = envelope.validate() {
            tracing::warn!(request_id = %envelope.request_id, error = %e, "invalid envelope");
            return ResponseEnvelope::error(envelope.request_id, "invalid_envelope", e.to_string());
        }

        let command = envelope.command;
        match self.route(&envelope, &cancel).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    request_id = %envelope.request_id,
                    command = command.as_str(),
                    error = %e,
                    "command failed"
                );
                ResponseEnvelope::error(envelope.request_id, e.kind(), e.to_string())
            }
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(
        &self,
        envelope: &CommandEnvelope,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        match envelope.command {
            CommandName::HostPing => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"pong": true, "contract_version": EVENT_VERSION}),
            )),
            CommandName::CatalogPage => self.handle_page(envelope, cancel).await,
            CommandName::CatalogMeta => self.handle_meta(envelope, cancel).await,
            CommandName::CatalogCuisines => self.handle_cuisines(envelope, cancel).await,
            CommandName::RuntimeStop => Ok(ResponseEnvelope::ok(
                envelope.request_id.clone(),
                serde_json::json!({"accepted": true}),
            )),
        }
    }

    async fn handle_page(
        &self,
        envelope: &CommandEnvelope,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let payload: PagePayload = parse_payload(envelope)?;
        if payload.has_filters() {
            tracing::debug!(
                request_id = %envelope.request_id,
                cuisines = ?payload.cuisines,
                price_min = ?payload.price_min,
                price_max = ?payload.price_max,
                "page filters ignored"
            );
        }

        let items = self
            .catalog
            .page_query(&payload.region, payload.page, &payload.source, cancel)
            .await?;
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            to_payload(&items)?,
        ))
    }

    async fn handle_meta(
        &self,
        envelope: &CommandEnvelope,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let payload: RegionPayload = parse_payload(envelope)?;
        let meta = self
            .catalog
            .meta_query(&payload.region, &payload.source, cancel)
            .await?;
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            to_payload(meta.as_ref())?,
        ))
    }

    async fn handle_cuisines(
        &self,
        envelope: &CommandEnvelope,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        let payload: RegionPayload = parse_payload(envelope)?;
        let counts = self
            .catalog
            .cuisine_counts(&payload.region, &payload.source, cancel)
            .await?;
        Ok(ResponseEnvelope::ok(
            envelope.request_id.clone(),
            serde_json::json!({ "cuisines": to_payload(&counts)? }),
        ))
    }
}

fn parse_payload<T: DeserializeOwned>(envelope: &CommandEnvelope) -> Result<T> {
    serde_json::from_value(envelope.payload.clone()).map_err(|e| {
        HostError::InvalidPayload(format!("{}: {e}", envelope.command.as_str()))
    })
}

fn to_payload<T: serde::Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| HostError::Channel(format!("failed to serialize response payload: {e}")))
}
