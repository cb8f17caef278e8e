// ABOUTME: Health check route handler for liveness monitoring
// ABOUTME: Reports service status, the configured provider and whether it is reachable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Wingman Contributors

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

use crate::logging::SERVICE_NAME;
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    /// Liveness stays 200; an unreachable provider marks the service degraded
    async fn handle_health(
        State(resources): State<Arc<ServerResources>>,
    ) -> Json<serde_json::Value> {
        let provider_reachable = match &resources.llm {
            Some(llm) => match llm.health_check().await {
                Ok(reachable) => Some(reachable),
                Err(e) => {
                    warn!(provider = %resources.provider_name, error = %e, "Provider health check failed");
                    Some(false)
                }
            },
            None => None,
        };
        let status = if provider_reachable == Some(false) {
            "degraded"
        } else {
            "healthy"
        };

        Json(serde_json::json!({
            "status": status,
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "provider": resources.provider_name,
            "provider_reachable": provider_reachable,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}
