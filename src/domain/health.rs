//! Health endpoint payloads.

use serde::Serialize;

use crate::resilience::CircuitState;

/// Health of one upstream dependency, derived from its breaker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub name: String,
    pub status: &'static str,
    pub circuit: String,
    pub available_slots: usize,
}

impl ServiceHealth {
    pub fn from_circuit(name: &str, state: CircuitState, available_slots: usize) -> Self {
        let status = match state {
            CircuitState::Closed => "healthy",
            CircuitState::HalfOpen | CircuitState::Open => "degraded",
        };
        Self {
            name: name.to_string(),
            status,
            circuit: state.to_string(),
            available_slots,
        }
    }
}

/// `GET /healthz` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub services: Vec<ServiceHealth>,
}

impl HealthStatus {
    pub fn from_services(services: Vec<ServiceHealth>) -> Self {
        let status = if services.iter().all(|s| s.status == "healthy") {
            "healthy"
        } else {
            "degraded"
        };
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status() {
        let all_closed = HealthStatus::from_services(vec![
            ServiceHealth::from_circuit("profile", CircuitState::Closed, 50),
            ServiceHealth::from_circuit("agent", CircuitState::Closed, 50),
        ]);
        assert_eq!(all_closed.status, "healthy");

        let one_open = HealthStatus::from_services(vec![
            ServiceHealth::from_circuit("profile", CircuitState::Closed, 50),
            ServiceHealth::from_circuit("agent", CircuitState::Open, 50),
        ]);
        assert_eq!(one_open.status, "degraded");
        assert_eq!(one_open.services[1].circuit, "open");
    }
}
