//! Backend CRUD and report routes.
//!
//! Each resource follows the same path convention:
//! `/{name}/get`, `/{name}/post`, `/{name}/patch/{id}`, `/{name}/delete/{id}`.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Warehouse,
    Customer,
    Inventory,
    Staff,
    Equipment,
    Transportation,
    Payment,
    Logs,
}

impl Resource {
    pub const ALL: [Self; 8] = [
        Self::Warehouse,
        Self::Customer,
        Self::Inventory,
        Self::Staff,
        Self::Equipment,
        Self::Transportation,
        Self::Payment,
        Self::Logs,
    ];

    #[must_use]
    pub fn segment(self) -> &'static str {
        match self {
            Self::Warehouse => "warehouse",
            Self::Customer => "customer",
            Self::Inventory => "inventory",
            Self::Staff => "staff",
            Self::Equipment => "equipment",
            Self::Transportation => "transportation",
            Self::Payment => "payment",
            Self::Logs => "logs",
        }
    }

    #[must_use]
    pub fn list_path(self) -> String {
        format!("/{}/get", self.segment())
    }

    #[must_use]
    pub fn create_path(self) -> String {
        format!("/{}/post", self.segment())
    }

    #[must_use]
    pub fn update_path(self, id: &str) -> String {
        format!("/{}/patch/{id}", self.segment())
    }

    #[must_use]
    pub fn delete_path(self, id: &str) -> String {
        format!("/{}/delete/{id}", self.segment())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            // The console calls the staff route "employee".
            "employee" => return Ok(Self::Staff),
            "log" => return Ok(Self::Logs),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|r| r.segment() == lowered)
            .ok_or_else(|| format!("unknown resource: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    StockSummary,
    LowCapacityAlerts,
}

impl Report {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::StockSummary => "/reports/stock-summary",
            Self::LowCapacityAlerts => "/reports/low-capacity-alerts",
        }
    }
}

impl FromStr for Report {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stock-summary" => Ok(Self::StockSummary),
            "low-capacity-alerts" => Ok(Self::LowCapacityAlerts),
            other => Err(format!("unknown report: {other}")),
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Data-fetching helpers over a gateway. Bodies are passed through as JSON.
pub struct Resources<'g> {
    gateway: &'g Gateway,
}

impl<'g> Resources<'g> {
    #[must_use]
    pub fn new(gateway: &'g Gateway) -> Self {
        Self { gateway }
    }

    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn list(&self, resource: Resource) -> Result<Value, GatewayError> {
        self.gateway
            .request(Method::GET, &resource.list_path(), None)
            .await
    }

    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn create(&self, resource: Resource, record: Value) -> Result<Value, GatewayError> {
        self.gateway
            .request(Method::POST, &resource.create_path(), Some(record))
            .await
    }

    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn update(&self, resource: Resource, id: &str, record: Value) -> Result<Value, GatewayError> {
        self.gateway
            .request(Method::PATCH, &resource.update_path(id), Some(record))
            .await
    }

    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn delete(&self, resource: Resource, id: &str) -> Result<Value, GatewayError> {
        self.gateway
            .request(Method::DELETE, &resource.delete_path(id), None)
            .await
    }

    /// # Errors
    ///
    /// Whatever the gateway surfaced.
    pub async fn report(&self, report: Report) -> Result<Value, GatewayError> {
        self.gateway
            .request(Method::GET, report.path(), None)
            .await
    }
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
