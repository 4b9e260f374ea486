// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Circulation Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - where the catalog lives and how to authenticate against it
// - orchestrator timing (per-call timeout, loan period)
// - the item status codes written on checkout and return
// - policies registered at start-up
// - logging settings

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::catalog::{CatalogScope, Credential};
use super::item::ItemStatus;
use super::loan::LOAN_PERIOD_SECS;
use super::policy::PolicyDefinition;

pub const API_VERSION: &str = "circulation.hbz/v1";
pub const KIND: &str = "CirculationConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CirculationConfigManifest {
    /// API version (must be "circulation.hbz/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "CirculationConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: CirculationConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Deployment name, used in logs
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CirculationConfigSpec {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Policies registered when the service starts
    #[serde(default)]
    pub policies: Vec<PolicyDefinition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog REST API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Path prefix of the patron collection, with trailing slash
    #[serde(default = "default_patrons_path")]
    pub patrons_path: String,

    /// Path prefix of the item collection, with trailing slash
    #[serde(default = "default_items_path")]
    pub items_path: String,

    /// Tenant sent as `X-Okapi-Tenant`
    #[serde(default = "default_tenant")]
    pub tenant: String,

    /// Credential sent as `authorization` (supports "env:VAR_NAME")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    /// TCP connect timeout for the HTTP client
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            patrons_path: default_patrons_path(),
            items_path: default_items_path(),
            tenant: default_tenant(),
            credential: None,
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl CatalogConfig {
    /// Resolve the configured credential, reading `env:` references from the
    /// process environment.
    pub fn resolve_credential(&self) -> anyhow::Result<Credential> {
        let raw = self
            .credential
            .as_deref()
            .context("spec.catalog.credential is not configured")?;

        match raw.strip_prefix("env:") {
            Some(var) => {
                let value = std::env::var(var)
                    .with_context(|| format!("Catalog credential variable {} is not set", var))?;
                Ok(Credential::new(value))
            }
            None => Ok(Credential::new(raw)),
        }
    }

    /// Scope used for every catalog call made on behalf of this deployment
    pub fn scope(&self) -> anyhow::Result<CatalogScope> {
        Ok(CatalogScope::new(self.tenant.as_str(), self.resolve_credential()?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Deadline for each individual catalog call
    #[serde(with = "humantime_serde", default = "default_call_timeout")]
    pub call_timeout: Duration,

    /// Loan window applied on checkout and renewal
    #[serde(with = "humantime_serde", default = "default_loan_period")]
    pub loan_period: Duration,

    /// Status written to an item when it is checked out
    #[serde(default = "ItemStatus::on_loan")]
    pub on_loan_status: ItemStatus,

    /// Status written to an item when it is returned
    #[serde(default = "ItemStatus::available")]
    pub available_status: ItemStatus,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: default_call_timeout(),
            loan_period: default_loan_period(),
            on_loan_status: ItemStatus::on_loan(),
            available_status: ItemStatus::available(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_endpoint() -> String {
    "http://localhost:9130".to_string()
}

fn default_patrons_path() -> String {
    "/patrons/".to_string()
}

fn default_items_path() -> String {
    "/items/".to_string()
}

fn default_tenant() -> String {
    "hbz".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_call_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_loan_period() -> Duration {
    Duration::from_secs(LOAN_PERIOD_SECS as u64)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for CirculationConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "circulation".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: CirculationConfigSpec::default(),
        }
    }
}

impl CirculationConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. CIRCULATION_CONFIG_PATH environment variable
    /// 2. ./circulation-config.yaml (working directory)
    /// 3. ~/.circulation/config.yaml (user home)
    /// 4. /etc/circulation/config.yaml (system, Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CIRCULATION_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./circulation-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".circulation").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/circulation/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .with_context(|| format!("Failed to load config at {:?}", path))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(&config_path)
                .with_context(|| format!("Failed to load config at {:?}", config_path))?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("CIRCULATION_CATALOG_ENDPOINT") {
            tracing::info!("Environment override: CIRCULATION_CATALOG_ENDPOINT={}", endpoint);
            self.spec.catalog.endpoint = endpoint;
        }

        if let Some(tenant) = lookup("CIRCULATION_TENANT") {
            tracing::info!("Environment override: CIRCULATION_TENANT={}", tenant);
            self.spec.catalog.tenant = tenant;
        }

        if let Some(val) = lookup("CIRCULATION_CALL_TIMEOUT_SECS") {
            match val.trim().parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: CIRCULATION_CALL_TIMEOUT_SECS={}", secs);
                    self.spec.orchestrator.call_timeout = Duration::from_secs(secs);
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for CIRCULATION_CALL_TIMEOUT_SECS: '{}'. Expected whole seconds. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let catalog = &self.spec.catalog;
        if catalog.endpoint.trim().is_empty() {
            anyhow::bail!("spec.catalog.endpoint cannot be empty");
        }
        if catalog.tenant.trim().is_empty() {
            anyhow::bail!("spec.catalog.tenant cannot be empty");
        }
        if !catalog.patrons_path.ends_with('/') || !catalog.items_path.ends_with('/') {
            anyhow::bail!("spec.catalog.patrons_path and items_path must end with '/'");
        }

        let orchestrator = &self.spec.orchestrator;
        if orchestrator.call_timeout.is_zero() {
            anyhow::bail!("spec.orchestrator.call_timeout must be greater than zero");
        }
        if orchestrator.loan_period.is_zero() {
            anyhow::bail!("spec.orchestrator.loan_period must be greater than zero");
        }
        if orchestrator.loan_period > Duration::from_secs(3650 * 86_400) {
            anyhow::bail!("spec.orchestrator.loan_period cannot exceed ten years");
        }

        for status in [&orchestrator.on_loan_status, &orchestrator.available_status] {
            if status.value.trim().is_empty() {
                anyhow::bail!("Item status values cannot be empty");
            }
        }
        if orchestrator.on_loan_status.value == orchestrator.available_status.value {
            anyhow::bail!(
                "on_loan_status and available_status must differ (both '{}')",
                orchestrator.on_loan_status.value
            );
        }

        Ok(())
    }
}
