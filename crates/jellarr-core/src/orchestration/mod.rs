//! Reconciliation run
//!
//! Walks the managed domains one at a time: fetch current state, compute the
//! diff, write only when there is something to change. Domains whose section
//! is absent from the document are never fetched. The first failed call
//! aborts the run; earlier writes stay applied.

use std::fmt;

use anyhow::Context;
use tracing::{info, warn};

use crate::api::{CreateUserByName, JellyfinApi, PluginInfo};
use crate::apply::{
    self, LibraryDiff, PluginSettings, calculate_branding_diff, calculate_encoding_diff,
    calculate_library_diff, calculate_new_users, calculate_plugin_configurations_diff,
    calculate_plugins_to_install, calculate_system_diff, calculate_user_policies_diff,
    should_complete_startup_wizard,
};
use crate::config::{
    BrandingOptionsConfig, EncodingOptionsConfig, LibraryConfig, PluginConfig, RootConfig,
    StartupConfig, SystemConfig, UserConfig,
};

/// Configuration domains in the order they are reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Startup,
    System,
    Encoding,
    Library,
    Branding,
    Users,
    Plugins,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Startup => "startup wizard",
            Domain::System => "system config",
            Domain::Encoding => "encoding config",
            Domain::Library => "library config",
            Domain::Branding => "branding config",
            Domain::Users => "users",
            Domain::Plugins => "plugins",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainOutcome {
    UpToDate,
    Updated,
}

/// What one run did, per managed domain, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub domains: Vec<(Domain, DomainOutcome)>,
    /// Library folders whose paths differ from the document and were skipped
    pub skipped_folders: Vec<String>,
}

impl RunReport {
    pub fn outcome(&self, domain: Domain) -> Option<DomainOutcome> {
        self.domains
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, outcome)| *outcome)
    }

    pub fn changed(&self) -> bool {
        self.domains
            .iter()
            .any(|(_, outcome)| *outcome == DomainOutcome::Updated)
    }

    fn record(&mut self, domain: Domain, outcome: DomainOutcome) {
        match outcome {
            DomainOutcome::UpToDate => info!("✓ {} already up to date", domain),
            DomainOutcome::Updated => info!("✓ updated {}", domain),
        }
        self.domains.push((domain, outcome));
    }
}

/// Drives one reconciliation of a server against a desired-state document
pub struct Reconciler<'a> {
    api: &'a dyn JellyfinApi,
}

impl<'a> Reconciler<'a> {
    pub fn new(api: &'a dyn JellyfinApi) -> Self {
        Self { api }
    }

    pub async fn run(&self, config: &RootConfig) -> anyhow::Result<RunReport> {
        let mut report = RunReport::default();

        if let Some(startup) = &config.startup {
            let outcome = self.reconcile_startup(startup).await?;
            report.record(Domain::Startup, outcome);
        }
        if let Some(system) = &config.system {
            let outcome = self.reconcile_system(system).await?;
            report.record(Domain::System, outcome);
        }
        if let Some(encoding) = &config.encoding {
            let outcome = self.reconcile_encoding(encoding).await?;
            report.record(Domain::Encoding, outcome);
        }
        if let Some(library) = &config.library {
            let (outcome, skipped) = self.reconcile_library(library).await?;
            report.skipped_folders.extend(skipped);
            report.record(Domain::Library, outcome);
        }
        if let Some(branding) = &config.branding {
            let outcome = self.reconcile_branding(branding).await?;
            report.record(Domain::Branding, outcome);
        }
        if let Some(users) = &config.users {
            let outcome = self.reconcile_users(users).await?;
            report.record(Domain::Users, outcome);
        }
        if let Some(plugins) = &config.plugins {
            let outcome = self.reconcile_plugins(plugins).await?;
            report.record(Domain::Plugins, outcome);
        }

        Ok(report)
    }

    async fn reconcile_startup(&self, desired: &StartupConfig) -> anyhow::Result<DomainOutcome> {
        if !should_complete_startup_wizard(desired) {
            return Ok(DomainOutcome::UpToDate);
        }
        info!("Completing startup wizard");
        self.api.complete_startup_wizard().await?;
        Ok(DomainOutcome::Updated)
    }

    async fn reconcile_system(&self, desired: &SystemConfig) -> anyhow::Result<DomainOutcome> {
        let current = self.api.get_system_configuration().await?;
        let update = calculate_system_diff(&current, desired)
            .context("Failed to merge system configuration")?;
        let Some(update) = update else {
            return Ok(DomainOutcome::UpToDate);
        };
        self.api.update_system_configuration(&update.updated).await?;
        Ok(DomainOutcome::Updated)
    }

    async fn reconcile_encoding(
        &self,
        desired: &EncodingOptionsConfig,
    ) -> anyhow::Result<DomainOutcome> {
        let current = self.api.get_encoding_configuration().await?;
        let update = calculate_encoding_diff(&current, desired)
            .context("Failed to merge encoding configuration")?;
        let Some(update) = update else {
            return Ok(DomainOutcome::UpToDate);
        };
        self.api.update_encoding_configuration(&update.updated).await?;
        Ok(DomainOutcome::Updated)
    }

    async fn reconcile_branding(
        &self,
        desired: &BrandingOptionsConfig,
    ) -> anyhow::Result<DomainOutcome> {
        let current = self.api.get_branding_configuration().await?;
        let update = calculate_branding_diff(&current, desired)
            .context("Failed to merge branding configuration")?;
        let Some(update) = update else {
            return Ok(DomainOutcome::UpToDate);
        };
        self.api.update_branding_configuration(&update.updated).await?;
        Ok(DomainOutcome::Updated)
    }

    async fn reconcile_library(
        &self,
        desired: &LibraryConfig,
    ) -> anyhow::Result<(DomainOutcome, Vec<String>)> {
        // An empty folder list manages nothing, so the server is not queried.
        if desired.virtual_folders.as_ref().is_none_or(|f| f.is_empty()) {
            return Ok((DomainOutcome::UpToDate, Vec::new()));
        }

        let current = self.api.get_virtual_folders().await?;
        let Some(LibraryDiff {
            to_create,
            path_mismatches,
        }) = calculate_library_diff(&current, desired)
        else {
            return Ok((DomainOutcome::UpToDate, Vec::new()));
        };

        for folder in &to_create {
            info!("Creating virtual folder: {}", folder.name);
            self.api
                .add_virtual_folder(
                    &folder.name,
                    folder.collection_type,
                    &apply::library::add_virtual_folder_body(folder),
                )
                .await?;
            info!(
                "✓ Created virtual folder: {} ({})",
                folder.name, folder.collection_type
            );
        }

        let outcome = if to_create.is_empty() {
            DomainOutcome::UpToDate
        } else {
            DomainOutcome::Updated
        };
        let skipped = path_mismatches.into_iter().map(|m| m.name).collect();
        Ok((outcome, skipped))
    }

    async fn reconcile_users(&self, desired: &[UserConfig]) -> anyhow::Result<DomainOutcome> {
        let mut current = self.api.get_users().await?;
        let mut outcome = DomainOutcome::UpToDate;

        if let Some(new_users) = calculate_new_users(&current, desired)? {
            for user in new_users {
                info!("Creating user: {}", user.name);
                let body = CreateUserByName::from(user);
                self.api.create_user(&body).await?;
                info!("✓ Created user: {}", body.name);
            }
            outcome = DomainOutcome::Updated;

            // New accounts only get an id and a default policy once created.
            if desired.iter().any(|u| u.policy.is_some()) {
                current = self.api.get_users().await?;
            }
        }

        let policies = calculate_user_policies_diff(&current, desired)
            .context("Failed to merge user policies")?;
        if let Some(policies) = policies {
            for policy in &policies {
                self.api
                    .update_user_policy(&policy.user_id, &policy.update.updated)
                    .await?;
                info!("✓ Updated user policy: {}", policy.name);
            }
            outcome = DomainOutcome::Updated;
        }

        Ok(outcome)
    }

    async fn reconcile_plugins(&self, desired: &[PluginConfig]) -> anyhow::Result<DomainOutcome> {
        let installed = self.api.get_plugins().await?;
        let mut outcome = DomainOutcome::UpToDate;

        if let Some(missing) = calculate_plugins_to_install(&installed, desired) {
            for plugin in &missing {
                info!("Installing plugin: {}", plugin.name);
                self.api.install_package(&plugin.name).await?;
            }
            outcome = DomainOutcome::Updated;
        }

        let settings = self.plugin_settings(&installed, desired).await?;
        let updates = calculate_plugin_configurations_diff(&settings, desired)
            .context("Failed to merge plugin configuration")?;
        if let Some(updates) = updates {
            for update in &updates {
                self.api
                    .update_plugin_configuration(&update.plugin_id, &update.update.updated)
                    .await?;
                info!("✓ Updated plugin configuration: {}", update.name);
            }
            outcome = DomainOutcome::Updated;
        }

        Ok(outcome)
    }

    /// Stored settings of the installed plugins the document configures.
    ///
    /// Plugins installed during this run are not loaded until the server
    /// restarts, so their settings are picked up on a later run.
    async fn plugin_settings(
        &self,
        installed: &[PluginInfo],
        desired: &[PluginConfig],
    ) -> anyhow::Result<Vec<PluginSettings>> {
        let mut settings = Vec::new();
        for plugin in desired.iter().filter(|p| p.configuration.is_some()) {
            let found = installed
                .iter()
                .find(|i| i.name.as_deref() == Some(plugin.name.as_str()));
            let Some(id) = found.and_then(|i| i.id.clone()) else {
                warn!(
                    "Plugin '{}' is not loaded yet, configuration will be applied on a later run",
                    plugin.name
                );
                continue;
            };
            let configuration = self.api.get_plugin_configuration(&id).await?;
            settings.push(PluginSettings {
                id,
                name: plugin.name.clone(),
                configuration,
            });
        }
        Ok(settings)
    }
}
