// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The end-to-end ship pipeline: tarball in, live app out.
//!
//! Stages: unpack, read metadata, promote the release, install and start
//! the service unit, emit and reload the proxy config, remove the tarball.
//! A failure after the `current` flip does NOT undo the flip; the error
//! names the failed stage and re-issuing the command retries the
//! remaining stages against the same release.

use std::path::{Path, PathBuf};

use nd_adapters::{ProxyManager, ServiceManager};
use nd_core::{ArtifactMetadata, Clock, OutputMode};
use nd_storage::{unpack_archive, Release, ReleaseStore};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::locks::AppLocks;
use crate::service_unit;
use crate::site_config;

/// Result of a successful ship.
#[derive(Debug, Clone)]
pub struct ShipOutcome {
    pub app_name: String,
    pub domain: String,
    pub release: Release,
    /// Installed unit name; `None` for static exports
    pub unit: Option<String>,
}

/// Ship pipeline over injected service and proxy adapters.
#[derive(Clone)]
pub struct ShipEngine<S, P, C> {
    store: ReleaseStore,
    apps_root: PathBuf,
    services: S,
    proxy: P,
    clock: C,
    locks: AppLocks,
}

impl<S, P, C> ShipEngine<S, P, C>
where
    S: ServiceManager,
    P: ProxyManager,
    C: Clock,
{
    pub fn new(apps_root: impl Into<PathBuf>, services: S, proxy: P, clock: C) -> Self {
        let apps_root = apps_root.into();
        Self {
            store: ReleaseStore::new(&apps_root),
            apps_root,
            services,
            proxy,
            clock,
            locks: AppLocks::new(),
        }
    }

    pub fn store(&self) -> &ReleaseStore {
        &self.store
    }

    /// Run the whole pipeline for one tarball.
    pub async fn ship(
        &self,
        tarball: &Path,
        doppler_token: Option<&str>,
    ) -> Result<ShipOutcome, EngineError> {
        if !tarball.exists() {
            return Err(EngineError::Validation(format!(
                "tarball not found: {}",
                tarball.display()
            )));
        }

        let ts = self.clock.epoch_secs();
        let incoming = self.apps_root.join(format!(".incoming-{ts}"));
        let metadata = match self.unpack_stage(tarball, &incoming) {
            Ok(metadata) => metadata,
            Err(e) => {
                // The staging directory is fully removed on error.
                let _ = std::fs::remove_dir_all(&incoming);
                return Err(e);
            }
        };

        // Serialize per app; other apps deploy in parallel.
        let _guard = self.locks.acquire(&metadata.app_name).await;

        let release = self
            .store
            .promote(&metadata.app_name, &incoming, ts)
            .inspect_err(|_| {
                let _ = std::fs::remove_dir_all(&incoming);
            })?;

        // From here on the flip has happened; failures surface but the
        // release stays live for a retried ship.
        let unit = self.install_service(&metadata, doppler_token).await?;
        self.install_proxy(&metadata).await?;

        if let Err(e) = std::fs::remove_file(tarball) {
            warn!(tarball = %tarball.display(), error = %e, "failed to remove shipped tarball");
        }

        info!(
            app = %metadata.app_name,
            domain = %metadata.domain,
            release = release.timestamp,
            "ship complete"
        );
        Ok(ShipOutcome {
            app_name: metadata.app_name,
            domain: metadata.domain,
            release,
            unit,
        })
    }

    fn unpack_stage(&self, tarball: &Path, incoming: &Path) -> Result<ArtifactMetadata, EngineError> {
        let summary = unpack_archive(tarball, incoming)?;
        let metadata = ArtifactMetadata::read_from(incoming)?;
        info!(
            app = %metadata.app_name,
            extracted = summary.extracted,
            skipped = summary.skipped,
            "artifact unpacked"
        );
        Ok(metadata)
    }

    async fn install_service(
        &self,
        metadata: &ArtifactMetadata,
        doppler_token: Option<&str>,
    ) -> Result<Option<String>, EngineError> {
        // The unit points at `current/`, not the release dir, so a later
        // promote retargets the service without a unit rewrite.
        let workdir = self.store.current_link(&metadata.app_name);
        let Some(contents) = service_unit::render_unit(
            &metadata.app_name,
            &workdir,
            metadata,
            metadata.port,
            doppler_token,
        ) else {
            return Ok(None);
        };

        let unit = service_unit::unit_name(&metadata.app_name);
        self.services.install_unit(&unit, &contents).await?;
        if self.services.is_active(&unit).await? {
            self.services.restart(&unit).await?;
        } else {
            self.services.start(&unit).await?;
        }
        Ok(Some(unit))
    }

    async fn install_proxy(&self, metadata: &ArtifactMetadata) -> Result<(), EngineError> {
        let current = self.store.current_link(&metadata.app_name);
        let fragment = match metadata.output_mode {
            OutputMode::Export => site_config::static_site(&metadata.domain, &current.join("out")),
            _ => site_config::dynamic_site(
                &metadata.domain,
                metadata.port,
                &current.join(".next/static"),
            ),
        };

        self.proxy
            .install_site(&metadata.app_name, &fragment)
            .await?;
        self.proxy.ensure_import().await?;
        self.proxy.reload().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "ship_tests.rs"]
mod tests;
