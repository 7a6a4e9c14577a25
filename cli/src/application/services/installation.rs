//! Application service: the end-to-end installation use-case.
//!
//! Validate, connect, detect, allocate a preview port, run the step plan,
//! and build the result. One deadline covers all of it, starting before the
//! connection attempt. Whatever happens after the port is allocated, the
//! port is released on failure and the session is closed before returning.

use std::time::Duration;

use siteforge_common::{
    Credentials, InstallationResult, PipelineStatus, ProvisionEvent, ServerCapabilities,
    StepRecord, completed_ids,
};
use tokio::sync::watch;
use tracing::Instrument;

use crate::application::ports::{Connector, RemoteShell};
use crate::application::services::detect::detect;
use crate::application::services::events::EventEmitter;
use crate::application::services::pipeline::{
    Deadline, PlanContext, StepDescriptor, run_pipeline, standard_plan,
};
use crate::application::services::port_allocator::PortAllocator;
use crate::application::services::steps::{SitePlan, SiteStack};
use crate::domain::config::SiteforgeConfig;
use crate::domain::connection::ConnectionConfig;
use crate::domain::credentials::{SECRET_LEN, generate_secret};
use crate::domain::error::{InstallationError, ProvisionError};
use crate::domain::options::InstallationOptions;
use crate::domain::preview::preview_domain;
use crate::domain::result::{ResultInput, build_result};
use crate::domain::site::SiteLayout;

/// Installer knobs resolved from configuration and the environment.
#[derive(Debug, Clone)]
pub struct InstallerSettings {
    pub deadline: Duration,
    pub connect_timeout: Duration,
    pub web_root: String,
    pub preview_base_domain: Option<String>,
    pub db_admin_password: Option<String>,
}

impl InstallerSettings {
    #[must_use]
    pub fn from_config(config: &SiteforgeConfig, db_admin_password: Option<String>) -> Self {
        Self {
            deadline: config.pipeline.deadline(),
            connect_timeout: config.pipeline.connect_timeout(),
            web_root: config.site.web_root.clone(),
            preview_base_domain: config.preview.base_domain.clone(),
            db_admin_password,
        }
    }
}

/// What a successful installation returns.
#[derive(Debug, Clone)]
pub struct InstallationReport {
    pub result: InstallationResult,
    pub steps: Vec<StepRecord>,
    pub capabilities: ServerCapabilities,
}

/// Runs installations against hosts reached through `C`.
pub struct Installer<'a, C> {
    connector: &'a C,
    ports: &'a PortAllocator,
    settings: InstallerSettings,
    plan: Vec<StepDescriptor>,
}

impl<'a, C: Connector> Installer<'a, C> {
    #[must_use]
    pub fn new(connector: &'a C, ports: &'a PortAllocator, settings: InstallerSettings) -> Self {
        Self {
            connector,
            ports,
            settings,
            plan: standard_plan(),
        }
    }

    /// Provision one host.
    ///
    /// Emits a terminal `installationComplete` event on every path.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallationError`] carrying the classified cause, the
    /// failing step and the step records.
    pub async fn install(
        &self,
        connection: &ConnectionConfig,
        options: &InstallationOptions,
        emitter: &EventEmitter,
        cancel: watch::Receiver<bool>,
    ) -> Result<InstallationReport, InstallationError> {
        let span = tracing::info_span!(
            "install",
            installation_id = %options.installation_id,
            domain = %options.domain,
            host = %connection.host
        );
        let result = self
            .run(connection, options, emitter, &cancel)
            .instrument(span.clone())
            .await;
        let _guard = span.enter();
        match &result {
            Ok(_) => {
                emitter.emit(ProvisionEvent::InstallationComplete { success: true });
                tracing::info!("installation succeeded");
            }
            Err(err) => {
                emitter.emit(ProvisionEvent::Error {
                    message: err.to_string(),
                });
                emitter.emit(ProvisionEvent::InstallationComplete { success: false });
                tracing::warn!(error = %err, status = ?err.status, "installation failed");
            }
        }
        result
    }

    async fn run(
        &self,
        connection: &ConnectionConfig,
        options: &InstallationOptions,
        emitter: &EventEmitter,
        cancel: &watch::Receiver<bool>,
    ) -> Result<InstallationReport, InstallationError> {
        connection
            .validate()
            .and_then(|()| options.validate())
            .map_err(InstallationError::before_pipeline)?;
        if *cancel.borrow() {
            return Err(InstallationError::before_pipeline(ProvisionError::Cancelled));
        }

        let deadline = Deadline::starting_now(self.settings.deadline);
        let connect_timeout = self.settings.connect_timeout.min(deadline.remaining());
        let session = tokio::time::timeout_at(
            deadline.at(),
            self.connector.connect(connection, connect_timeout),
        )
        .await
        .map_err(|_| InstallationError::before_pipeline(deadline.exceeded()))?
        .map_err(InstallationError::before_pipeline)?;
        emitter.emit(ProvisionEvent::Connected {
            host: session.host().to_string(),
        });

        let Ok(capabilities) = tokio::time::timeout_at(deadline.at(), detect(&session)).await
        else {
            tracing::warn!("installation deadline exceeded during capability detection");
            session.disconnect().await;
            return Err(InstallationError::before_pipeline(deadline.exceeded()));
        };
        let ctx = PlanContext {
            capabilities,
            skip_system_setup: options.skip_system_setup,
        };

        let assigned_port = if options.preview_access {
            match self.ports.allocate(&options.installation_id) {
                Ok(reservation) => Some(reservation.port),
                Err(e) => {
                    emitter.warning(format!("no preview port assigned, using bare IP access: {e}"));
                    None
                }
            }
        } else {
            None
        };
        let preview = match (&self.settings.preview_base_domain, options.preview_access) {
            (Some(base), true) => Some(preview_domain(&options.requester.id, &options.domain, base)),
            _ => None,
        };

        let site = self.site_plan(connection, options, assigned_port, preview.clone());
        let credentials = Credentials {
            admin_user: site.admin_user.clone(),
            admin_password: site.admin_password.clone(),
            admin_email: site.admin_email.clone(),
            database_name: site.layout.db_name.clone(),
            database_user: site.layout.db_user.clone(),
            database_password: site.db_password.clone(),
        };

        let mut stack = SiteStack::new(&session, emitter, site, ctx);
        let run = run_pipeline(
            &self.plan,
            &ctx,
            &mut stack,
            emitter,
            deadline,
            cancel,
        )
        .await;

        session.disconnect().await;

        match run.outcome {
            Ok(()) => Ok(InstallationReport {
                result: build_result(ResultInput {
                    domain: options.domain.clone(),
                    host_ip: connection.host.clone(),
                    assigned_port,
                    preview_domain: preview,
                    credentials,
                }),
                steps: run.records,
                capabilities,
            }),
            Err(failure) => {
                if let Some(released) = self.ports.release(&options.installation_id) {
                    tracing::info!(port = released.port, "preview port returned to the pool");
                }
                let status = match failure.cause {
                    ProvisionError::Timeout { .. } => PipelineStatus::TimedOut,
                    ProvisionError::Cancelled => PipelineStatus::Cancelled,
                    _ => PipelineStatus::Failed,
                };
                Err(InstallationError {
                    cause: failure.cause,
                    status,
                    failed_step: failure.step.map(|s| s.as_str().to_string()),
                    completed_steps: completed_ids(&run.records),
                    capabilities: Some(capabilities),
                    steps: run.records,
                })
            }
        }
    }

    fn site_plan(
        &self,
        connection: &ConnectionConfig,
        options: &InstallationOptions,
        assigned_port: Option<u16>,
        preview: Option<String>,
    ) -> SitePlan {
        let layout = SiteLayout::for_domain(&options.domain, &self.settings.web_root);
        let site_url = match assigned_port {
            Some(port) => format!("http://{}:{port}", connection.host),
            None => format!("http://{}", connection.host),
        };
        let mut server_names = vec![
            options.domain.clone(),
            format!("www.{}", options.domain),
            connection.host.clone(),
        ];
        server_names.extend(preview);

        SitePlan {
            layout,
            site_url,
            server_names,
            preview_port: assigned_port,
            ssh_port: connection.port,
            title: options.site.title.clone(),
            tagline: options.site.tagline.clone(),
            theme: options.site.theme.clone(),
            plugins: options.site.plugins.clone(),
            admin_user: options.site.admin_user.clone(),
            admin_email: options.admin_email().to_string(),
            admin_password: options
                .site
                .admin_password
                .clone()
                .unwrap_or_else(|| generate_secret(SECRET_LEN)),
            db_password: generate_secret(SECRET_LEN),
            use_sudo: connection.needs_sudo(),
            db_admin_password: self.settings.db_admin_password.clone(),
        }
    }
}
