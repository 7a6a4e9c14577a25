//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use siteforge_common::{InstallationResult, ServerCapabilities, StepRecord, StepStatus};

use crate::application::services::installation::InstallationReport;
use crate::domain::config::{CONFIG_PATH_ENV, DB_ADMIN_PASSWORD_ENV, SiteforgeConfig};
use crate::domain::error::{InstallationError, ProvisionError};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the success payload. Printed even in quiet mode: the
    /// credentials are shown nowhere else.
    pub fn render_report(&self, report: &InstallationReport) {
        let InstallationResult {
            site,
            credentials,
            access_methods,
            dns,
            ..
        } = &report.result;
        let styles = &self.ctx.styles;

        println!();
        self.ctx.header(&format!("Site ready: {}", site.domain));
        println!();
        self.ctx.field(2, 16, "Site", site.access_url.style(styles.link));
        self.ctx.field(2, 16, "Admin", site.admin_url.style(styles.link));
        println!();
        println!("  {}", "Credentials:".style(styles.bold));
        let rows = [
            ("Admin user", credentials.admin_user.style(styles.bold)),
            ("Admin password", credentials.admin_password.style(styles.secret)),
            ("Admin email", credentials.admin_email.style(styles.bold)),
            ("Database", credentials.database_name.style(styles.bold)),
            ("Database user", credentials.database_user.style(styles.bold)),
            ("Database password", credentials.database_password.style(styles.secret)),
        ];
        for (label, value) in rows {
            self.ctx.field(4, 19, label, value);
        }
        println!();
        println!("  {}", "Access:".style(styles.bold));
        for method in access_methods {
            println!(
                "    {}  {}",
                method.url.style(styles.link),
                method.description.style(styles.dim)
            );
        }
        println!();
        println!("  {}", "DNS:".style(styles.bold));
        for record in &dns.records {
            println!(
                "    {:<4} {:<5} {:<16} ttl {}",
                record.kind, record.name, record.value, record.ttl
            );
        }
        for note in &dns.notes {
            println!("    {}", note.style(styles.dim));
        }
        println!();
    }

    /// Render a failed installation to stderr.
    pub fn render_failure(&self, err: &InstallationError) {
        let styles = &self.ctx.styles;
        eprintln!();
        self.ctx.error(&err.cause.to_string());

        if let Some(step) = &err.failed_step {
            eprintln!("    {:<16} {step}", "Failed step:".style(styles.dim));
        }
        if !err.completed_steps.is_empty() {
            eprintln!(
                "    {:<16} {}",
                "Completed:".style(styles.dim),
                err.completed_steps.join(", ")
            );
        }

        match &err.cause {
            ProvisionError::Connection { causes, .. } => {
                eprintln!();
                eprintln!("    Possible causes:");
                for cause in causes {
                    eprintln!("      - {}", cause.hint());
                }
            }
            ProvisionError::Conflict { evidence, .. } => {
                eprintln!();
                eprintln!("    Found on the host:");
                for item in evidence {
                    eprintln!("      - {item}");
                }
                eprintln!("    Nothing was changed. Choose another domain or remove the existing site.");
            }
            _ => {}
        }

        if err.cause.is_retryable() {
            eprintln!();
            eprintln!(
                "    {}",
                "Steps are idempotent: re-running the same command resumes safely."
                    .style(styles.dim)
            );
        }
        eprintln!();
    }

    /// Render a step table, used with `--verbose` after a failure.
    pub fn render_steps(&self, steps: &[StepRecord]) {
        for step in steps {
            let marker = match step.status {
                StepStatus::Completed => "✓".style(self.ctx.styles.success).to_string(),
                StepStatus::Failed => "✗".style(self.ctx.styles.error).to_string(),
                StepStatus::Skipped => "-".style(self.ctx.styles.dim).to_string(),
                StepStatus::Pending | StepStatus::Running => "·".style(self.ctx.styles.dim).to_string(),
            };
            eprintln!("    {marker} {:<22} {}", step.id, step.status);
        }
    }

    pub fn render_capabilities(&self, host: &str, caps: &ServerCapabilities) {
        println!();
        self.ctx.header(&format!("Capabilities of {host}"));
        println!();
        let rows = [
            ("nginx", caps.web_server),
            ("mariadb / mysql", caps.database),
            ("php", caps.runtime),
            ("wp-cli", caps.site_tool),
            ("curl", caps.http_client),
            ("unzip", caps.archive_tool),
            ("ufw", caps.firewall),
        ];
        for (name, present) in rows {
            println!("    {} {name}", self.ctx.mark(present));
        }
        println!();
        if caps.is_configured() {
            self.ctx.note("Host already carries the web stack: provisioning takes the fast path.");
        } else {
            self.ctx.note("Host is fresh: provisioning runs the full bootstrap.");
        }
    }

    /// Render the current siteforge configuration.
    pub fn render_config(&self, config: &SiteforgeConfig, path: &std::path::Path) {
        println!();
        self.ctx.header(&format!("Configuration ({})", path.display()));
        println!();
        let base = config.preview.base_domain.as_deref().unwrap_or("(not set)");
        let rows = [
            ("pipeline.deadline_secs", config.pipeline.deadline_secs.to_string()),
            (
                "pipeline.command_timeout_secs",
                config.pipeline.command_timeout_secs.to_string(),
            ),
            (
                "pipeline.connect_timeout_secs",
                config.pipeline.connect_timeout_secs.to_string(),
            ),
            ("preview.port_start", config.preview.port_start.to_string()),
            ("preview.port_end", config.preview.port_end.to_string()),
            ("preview.base_domain", base.to_string()),
            ("site.web_root", config.site.web_root.clone()),
            ("site.admin_user", config.site.admin_user.clone()),
        ];
        for (key, value) in rows {
            self.ctx.field(2, 32, key, value);
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in [CONFIG_PATH_ENV, DB_ADMIN_PASSWORD_ENV, "NO_COLOR"] {
            let shown = match std::env::var(var) {
                Ok(_) if var == DB_ADMIN_PASSWORD_ENV => "(set)".to_string(),
                Ok(v) => v,
                Err(_) => "(not set)".to_string(),
            };
            self.ctx.field(4, 30, var, shown);
        }
        println!();
    }
}
