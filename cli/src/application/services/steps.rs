//! Application service: the nginx + MariaDB + PHP + WordPress step bodies.
//!
//! Every remote command goes through one of three helpers that fix its
//! failure policy:
//!
//! - `critical`: a nonzero exit fails the step with `ProvisionError::Command`.
//! - `best_effort`: a failure becomes a `warning` event and the step goes on.
//! - `probe`: read-only check whose exit status is the answer.
//!
//! Generated passwords never appear in a command line, where the host's
//! process list would show them. They travel on the command's stdin
//! (`wp --prompt=...`, SQL piped into `mysql`). Command errors still carry a
//! short label instead of the command line.

use siteforge_common::ServerCapabilities;

use crate::application::ports::{CommandOutput, RemoteShell};
use crate::application::services::events::EventEmitter;
use crate::application::services::pipeline::{PlanContext, StepExecutor, StepId};
use crate::domain::error::ProvisionError;
use crate::domain::shell::{shell_join, shell_quote};
use crate::domain::site::SiteLayout;

/// Exit codes after which a mutating command may or may not have taken
/// effect: `timeout` expiry, SIGKILL, ssh transport failure.
const AMBIGUOUS_EXIT: [i32; 3] = [124, 137, 255];

/// Remote time limit for `wp core install`.
const INSTALL_TIMEOUT_SECS: u32 = 600;

const APT: &str = "DEBIAN_FRONTEND=noninteractive apt-get -q -y -o DPkg::Lock::Timeout=300";

const BASE_PACKAGES: &[&str] = &["ca-certificates", "curl", "unzip", "ufw"];

const STACK_PACKAGES: &[&str] = &[
    "nginx",
    "mariadb-server",
    "php-fpm",
    "php-mysql",
    "php-curl",
    "php-gd",
    "php-intl",
    "php-mbstring",
    "php-xml",
    "php-zip",
];

const WP_CLI_URL: &str = "https://raw.githubusercontent.com/wp-cli/builds/gh-pages/phar/wp-cli.phar";

/// Parameters of the site being built. Owned so the installer can assemble
/// it once and hand it over.
#[derive(Debug, Clone)]
pub struct SitePlan {
    pub layout: SiteLayout,
    /// URL WordPress is installed under; the primary access URL.
    pub site_url: String,
    /// nginx `server_name` entries.
    pub server_names: Vec<String>,
    pub preview_port: Option<u16>,
    pub ssh_port: u16,
    pub title: String,
    pub tagline: Option<String>,
    pub theme: Option<String>,
    pub plugins: Vec<String>,
    pub admin_user: String,
    pub admin_email: String,
    pub admin_password: String,
    pub db_password: String,
    /// Wrap every command in `sudo -n`.
    pub use_sudo: bool,
    /// Root password for hosts whose database does not use socket auth.
    pub db_admin_password: Option<String>,
}

/// Executes the standard plan on one host.
pub struct SiteStack<'a, S> {
    shell: &'a S,
    emitter: &'a EventEmitter,
    plan: SitePlan,
    ctx: PlanContext,
}

impl<'a, S: RemoteShell> SiteStack<'a, S> {
    #[must_use]
    pub fn new(shell: &'a S, emitter: &'a EventEmitter, plan: SitePlan, ctx: PlanContext) -> Self {
        Self {
            shell,
            emitter,
            plan,
            ctx,
        }
    }

    fn capabilities(&self) -> ServerCapabilities {
        self.ctx.capabilities
    }

    // ── Command helpers ──────────────────────────────────────────────────────

    fn wrap(&self, command: &str) -> String {
        if self.plan.use_sudo {
            format!("sudo -n bash -c {}", shell_quote(command))
        } else {
            command.to_string()
        }
    }

    fn forward_output(&self, output: &CommandOutput) {
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            self.emitter.output(line);
        }
    }

    async fn run(&self, command: &str, input: Option<&str>) -> Result<CommandOutput, ProvisionError> {
        let command = self.wrap(command);
        let output = match input {
            Some(input) => self.shell.run_with_input(&command, input).await?,
            None => self.shell.run(&command).await?,
        };
        self.forward_output(&output);
        Ok(output)
    }

    async fn critical(&self, label: &str, command: &str) -> Result<CommandOutput, ProvisionError> {
        tracing::debug!(label, "critical command");
        let output = self
            .shell
            .run_or_fail(&self.wrap(command))
            .await
            .map_err(|e| relabel(label, e))?;
        self.forward_output(&output);
        Ok(output)
    }

    /// `critical` with `input` on stdin.
    async fn critical_fed(
        &self,
        label: &str,
        command: &str,
        input: &str,
    ) -> Result<CommandOutput, ProvisionError> {
        tracing::debug!(label, "critical command");
        self.run(command, Some(input))
            .await?
            .check(command)
            .map_err(|e| relabel(label, e))
    }

    async fn best_effort(&self, label: &str, command: &str) -> bool {
        tracing::debug!(label, "best-effort command");
        match self.run(command, None).await {
            Ok(output) if output.success() => true,
            Ok(output) => {
                self.emitter.warning(format!(
                    "{label} failed with exit code {}: {}",
                    output.exit_code,
                    last_line(&output.stderr)
                ));
                false
            }
            Err(e) => {
                self.emitter.warning(format!("{label} failed: {e}"));
                false
            }
        }
    }

    async fn probe(&self, command: &str) -> Result<bool, ProvisionError> {
        Ok(self.shell.run(&self.wrap(command)).await?.success())
    }

    /// `mysql` client as the database administrator, reading SQL from stdin.
    fn mysql_client(&self) -> String {
        match &self.plan.db_admin_password {
            Some(pw) => format!("MYSQL_PWD={} mysql -uroot -N -B", shell_quote(pw)),
            None => "mysql -N -B".to_string(),
        }
    }

    fn mysql(&self, sql: &str) -> String {
        format!("{} -e {}", self.mysql_client(), shell_quote(sql))
    }

    fn wp(&self, args: &[&str]) -> String {
        let path = format!("--path={}", self.plan.layout.site_root);
        format!("wp {} --allow-root {}", shell_quote(&path), shell_join(args))
    }

    // ── Preflight ────────────────────────────────────────────────────────────

    /// Read-only evidence that a site for this domain already exists.
    ///
    /// The database is only queried when a server is known to be installed.
    async fn conflict_evidence(&self, check_database: bool) -> Result<Vec<String>, ProvisionError> {
        let layout = &self.plan.layout;
        let mut evidence = Vec::new();

        let vhost = format!(
            "test -e {} || test -e {}",
            shell_quote(&layout.vhost_available),
            shell_quote(&layout.vhost_enabled)
        );
        if self.probe(&vhost).await? {
            evidence.push(format!("nginx site configuration exists at {}", layout.vhost_available));
        }

        if check_database {
            let show = format!("SHOW DATABASES LIKE '{}'", layout.db_name);
            let db = format!("{} | grep -qx {}", self.mysql(&show), shell_quote(&layout.db_name));
            if self.probe(&db).await? {
                evidence.push(format!("database {} exists", layout.db_name));
            }

            let select = format!("SELECT User FROM mysql.user WHERE User = '{}'", layout.db_user);
            let user = format!("{} | grep -qx {}", self.mysql(&select), shell_quote(&layout.db_user));
            if self.probe(&user).await? {
                evidence.push(format!("database user {} exists", layout.db_user));
            }
        }

        let root = shell_quote(&layout.site_root);
        let non_empty = format!("test -d {root} && test -n \"$(ls -A {root})\"");
        if self.probe(&non_empty).await? {
            evidence.push(format!("site root {} is not empty", layout.site_root));
        }

        Ok(evidence)
    }

    async fn ensure_no_conflict(&self, check_database: bool) -> Result<(), ProvisionError> {
        let evidence = self.conflict_evidence(check_database).await?;
        if evidence.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::Conflict {
                domain: self.plan.layout.domain.clone(),
                evidence,
            })
        }
    }

    async fn preflight(&self) -> Result<(), ProvisionError> {
        if self.plan.use_sudo {
            self.critical("passwordless sudo check", "true").await?;
        }
        self.ensure_no_conflict(self.capabilities().database).await
    }

    // ── Bootstrap ────────────────────────────────────────────────────────────

    async fn system_update(&self) -> Result<(), ProvisionError> {
        self.critical("apt-get update", &format!("{APT} update")).await?;
        self.critical(
            "apt-get upgrade",
            &format!("{APT} -o Dpkg::Options::=--force-confdef -o Dpkg::Options::=--force-confold upgrade"),
        )
        .await?;
        Ok(())
    }

    async fn install_dependencies(&self) -> Result<(), ProvisionError> {
        self.critical(
            "install base packages",
            &format!("{APT} install {}", shell_join(BASE_PACKAGES)),
        )
        .await?;
        Ok(())
    }

    async fn install_stack(&self) -> Result<(), ProvisionError> {
        self.critical(
            "install web stack packages",
            &format!("{APT} install {}", shell_join(STACK_PACKAGES)),
        )
        .await?;
        self.critical("enable nginx and mariadb", "systemctl enable --now nginx mariadb")
            .await?;
        self.critical(
            "enable php-fpm",
            "unit=$(systemctl list-unit-files 'php*-fpm.service' --no-legend | awk '{print $1}' | sort -V | tail -n1); \
             [ -n \"$unit\" ] && systemctl enable --now \"$unit\"",
        )
        .await?;
        self.critical(
            "install wp-cli",
            &format!(
                "command -v wp >/dev/null 2>&1 || {{ curl -fsSL -o /usr/local/bin/wp {} && chmod 755 /usr/local/bin/wp; }}",
                shell_quote(WP_CLI_URL)
            ),
        )
        .await?;
        Ok(())
    }

    // ── Site ─────────────────────────────────────────────────────────────────

    async fn create_site(&self) -> Result<(), ProvisionError> {
        let missing = self.capabilities().missing_auxiliary();
        if !self.ctx.full_path() && !missing.is_empty() {
            self.best_effort(
                &format!("install missing tools ({})", missing.join(", ")),
                &format!("{APT} install {}", shell_join(&missing)),
            )
            .await;
        }

        // State may have changed since preflight, and the bootstrap group has
        // installed the database server by now.
        self.ensure_no_conflict(true).await?;

        let layout = &self.plan.layout;
        let db = &layout.db_name;
        let user = &layout.db_user;
        let sql = format!(
            "CREATE DATABASE IF NOT EXISTS `{db}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci; \
             CREATE USER IF NOT EXISTS '{user}'@'localhost' IDENTIFIED BY '{pw}'; \
             GRANT ALL PRIVILEGES ON `{db}`.* TO '{user}'@'localhost'; \
             FLUSH PRIVILEGES;",
            pw = self.plan.db_password
        );
        self.critical_fed(&format!("create database {db}"), &self.mysql_client(), &sql)
            .await?;

        self.critical(
            "create site root",
            &format!("mkdir -p {}", shell_quote(&layout.site_root)),
        )
        .await?;
        self.critical("download WordPress", &self.wp(&["core", "download", "--skip-content"]))
            .await?;
        self.critical_fed(
            "write wp-config.php",
            &self.wp(&[
                "config",
                "create",
                &format!("--dbname={db}"),
                &format!("--dbuser={user}"),
                "--prompt=dbpass",
                "--dbhost=localhost",
                "--skip-check",
            ]),
            &format!("{}\n", self.plan.db_password),
        )
        .await?;

        self.install_core().await?;
        self.configure_vhost().await?;

        if let Some(port) = self.plan.preview_port {
            self.best_effort(
                &format!("open preview port {port}"),
                &format!("command -v ufw >/dev/null 2>&1 || exit 0; ufw allow {port}/tcp"),
            )
            .await;
        }
        Ok(())
    }

    /// `wp core install`, with an existence check when the outcome is unknown.
    async fn install_core(&self) -> Result<(), ProvisionError> {
        const LABEL: &str = "wp core install";

        let install = format!(
            "timeout {INSTALL_TIMEOUT_SECS} {}",
            self.wp(&[
                "core",
                "install",
                &format!("--url={}", self.plan.site_url),
                &format!("--title={}", self.plan.title),
                &format!("--admin_user={}", self.plan.admin_user),
                "--prompt=admin_password",
                &format!("--admin_email={}", self.plan.admin_email),
                "--skip-email",
            ])
        );
        let password = format!("{}\n", self.plan.admin_password);

        let failure = match self.run(&install, Some(&password)).await {
            Ok(output) if output.success() => return Ok(()),
            Ok(output) if AMBIGUOUS_EXIT.contains(&output.exit_code) => command_error(LABEL, &output),
            Ok(output) => return Err(command_error(LABEL, &output)),
            Err(e @ ProvisionError::Remote(_)) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(error = %failure, "site creation outcome unknown, probing");
        let installed = self
            .probe(&self.wp(&["core", "is-installed"]))
            .await
            .unwrap_or(false);
        if installed {
            self.emitter.warning(format!(
                "site creation reported an error but the site exists, continuing ({failure})"
            ));
            Ok(())
        } else {
            Err(failure)
        }
    }

    async fn configure_vhost(&self) -> Result<(), ProvisionError> {
        let socket = self
            .critical(
                "locate php-fpm socket",
                "sock=$(ls -1 /run/php/php*-fpm.sock 2>/dev/null | sort -V | tail -n1); \
                 [ -n \"$sock\" ] && printf '%s' \"$sock\"",
            )
            .await?;
        let config = render_vhost(&self.plan, socket.stdout.trim());
        let layout = &self.plan.layout;
        self.critical(
            "write nginx site configuration",
            &format!(
                "printf '%s\\n' {} > {}",
                shell_quote(&config),
                shell_quote(&layout.vhost_available)
            ),
        )
        .await?;
        self.critical(
            "enable nginx site",
            &format!(
                "ln -sfn {} {}",
                shell_quote(&layout.vhost_available),
                shell_quote(&layout.vhost_enabled)
            ),
        )
        .await?;
        self.critical("reload nginx", "nginx -t && systemctl reload nginx")
            .await?;
        Ok(())
    }

    async fn customize(&self) -> Result<(), ProvisionError> {
        if let Some(tagline) = &self.plan.tagline {
            self.best_effort(
                "set tagline",
                &self.wp(&["option", "update", "blogdescription", tagline]),
            )
            .await;
        }
        if let Some(theme) = &self.plan.theme {
            self.best_effort(
                &format!("install theme {theme}"),
                &self.wp(&["theme", "install", theme, "--activate"]),
            )
            .await;
        }
        for plugin in &self.plan.plugins {
            self.best_effort(
                &format!("install plugin {plugin}"),
                &self.wp(&["plugin", "install", plugin, "--activate"]),
            )
            .await;
        }
        self.best_effort(
            "set permalink structure",
            &self.wp(&["rewrite", "structure", "/%postname%/"]),
        )
        .await;
        // Last step that writes files on every path, plugins included.
        self.critical(
            "set site ownership",
            &format!(
                "chown -R www-data:www-data {}",
                shell_quote(&self.plan.layout.site_root)
            ),
        )
        .await?;
        Ok(())
    }

    async fn harden(&self) -> Result<(), ProvisionError> {
        let root = shell_quote(&self.plan.layout.site_root);
        self.best_effort(
            "normalize permissions",
            &format!(
                "find {root} -type d -exec chmod 755 {{}} + && \
                 find {root} -type f -exec chmod 644 {{}} + && \
                 chmod 640 {root}/wp-config.php"
            ),
        )
        .await;

        let mut rules = vec![
            format!("ufw allow {}/tcp", self.plan.ssh_port),
            "ufw allow 80/tcp".to_string(),
            "ufw allow 443/tcp".to_string(),
        ];
        if let Some(port) = self.plan.preview_port {
            rules.push(format!("ufw allow {port}/tcp"));
        }
        for rule in rules {
            self.best_effort(&format!("firewall rule '{rule}'"), &rule).await;
        }
        self.best_effort("enable firewall", "ufw --force enable").await;
        Ok(())
    }
}

impl<S: RemoteShell> StepExecutor for SiteStack<'_, S> {
    async fn execute(&mut self, step: StepId) -> Result<(), ProvisionError> {
        match step {
            StepId::Preflight => self.preflight().await,
            StepId::SystemUpdate => self.system_update().await,
            StepId::InstallDependencies => self.install_dependencies().await,
            StepId::InstallStack => self.install_stack().await,
            StepId::CreateSite => self.create_site().await,
            StepId::Customize => self.customize().await,
            StepId::Harden => self.harden().await,
        }
    }
}

fn command_error(label: &str, output: &CommandOutput) -> ProvisionError {
    ProvisionError::Command {
        command: label.to_string(),
        exit_code: output.exit_code,
        stderr: output.stderr.trim().to_string(),
    }
}

/// Swap the command line of a `Command` error for `label`.
fn relabel(label: &str, err: ProvisionError) -> ProvisionError {
    match err {
        ProvisionError::Command {
            exit_code, stderr, ..
        } => ProvisionError::Command {
            command: label.to_string(),
            exit_code,
            stderr,
        },
        other => other,
    }
}

fn last_line(text: &str) -> &str {
    text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

/// nginx server block for the site.
#[must_use]
pub fn render_vhost(plan: &SitePlan, php_socket: &str) -> String {
    let mut listen = vec!["    listen 80;".to_string()];
    if let Some(port) = plan.preview_port {
        listen.push(format!("    listen {port};"));
    }
    format!(
        "server {{\n\
         {listen}\n    \
         server_name {names};\n    \
         root {root};\n    \
         index index.php index.html;\n    \
         client_max_body_size 64m;\n\n    \
         location / {{\n        try_files $uri $uri/ /index.php?$args;\n    }}\n\n    \
         location ~ \\.php$ {{\n        include snippets/fastcgi-php.conf;\n        fastcgi_pass unix:{php_socket};\n    }}\n\n    \
         location ~ /\\.ht {{\n        deny all;\n    }}\n\
         }}",
        listen = listen.join("\n"),
        names = plan.server_names.join(" "),
        root = plan.layout.site_root,
    )
}
