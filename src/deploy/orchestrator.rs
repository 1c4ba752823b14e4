// ABOUTME: The deployment pipeline: order, provision, configure, deploy, verify, snapshot.
// ABOUTME: Applies the per-stage fatal/non-fatal policy and always disconnects on exit.

use chrono::Utc;
use shell_escape::unix::escape;
use std::time::Duration;

use crate::provider::{ProviderApi, ResourceState, WaitOptions};
use crate::ssh::{Auth, Credentials, ReachabilityOptions, RemoteShell};

use super::error::DeployError;
use super::health::{self, ContainerHealth};
use super::result::DeployResult;
use super::settings::{DeployArtifacts, DeployConfig};
use super::stage::{NoProgress, ProgressSink, Stage};
use super::state::RunState;

static NO_PROGRESS: NoProgress = NoProgress;

/// Drives one server through the pipeline.
///
/// Borrows its collaborators; owns the state of the current run. Calling
/// [`deploy`](Self::deploy) or [`deploy_to_existing`](Self::deploy_to_existing)
/// starts a fresh run.
pub struct Orchestrator<'a, P: ProviderApi, S: RemoteShell> {
    pub(super) provider: &'a P,
    pub(super) session: &'a mut S,
    pub(super) config: DeployConfig,
    artifacts: Option<DeployArtifacts>,
    pub(super) progress: &'a dyn ProgressSink,
    pub(super) state: RunState,
}

impl<'a, P: ProviderApi, S: RemoteShell> Orchestrator<'a, P, S> {
    pub fn new(
        provider: &'a P,
        session: &'a mut S,
        config: DeployConfig,
        artifacts: DeployArtifacts,
    ) -> Self {
        Self {
            provider,
            session,
            config,
            artifacts: Some(artifacts),
            progress: &NO_PROGRESS,
            state: RunState::default(),
        }
    }

    /// An orchestrator for [`attach`](Self::attach) and
    /// [`rollback`](Self::rollback) only. Nothing is uploaded, so no artifacts
    /// are needed; deploying with it fails before the first stage does anything.
    pub fn for_rollback(provider: &'a P, session: &'a mut S, config: DeployConfig) -> Self {
        Self {
            provider,
            session,
            config,
            artifacts: None,
            progress: &NO_PROGRESS,
            state: RunState::default(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// State of the current (or last) run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Make an existing server known without running the pipeline, so that
    /// [`rollback`](Self::rollback) can target it.
    pub fn attach(&mut self, resource_id: &str, address: &str) {
        self.state = RunState::default();
        self.state.set_resource(resource_id, address, "");
    }

    /// Full pipeline: check balance, order a server, then configure it.
    pub async fn deploy(&mut self) -> DeployResult {
        self.state = RunState::default();
        self.run(Stage::CheckBalance).await
    }

    /// Configure a server that already exists, skipping balance, order
    /// and provisioning.
    pub async fn deploy_to_existing(
        &mut self,
        resource_id: &str,
        address: &str,
        credential: &str,
    ) -> DeployResult {
        self.state = RunState::default();
        self.state.set_resource(resource_id, address, credential);
        self.state.log(
            Stage::WaitReachable,
            format!("using existing server {resource_id} at {address}"),
        );
        self.run(Stage::WaitReachable).await
    }

    async fn run(&mut self, start: Stage) -> DeployResult {
        let success = match self.run_stages(start).await {
            Ok(()) => true,
            Err((stage, e)) => {
                tracing::error!(stage = %stage, "deployment failed: {}", e);
                self.progress.stage(stage, &format!("failed: {e}"));
                self.state.error(stage, format!("{stage}: {e}"));
                false
            }
        };

        self.close_session().await;

        let url = success.then(|| self.public_url()).flatten();
        DeployResult::from_state(&self.state, success, url)
    }

    async fn run_stages(&mut self, start: Stage) -> Result<(), (Stage, DeployError)> {
        if self.artifacts.is_none() {
            return Err((start, DeployError::NoArtifacts));
        }
        for stage in Stage::starting_at(start) {
            match self.run_stage(stage).await {
                Ok(()) => {}
                Err(e) if stage.is_fatal() => return Err((stage, e)),
                Err(e) => {
                    tracing::warn!(stage = %stage, "non-fatal failure: {}", e);
                    self.progress.stage(stage, &format!("continuing after failure: {e}"));
                    self.state.error(stage, format!("{stage}: {e}"));
                }
            }
        }
        Ok(())
    }

    async fn run_stage(&mut self, stage: Stage) -> Result<(), DeployError> {
        match stage {
            Stage::CheckBalance => self.check_balance().await,
            Stage::OrderResource => self.order_resource().await,
            Stage::WaitProvisioning => self.wait_provisioning().await,
            Stage::WaitReachable => self.wait_reachable().await,
            Stage::Connect => self.connect().await,
            Stage::BaseConfig => self.base_config().await,
            Stage::DeployApp => self.deploy_app().await,
            Stage::ConfigureProxy => self.configure_proxy().await,
            Stage::Certificate => self.certificate().await,
            Stage::HealthCheck => self.health_check().await,
            Stage::Snapshot => self.snapshot().await,
            Stage::Complete => {
                self.notify(Stage::Complete, "deployment complete");
                Ok(())
            }
        }
    }

    /// Report a stage transition to the sink, the tracing log, and the run log.
    pub(super) fn notify(&mut self, stage: Stage, message: &str) {
        tracing::info!(stage = %stage, "{}", message);
        self.progress.stage(stage, message);
        self.state.log(stage, message);
    }

    async fn close_session(&mut self) {
        if let Err(e) = self.session.disconnect().await {
            tracing::warn!("SSH disconnect failed: {}", e);
            self.state
                .log(Stage::Complete, format!("SSH disconnect failed: {e}"));
        }
    }

    fn public_url(&self) -> Option<String> {
        match &self.config.app.domain {
            Some(domain) => Some(format!("https://{domain}")),
            None => self.state.address().map(|a| format!("http://{a}")),
        }
    }

    fn address(&self) -> Result<String, DeployError> {
        self.state.address().map(str::to_string).ok_or_else(|| {
            DeployError::Ssh(crate::ssh::Error::Connection(
                "server address unknown".to_string(),
            ))
        })
    }

    pub(super) fn reachability<'o>(
        &self,
        on_retry: &'o (dyn Fn(u32, &str) + Send + Sync),
    ) -> ReachabilityOptions<'o> {
        ReachabilityOptions {
            port: self.config.ssh_port,
            timeout: self.config.waits.ssh_timeout,
            retry_interval: self.config.waits.ssh_retry,
            grace_period: self.config.waits.ssh_grace,
            on_retry: Some(on_retry),
        }
    }

    pub(super) fn wait_options<'o>(
        &self,
        on_progress: &'o (dyn Fn(&ResourceState) + Send + Sync),
    ) -> WaitOptions<'o> {
        WaitOptions {
            timeout: self.config.waits.provisioning_timeout,
            poll_interval: self.config.waits.provisioning_poll,
            on_progress: Some(on_progress),
        }
    }

    fn long_timeout(&self) -> Duration {
        self.config.waits.long_command_timeout
    }

    // -------------------------------------------------------------------------
    // Stages
    // -------------------------------------------------------------------------

    async fn check_balance(&mut self) -> Result<(), DeployError> {
        self.notify(Stage::CheckBalance, "checking account balance");
        let balance = self.provider.get_balance().await?;
        let required = self.config.min_balance;
        if balance <= required {
            return Err(DeployError::InsufficientBalance { balance, required });
        }
        self.state
            .log(Stage::CheckBalance, format!("balance: {balance:.2}"));
        Ok(())
    }

    async fn order_resource(&mut self) -> Result<(), DeployError> {
        let order = self.config.order.clone();
        self.notify(
            Stage::OrderResource,
            &format!("ordering {} with image {}", order.product_id, order.image_id),
        );

        let products = self.provider.get_products().await?;
        if !products.is_empty() && !products.iter().any(|p| p.id == order.product_id) {
            return Err(DeployError::ResourceUnavailable(format!(
                "product {} is not offered",
                order.product_id
            )));
        }
        let images = self.provider.get_images().await?;
        if !images.is_empty() && !images.iter().any(|i| i.id == order.image_id) {
            return Err(DeployError::ResourceUnavailable(format!(
                "image {} is not offered",
                order.image_id
            )));
        }

        let resource = self.provider.order_resource(&order).await?;
        self.state
            .set_resource(&resource.id, &resource.address, &resource.credential);
        self.state.log(
            Stage::OrderResource,
            format!("ordered server {}", resource.id),
        );
        if resource.credential.is_empty() {
            self.state.log(
                Stage::OrderResource,
                "provider returned no credential; key authentication will be used",
            );
        }
        Ok(())
    }

    async fn wait_provisioning(&mut self) -> Result<(), DeployError> {
        let id = self
            .state
            .resource_id()
            .map(str::to_string)
            .ok_or(DeployError::NoServerId)?;
        self.notify(
            Stage::WaitProvisioning,
            &format!("waiting for server {id} to start"),
        );

        let progress = self.progress;
        let on_progress = move |state: &ResourceState| {
            progress.stage(Stage::WaitProvisioning, &format!("server is {state}"));
        };
        let options = self.wait_options(&on_progress);
        self.provider
            .wait_for_status(&id, ResourceState::Running, options)
            .await?;

        if self.state.address().is_none() {
            let resource = self.provider.get_resource(&id).await?;
            if !self.state.fill_address(&resource.address) {
                return Err(DeployError::Provider(crate::provider::Error::ResourceNotFound(
                    format!("server {id} is running but has no address"),
                )));
            }
        }
        let address = self.address()?;
        self.state.log(
            Stage::WaitProvisioning,
            format!("server {id} running at {address}"),
        );
        Ok(())
    }

    async fn wait_reachable(&mut self) -> Result<(), DeployError> {
        let address = self.address()?;
        self.notify(
            Stage::WaitReachable,
            &format!("waiting for SSH on {address}:{}", self.config.ssh_port),
        );

        let progress = self.progress;
        let on_retry = move |attempt: u32, reason: &str| {
            progress.stage(
                Stage::WaitReachable,
                &format!("SSH not ready (attempt {attempt}): {reason}"),
            );
        };
        let options = self.reachability(&on_retry);
        self.session.wait_reachable(&address, &options).await?;
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), DeployError> {
        let address = self.address()?;
        self.notify(
            Stage::Connect,
            &format!("connecting as {}@{address}", self.config.ssh_user),
        );

        let auth = match (self.state.credential(), &self.config.ssh_key_path) {
            (Some(password), _) => Auth::Password(password.to_string()),
            (None, Some(key)) => Auth::KeyFile(key.clone()),
            (None, None) => Auth::Agent,
        };
        let credentials = Credentials::new(address, self.config.ssh_user.clone(), auth)
            .port(self.config.ssh_port);
        self.session.connect(&credentials).await?;
        Ok(())
    }

    async fn base_config(&mut self) -> Result<(), DeployError> {
        self.notify(Stage::BaseConfig, "applying base server configuration");
        let dir = self.config.app.remote_dir.clone();
        let script_path = format!("{dir}/setup.sh");

        let artifacts = self.artifacts.as_ref().ok_or(DeployError::NoArtifacts)?;
        self.session.mkdir(&dir).await?;
        self.session
            .upload_content(
                artifacts.setup_script.content.as_bytes(),
                &script_path,
                Some(0o755),
            )
            .await?;

        let timeout = self.long_timeout();
        let result = self
            .session
            .exec_with_timeout(&format!("bash {}", escape(script_path.as_str().into())), timeout)
            .await?;
        if !result.success() {
            return Err(crate::ssh::Error::CommandFailed {
                command: format!("bash {script_path}"),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            }
            .into());
        }
        self.state.log(Stage::BaseConfig, "base configuration applied");
        Ok(())
    }

    async fn deploy_app(&mut self) -> Result<(), DeployError> {
        let app = self.config.app.clone();
        self.notify(Stage::DeployApp, &format!("deploying {}", app.name));

        let dir = escape(app.remote_dir.as_str().into());
        let artifacts = self.artifacts.as_ref().ok_or(DeployError::NoArtifacts)?;
        self.session
            .upload_template(
                &artifacts.compose_manifest,
                &format!("{}/docker-compose.yml", app.remote_dir),
            )
            .await?;
        if let Some(env_file) = &artifacts.env_file {
            self.session
                .upload_content(
                    env_file.content.as_bytes(),
                    &format!("{}/.env", app.remote_dir),
                    Some(0o600),
                )
                .await?;
        }

        let timeout = self.long_timeout();
        let command = format!("cd {dir} && docker compose pull && docker compose up -d --remove-orphans");
        let result = self.session.exec_with_timeout(&command, timeout).await?;
        if !result.success() {
            return Err(crate::ssh::Error::CommandFailed {
                command,
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            }
            .into());
        }

        self.notify(
            Stage::DeployApp,
            &format!("waiting for container {} to become healthy", app.container_name),
        );
        let outcome = health::wait_for_container_health(
            &*self.session,
            &app.container_name,
            &self.config.container_health,
        )
        .await?;

        let message = match outcome {
            ContainerHealth::Healthy => format!("container {} is healthy", app.container_name),
            ContainerHealth::NoHealthcheck => format!(
                "container {} defines no health check",
                app.container_name
            ),
            ContainerHealth::Undetermined { last } => {
                tracing::warn!(
                    container = %app.container_name,
                    %last,
                    "container health undetermined, continuing"
                );
                format!(
                    "container {} health undetermined (last: {last}); continuing",
                    app.container_name
                )
            }
        };
        self.state.log(Stage::DeployApp, message);
        Ok(())
    }

    async fn configure_proxy(&mut self) -> Result<(), DeployError> {
        self.notify(Stage::ConfigureProxy, "configuring reverse proxy");
        let name = self.config.app.name.clone();
        let available = format!("/etc/nginx/sites-available/{name}");
        let enabled = format!("/etc/nginx/sites-enabled/{name}");

        let artifacts = self.artifacts.as_ref().ok_or(DeployError::NoArtifacts)?;
        self.session
            .upload_template(&artifacts.proxy_config, &available)
            .await?;
        self.session
            .exec_or_fail(&format!(
                "ln -sf {} {} && nginx -t && systemctl reload nginx",
                escape(available.as_str().into()),
                escape(enabled.as_str().into())
            ))
            .await?;
        self.state.log(Stage::ConfigureProxy, "reverse proxy reloaded");
        Ok(())
    }

    async fn certificate(&mut self) -> Result<(), DeployError> {
        let Some(domain) = self.config.app.domain.clone() else {
            self.notify(Stage::Certificate, "no domain configured, skipping certificate");
            return Ok(());
        };
        self.notify(
            Stage::Certificate,
            &format!("requesting certificate for {domain}"),
        );

        let contact = match &self.config.app.certificate_email {
            Some(email) => format!("-m {}", escape(email.as_str().into())),
            None => "--register-unsafely-without-email".to_string(),
        };
        let command = format!(
            "certbot --nginx --non-interactive --agree-tos --redirect {contact} -d {}",
            escape(domain.as_str().into())
        );
        let timeout = self.long_timeout();
        let result = self
            .session
            .exec_with_timeout(&command, timeout)
            .await
            .map_err(|e| DeployError::CertificateFailed(e.to_string()))?;
        if !result.success() {
            let detail = if result.stderr.is_empty() {
                result.stdout
            } else {
                result.stderr
            };
            return Err(DeployError::CertificateFailed(format!(
                "certbot exited with {}: {detail}",
                result.exit_code
            )));
        }
        self.state
            .log(Stage::Certificate, format!("certificate issued for {domain}"));
        Ok(())
    }

    async fn health_check(&mut self) -> Result<(), DeployError> {
        let url = health::loopback_url(self.config.app.port, &self.config.app.health_endpoint);
        self.notify(Stage::HealthCheck, &format!("probing {url}"));

        let passed = health::probe_http(&*self.session, &url, &self.config.health).await;
        self.state.set_health_check_passed(passed.is_ok());
        let attempt = passed?;
        self.state.log(
            Stage::HealthCheck,
            format!("health check passed on attempt {attempt}"),
        );
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<(), DeployError> {
        if !self.config.snapshots.enabled {
            self.notify(Stage::Snapshot, "snapshots disabled, skipping snapshot");
            return Ok(());
        }
        if !self.state.health_check_passed() {
            self.notify(Stage::Snapshot, "health check did not pass, skipping snapshot");
            return Ok(());
        }
        let id = self
            .state
            .resource_id()
            .map(str::to_string)
            .ok_or(DeployError::NoServerId)?;

        let name = format!(
            "{}-{}",
            self.config.snapshots.name_prefix,
            Utc::now().format("%Y%m%d-%H%M%S")
        );
        self.notify(Stage::Snapshot, &format!("creating snapshot {name}"));

        let snapshot = self
            .provider
            .create_snapshot(&id, &name)
            .await
            .map_err(|e| DeployError::SnapshotFailed(e.to_string()))?;

        if snapshot.pending {
            self.state.log(
                Stage::Snapshot,
                format!("snapshot {name} requested; id not yet available"),
            );
        } else {
            self.state
                .log(Stage::Snapshot, format!("snapshot {} created", snapshot.id));
            self.state.set_snapshot(&snapshot.id);
        }
        Ok(())
    }
}
