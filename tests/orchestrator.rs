// ABOUTME: Integration tests for the deployment pipeline.
// ABOUTME: Drives the orchestrator against in-memory provider and shell doubles.

use async_trait::async_trait;
use hoist::deploy::{
    AppSettings, DeployArtifacts, DeployConfig, DeployError, IndeterminateHealth, Orchestrator,
    Stage,
};
use hoist::provider::{
    self, Image, OrderRequest, PowerAction, Product, ProviderApi, Resource, ResourceState,
    Snapshot,
};
use hoist::ssh::{
    self, Auth, Credentials, ExecResult, ReachabilityOptions, RemoteShell, RenderedTemplate,
    SessionState,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// -----------------------------------------------------------------------------
// Doubles
// -----------------------------------------------------------------------------

struct FakeProvider {
    balance: f64,
    products: Vec<Product>,
    ordered: Resource,
    details: Resource,
    statuses: Mutex<VecDeque<ResourceState>>,
    snapshot: Option<Snapshot>,
    calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new() -> Self {
        FakeProvider {
            balance: 25.0,
            products: vec![Product {
                id: "vps-s".to_string(),
                name: "Small".to_string(),
                price: Some(4.99),
                description: None,
            }],
            ordered: resource("981", "203.0.113.9", "root-pw"),
            details: resource("981", "203.0.113.9", ""),
            statuses: Mutex::new(VecDeque::from([
                ResourceState::Provisioning,
                ResourceState::Running,
            ])),
            snapshot: Some(Snapshot {
                id: "snap-1".to_string(),
                name: "deploy".to_string(),
                resource_id: "981".to_string(),
                created_at: None,
                active: true,
                expires_at: None,
                pending: false,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }
}

fn resource(id: &str, address: &str, credential: &str) -> Resource {
    Resource {
        id: id.to_string(),
        address: address.to_string(),
        credential: credential.to_string(),
        state: ResourceState::Provisioning,
    }
}

#[async_trait]
impl ProviderApi for FakeProvider {
    async fn get_balance(&self) -> provider::Result<f64> {
        self.record("get_balance");
        Ok(self.balance)
    }

    async fn get_products(&self) -> provider::Result<Vec<Product>> {
        self.record("get_products");
        Ok(self.products.clone())
    }

    async fn get_images(&self) -> provider::Result<Vec<Image>> {
        self.record("get_images");
        Ok(Vec::new())
    }

    async fn order_resource(&self, _request: &OrderRequest) -> provider::Result<Resource> {
        self.record("order_resource");
        Ok(self.ordered.clone())
    }

    async fn list_resources(&self) -> provider::Result<Vec<Resource>> {
        self.record("list_resources");
        Ok(vec![self.details.clone()])
    }

    async fn get_resource(&self, _id: &str) -> provider::Result<Resource> {
        self.record("get_resource");
        Ok(self.details.clone())
    }

    async fn get_status(&self, _id: &str) -> provider::Result<ResourceState> {
        self.record("get_status");
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ResourceState::Running))
    }

    async fn power_action(&self, _id: &str, _action: PowerAction) -> provider::Result<()> {
        self.record("power_action");
        Ok(())
    }

    async fn list_snapshots(&self, _id: &str) -> provider::Result<Vec<Snapshot>> {
        self.record("list_snapshots");
        Ok(Vec::new())
    }

    async fn create_snapshot(&self, id: &str, name: &str) -> provider::Result<Snapshot> {
        self.record("create_snapshot");
        Ok(self.snapshot.clone().unwrap_or(Snapshot {
            id: String::new(),
            name: name.to_string(),
            resource_id: id.to_string(),
            created_at: None,
            active: false,
            expires_at: None,
            pending: true,
        }))
    }

    async fn restore_snapshot(
        &self,
        _id: &str,
        _snapshot_id: &str,
        _target_id: Option<&str>,
    ) -> provider::Result<()> {
        self.record("restore_snapshot");
        Ok(())
    }
}

/// Scripted shell: commands containing a rule's pattern get its result,
/// everything else succeeds with empty output.
struct FakeShell {
    state: SessionState,
    rules: Vec<(&'static str, ExecResult)>,
    fail_connect: bool,
    commands: Mutex<Vec<String>>,
    uploads: Vec<(String, Option<u32>)>,
    connected_with: Option<Credentials>,
    reachable_checks: Mutex<Vec<String>>,
    disconnects: u32,
}

impl FakeShell {
    fn new() -> Self {
        FakeShell {
            state: SessionState::Disconnected,
            rules: vec![("docker inspect", ok("healthy"))],
            fail_connect: false,
            commands: Mutex::new(Vec::new()),
            uploads: Vec::new(),
            connected_with: None,
            reachable_checks: Mutex::new(Vec::new()),
            disconnects: 0,
        }
    }

    fn respond(mut self, pattern: &'static str, result: ExecResult) -> Self {
        self.rules.insert(0, (pattern, result));
        self
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn ran(&self, fragment: &str) -> bool {
        self.commands().iter().any(|c| c.contains(fragment))
    }
}

fn ok(stdout: &str) -> ExecResult {
    ExecResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: 0,
        signal: None,
    }
}

fn exit(code: u32, stderr: &str) -> ExecResult {
    ExecResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: code,
        signal: None,
    }
}

#[async_trait]
impl RemoteShell for FakeShell {
    fn state(&self) -> SessionState {
        self.state
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn connect(&mut self, credentials: &Credentials) -> ssh::Result<()> {
        if self.fail_connect {
            return Err(ssh::Error::AuthenticationFailed);
        }
        self.state = SessionState::Connected;
        self.connected_with = Some(credentials.clone());
        Ok(())
    }

    async fn disconnect(&mut self) -> ssh::Result<()> {
        self.disconnects += 1;
        self.state = SessionState::Disconnected;
        Ok(())
    }

    async fn exec_with_timeout(&self, command: &str, _timeout: Duration) -> ssh::Result<ExecResult> {
        if self.state != SessionState::Connected {
            return Err(ssh::Error::NotConnected);
        }
        self.commands.lock().unwrap().push(command.to_string());
        Ok(self
            .rules
            .iter()
            .find(|(pattern, _)| command.contains(pattern))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| ok("")))
    }

    async fn upload_content(
        &mut self,
        _content: &[u8],
        remote_path: &str,
        mode: Option<u32>,
    ) -> ssh::Result<()> {
        self.uploads.push((remote_path.to_string(), mode));
        Ok(())
    }

    async fn file_exists(&mut self, path: &str) -> bool {
        self.uploads.iter().any(|(p, _)| p == path)
    }

    async fn mkdir(&mut self, _path: &str) -> ssh::Result<()> {
        Ok(())
    }

    async fn wait_reachable(
        &self,
        host: &str,
        _options: &ReachabilityOptions<'_>,
    ) -> ssh::Result<()> {
        self.reachable_checks.lock().unwrap().push(host.to_string());
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Fixtures
// -----------------------------------------------------------------------------

fn config() -> DeployConfig {
    let order = OrderRequest {
        product_id: "vps-s".to_string(),
        image_id: "ubuntu-24.04".to_string(),
        billing_term: "monthly".to_string(),
        hostname: None,
    };
    let mut config = DeployConfig::new(order, AppSettings::new("shop", 8080));
    config.waits.provisioning_timeout = Duration::from_secs(2);
    config.waits.provisioning_poll = Duration::from_millis(1);
    config.health.retries = 3;
    config.health.interval = Duration::from_millis(1);
    config.container_health.attempts = 3;
    config.container_health.interval = Duration::from_millis(1);
    config
}

fn artifacts() -> DeployArtifacts {
    DeployArtifacts {
        setup_script: RenderedTemplate::new("setup.sh", "#!/bin/bash\necho setup\n"),
        compose_manifest: RenderedTemplate::new("docker-compose.yml", "services: {}\n"),
        env_file: Some(RenderedTemplate::new(".env", "SECRET=1\n")),
        proxy_config: RenderedTemplate::new("nginx.conf", "server {}\n"),
    }
}

// -----------------------------------------------------------------------------
// Pipeline scenarios
// -----------------------------------------------------------------------------

mod deploy {
    use super::*;

    #[tokio::test]
    async fn insufficient_balance_stops_before_ordering() {
        let provider = FakeProvider {
            balance: 0.0,
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(!result.success);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.contains("Insufficient account balance"))
        );
        assert!(!provider.called("order_resource"));
        assert!(result.resource_id.is_empty());
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn full_run_succeeds_with_snapshot() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(result.success, "errors: {:?}", result.errors);
        assert!(result.health_check_passed);
        assert_eq!(result.snapshot_id.as_deref(), Some("snap-1"));
        assert_eq!(result.resource_id, "981");
        assert_eq!(result.address, "203.0.113.9");
        assert_eq!(result.url.as_deref(), Some("http://203.0.113.9"));
        assert!(result.errors.is_empty());
        assert_eq!(shell.disconnects, 1);

        let credentials = shell.connected_with.clone().unwrap();
        assert_eq!(credentials.host, "203.0.113.9");
        assert_eq!(credentials.user, "root");
        assert!(matches!(credentials.auth, Auth::Password(ref p) if p == "root-pw"));

        assert!(shell.ran("bash /opt/shop/setup.sh"));
        assert!(shell.ran("docker compose up -d"));
        assert!(shell.ran("nginx -t && systemctl reload nginx"));
        assert!(shell.ran("http://127.0.0.1:8080/health"));
        assert!(!shell.ran("certbot"));

        assert!(shell.uploads.contains(&("/opt/shop/setup.sh".to_string(), Some(0o755))));
        assert!(shell.uploads.contains(&("/opt/shop/.env".to_string(), Some(0o600))));
        assert!(
            shell
                .uploads
                .iter()
                .any(|(path, _)| path == "/etc/nginx/sites-available/shop")
        );
    }

    #[tokio::test]
    async fn failing_health_check_skips_snapshot_but_succeeds() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("curl", exit(7, "connection refused"));

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(result.success);
        assert!(!result.health_check_passed);
        assert_eq!(result.snapshot_id, None);
        assert!(!provider.called("create_snapshot"));
        assert!(result.errors.iter().any(|e| e.contains("health check failed")));
        let attempts = shell.commands().iter().filter(|c| c.contains("curl")).count();
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn certificate_failure_is_recorded_and_run_continues() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("certbot", exit(1, "rate limited"));
        let mut config = config();
        config.app.domain = Some("shop.example.com".to_string());

        let result = Orchestrator::new(&provider, &mut shell, config, artifacts())
            .deploy()
            .await;

        assert!(result.success);
        assert!(result.errors.iter().any(|e| e.contains("certificate")));
        assert!(shell.ran("curl"));
        assert!(result.health_check_passed);
        assert_eq!(result.url.as_deref(), Some("https://shop.example.com"));
    }

    #[tokio::test]
    async fn connect_failure_is_fatal_and_still_disconnects_once() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell {
            fail_connect: true,
            ..FakeShell::new()
        };

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(!result.success);
        assert!(result.partially_provisioned());
        assert_eq!(result.resource_id, "981");
        assert!(result.errors.iter().any(|e| e.starts_with("connect:")));
        assert!(shell.commands().is_empty());
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn unhealthy_container_aborts_with_logs() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new()
            .respond("docker inspect", ok("unhealthy"))
            .respond("docker logs", ok("panic: database unreachable"));

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(!result.success);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.contains("unhealthy") && e.contains("database unreachable"))
        );
        assert!(!shell.ran("nginx"));
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn undetermined_container_health_follows_policy() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("docker inspect", ok("starting"));

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;
        assert!(result.success);
        assert!(
            result
                .logs
                .iter()
                .any(|l| l.message.contains("health undetermined"))
        );

        let mut shell = FakeShell::new().respond("docker inspect", ok("starting"));
        let mut strict = config();
        strict.container_health.on_indeterminate = IndeterminateHealth::Fail;
        let result = Orchestrator::new(&provider, &mut shell, strict, artifacts())
            .deploy()
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn missing_address_is_filled_after_provisioning() {
        let provider = FakeProvider {
            ordered: resource("981", "", ""),
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();
        let mut config = config();
        config.ssh_key_path = Some("/keys/id_ed25519".into());

        let result = Orchestrator::new(&provider, &mut shell, config, artifacts())
            .deploy()
            .await;

        assert!(result.success, "errors: {:?}", result.errors);
        assert!(provider.called("get_resource"));
        assert_eq!(result.address, "203.0.113.9");
        let credentials = shell.connected_with.clone().unwrap();
        assert!(matches!(credentials.auth, Auth::KeyFile(_)));
    }

    #[tokio::test]
    async fn unoffered_product_is_rejected() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let mut config = config();
        config.order.product_id = "vps-xl".to_string();

        let result = Orchestrator::new(&provider, &mut shell, config, artifacts())
            .deploy()
            .await;

        assert!(!result.success);
        assert!(!provider.called("order_resource"));
        assert!(result.errors.iter().any(|e| e.contains("vps-xl")));
    }

    #[tokio::test]
    async fn pending_snapshot_is_logged_not_recorded() {
        let provider = FakeProvider {
            snapshot: None,
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert!(result.success);
        assert_eq!(result.snapshot_id, None);
        assert!(
            result
                .logs
                .iter()
                .any(|l| l.stage == Stage::Snapshot && l.message.contains("not yet available"))
        );
    }

    #[tokio::test]
    async fn progress_sink_sees_stages_in_order() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let seen = Mutex::new(Vec::new());
        let sink = |stage: Stage, _message: &str| {
            let mut seen = seen.lock().unwrap();
            if seen.last() != Some(&stage) {
                seen.push(stage);
            }
        };

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .with_progress(&sink)
            .deploy()
            .await;

        assert!(result.success);
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, Stage::PIPELINE.to_vec());
    }

    #[tokio::test]
    async fn skipped_stages_still_reach_the_sink() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("curl", exit(7, "connection refused"));
        let messages = Mutex::new(Vec::new());
        let sink = |stage: Stage, message: &str| {
            messages.lock().unwrap().push((stage, message.to_string()));
        };

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .with_progress(&sink)
            .deploy()
            .await;

        assert!(result.success);
        let messages = messages.lock().unwrap();
        assert!(
            messages
                .iter()
                .any(|(stage, m)| *stage == Stage::Certificate && m.contains("no domain"))
        );
        assert!(
            messages
                .iter()
                .any(|(stage, m)| *stage == Stage::Snapshot && m.contains("did not pass"))
        );
    }

    #[tokio::test]
    async fn disabled_snapshots_are_announced() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let mut config = config();
        config.snapshots.enabled = false;

        let result = Orchestrator::new(&provider, &mut shell, config, artifacts())
            .deploy()
            .await;

        assert!(result.success);
        assert!(!provider.called("create_snapshot"));
        assert!(
            result
                .logs
                .iter()
                .any(|l| l.stage == Stage::Snapshot && l.message.contains("disabled"))
        );
    }
}

mod fatal_stages {
    use super::*;

    /// Fatal failure after ordering: the server stays identified and the
    /// session is closed exactly once.
    fn assert_failed_at(result: &hoist::deploy::DeployResult, shell: &FakeShell, prefix: &str) {
        assert!(!result.success);
        assert_eq!(result.resource_id, "981");
        assert_eq!(result.address, "203.0.113.9");
        assert!(
            result.errors.iter().any(|e| e.starts_with(prefix)),
            "errors: {:?}",
            result.errors
        );
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn provider_error_state_stops_provisioning() {
        let provider = FakeProvider {
            statuses: Mutex::new(VecDeque::from([
                ResourceState::Provisioning,
                ResourceState::Error,
            ])),
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert_failed_at(&result, &shell, &format!("{}:", Stage::WaitProvisioning));
        assert!(shell.connected_with.is_none());
        assert!(shell.reachable_checks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_setup_script_stops_before_the_app() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("bash", exit(1, "apt-get failed"));

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert_failed_at(&result, &shell, &format!("{}:", Stage::BaseConfig));
        assert!(result.errors.iter().any(|e| e.contains("apt-get failed")));
        assert!(!shell.ran("docker compose"));
        assert!(!provider.called("create_snapshot"));
    }

    #[tokio::test]
    async fn invalid_proxy_config_stops_before_verification() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new().respond("nginx -t", exit(1, "unknown directive"));

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy()
            .await;

        assert_failed_at(&result, &shell, &format!("{}:", Stage::ConfigureProxy));
        assert!(shell.ran("docker compose up -d"));
        assert!(!shell.ran("curl"));
        assert!(!provider.called("create_snapshot"));
    }
}

mod existing_server {
    use super::*;

    #[tokio::test]
    async fn skips_balance_order_and_provisioning() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();

        let result = Orchestrator::new(&provider, &mut shell, config(), artifacts())
            .deploy_to_existing("42", "198.51.100.7", "pw")
            .await;

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.resource_id, "42");
        assert_eq!(result.address, "198.51.100.7");
        assert_eq!(provider.calls(), vec!["create_snapshot".to_string()]);
        assert_eq!(
            *shell.reachable_checks.lock().unwrap(),
            vec!["198.51.100.7".to_string()]
        );
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn each_run_starts_from_fresh_state() {
        let provider = FakeProvider {
            balance: 0.0,
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();
        let mut orchestrator = Orchestrator::new(&provider, &mut shell, config(), artifacts());

        let first = orchestrator
            .deploy_to_existing("42", "198.51.100.7", "pw")
            .await;
        assert!(first.success);

        let second = orchestrator.deploy().await;
        assert!(!second.success);
        assert!(second.resource_id.is_empty());
        assert!(second.snapshot_id.is_none());
        assert_eq!(second.errors.len(), 1);
    }
}

mod rollback {
    use super::*;

    #[tokio::test]
    async fn rollback_orchestrator_needs_no_artifacts() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let mut orchestrator = Orchestrator::for_rollback(&provider, &mut shell, config());
        orchestrator.attach("981", "203.0.113.9");

        orchestrator.rollback("snap-1").await.unwrap();

        assert_eq!(provider.calls()[0], "restore_snapshot");
    }

    #[tokio::test]
    async fn rollback_orchestrator_refuses_to_deploy() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();

        let result = Orchestrator::for_rollback(&provider, &mut shell, config())
            .deploy()
            .await;

        assert!(!result.success);
        assert!(
            result
                .errors
                .iter()
                .any(|e| e.contains("no deployment artifacts"))
        );
        assert!(provider.calls().is_empty());
        assert!(shell.commands().is_empty());
        assert_eq!(shell.disconnects, 1);
    }

    #[tokio::test]
    async fn without_known_server_fails_before_any_call() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let mut orchestrator = Orchestrator::new(&provider, &mut shell, config(), artifacts());

        let err = orchestrator.rollback("snap-1").await.unwrap_err();

        assert!(matches!(err, DeployError::NoServerId));
        assert_eq!(err.to_string(), "no server id available");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn restores_then_waits_for_running_and_ssh() {
        let provider = FakeProvider::new();
        let mut shell = FakeShell::new();
        let mut orchestrator = Orchestrator::new(&provider, &mut shell, config(), artifacts());
        orchestrator.attach("981", "203.0.113.9");

        orchestrator.rollback("snap-1").await.unwrap();

        let calls = provider.calls();
        assert_eq!(calls[0], "restore_snapshot");
        assert!(calls[1..].iter().all(|c| c == "get_status"));
        assert_eq!(
            *shell.reachable_checks.lock().unwrap(),
            vec!["203.0.113.9".to_string()]
        );
    }

    #[tokio::test]
    async fn provider_error_state_fails_rollback() {
        let provider = FakeProvider {
            statuses: Mutex::new(VecDeque::from([ResourceState::Error])),
            ..FakeProvider::new()
        };
        let mut shell = FakeShell::new();
        let mut orchestrator = Orchestrator::new(&provider, &mut shell, config(), artifacts());
        orchestrator.attach("981", "");

        let err = orchestrator.rollback("snap-1").await.unwrap_err();

        assert!(matches!(
            err,
            DeployError::Provider(provider::Error::ResourceError { .. })
        ));
        assert!(shell.reachable_checks.lock().unwrap().is_empty());
    }
}
