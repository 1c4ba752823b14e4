// ABOUTME: Rollback of a deployed server to a provider snapshot.
// ABOUTME: Restores in place, waits for the server to run again, then for SSH.

use crate::provider::{ProviderApi, ResourceState};
use crate::ssh::RemoteShell;

use super::error::DeployError;
use super::orchestrator::Orchestrator;
use super::stage::Stage;

impl<P: ProviderApi, S: RemoteShell> Orchestrator<'_, P, S> {
    /// Restore the known server to `snapshot_id`.
    ///
    /// The server comes from the last run or from [`attach`](Self::attach).
    /// Without one, fails with [`DeployError::NoServerId`] before contacting
    /// the provider.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No server is known
    /// - The provider rejects the restore
    /// - The server does not return to running, or SSH does not come back
    pub async fn rollback(&mut self, snapshot_id: &str) -> Result<(), DeployError> {
        let id = self
            .state
            .resource_id()
            .map(str::to_string)
            .ok_or(DeployError::NoServerId)?;

        self.notify(
            Stage::Snapshot,
            &format!("restoring server {id} to snapshot {snapshot_id}"),
        );
        self.provider
            .restore_snapshot(&id, snapshot_id, None)
            .await?;

        let progress = self.progress;
        let on_progress = move |state: &ResourceState| {
            progress.stage(Stage::WaitProvisioning, &format!("server is {state}"));
        };
        let options = self.wait_options(&on_progress);
        self.provider
            .wait_for_status(&id, ResourceState::Running, options)
            .await?;

        if let Some(address) = self.state.address().map(str::to_string) {
            self.notify(
                Stage::WaitReachable,
                &format!("waiting for SSH on {address}:{}", self.config.ssh_port),
            );
            let on_retry = move |attempt: u32, reason: &str| {
                progress.stage(
                    Stage::WaitReachable,
                    &format!("SSH not ready (attempt {attempt}): {reason}"),
                );
            };
            let options = self.reachability(&on_retry);
            self.session.wait_reachable(&address, &options).await?;
        }

        self.notify(
            Stage::Complete,
            &format!("server {id} restored to snapshot {snapshot_id}"),
        );
        Ok(())
    }
}
