// ABOUTME: Remote shell trait used by the deployment pipeline.
// ABOUTME: Implemented by the russh Session; pipeline tests provide scripted doubles.

use super::client::{Credentials, ExecResult, RenderedTemplate, Session, SessionState};
use super::error::{Error, Result};
use super::probe::ReachabilityOptions;
use async_trait::async_trait;
use std::time::Duration;

/// Command execution and file operations over one remote connection.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    fn state(&self) -> SessionState;

    /// Timeout applied by [`exec`](Self::exec).
    fn command_timeout(&self) -> Duration;

    /// Connect, replacing any existing connection.
    async fn connect(&mut self, credentials: &Credentials) -> Result<()>;

    /// Close the connection. Does nothing when already disconnected.
    async fn disconnect(&mut self) -> Result<()>;

    /// Run `command`, giving up after `timeout`.
    async fn exec_with_timeout(&self, command: &str, timeout: Duration) -> Result<ExecResult>;

    /// Write `content` to `remote_path`, optionally setting its mode.
    async fn upload_content(
        &mut self,
        content: &[u8],
        remote_path: &str,
        mode: Option<u32>,
    ) -> Result<()>;

    /// Whether `path` exists. Failures count as "no".
    async fn file_exists(&mut self, path: &str) -> bool;

    /// Create `path` and any missing parents.
    async fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Wait until `host` answers with an SSH banner.
    async fn wait_reachable(&self, host: &str, options: &ReachabilityOptions<'_>) -> Result<()> {
        Session::wait_for_ssh(host, options).await
    }

    fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Run `command` with the default timeout.
    async fn exec(&self, command: &str) -> Result<ExecResult> {
        self.exec_with_timeout(command, self.command_timeout()).await
    }

    /// Run `command` and return its stdout, failing on a non-zero exit.
    async fn exec_or_fail(&self, command: &str) -> Result<String> {
        let result = self.exec(command).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            })
        }
    }

    /// Run `commands` one after another, in order.
    async fn exec_all(&self, commands: &[&str]) -> Result<Vec<ExecResult>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.exec(command).await?);
        }
        Ok(results)
    }

    /// Upload pre-rendered text verbatim with the template's mode.
    async fn upload_template(
        &mut self,
        template: &RenderedTemplate,
        remote_path: &str,
    ) -> Result<()> {
        tracing::debug!(template = %template.name, path = remote_path, "uploading template");
        self.upload_content(template.content.as_bytes(), remote_path, Some(template.mode))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers commands by exact match; unknown commands exit 0 silently.
    struct ScriptedShell {
        replies: Vec<(&'static str, ExecResult)>,
        ran: Mutex<Vec<String>>,
        uploaded: Vec<(String, Vec<u8>, Option<u32>)>,
    }

    impl ScriptedShell {
        fn new(replies: Vec<(&'static str, ExecResult)>) -> Self {
            Self {
                replies,
                ran: Mutex::new(Vec::new()),
                uploaded: Vec::new(),
            }
        }
    }

    fn reply(exit_code: u32, stdout: &str, stderr: &str) -> ExecResult {
        ExecResult {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            signal: None,
        }
    }

    #[async_trait]
    impl RemoteShell for ScriptedShell {
        fn state(&self) -> SessionState {
            SessionState::Connected
        }

        fn command_timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn connect(&mut self, _credentials: &Credentials) -> Result<()> {
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            Ok(())
        }

        async fn exec_with_timeout(&self, command: &str, _timeout: Duration) -> Result<ExecResult> {
            self.ran.lock().unwrap().push(command.to_string());
            Ok(self
                .replies
                .iter()
                .find(|(c, _)| *c == command)
                .map(|(_, r)| r.clone())
                .unwrap_or_else(|| reply(0, "", "")))
        }

        async fn upload_content(
            &mut self,
            content: &[u8],
            remote_path: &str,
            mode: Option<u32>,
        ) -> Result<()> {
            self.uploaded
                .push((remote_path.to_string(), content.to_vec(), mode));
            Ok(())
        }

        async fn file_exists(&mut self, _path: &str) -> bool {
            false
        }

        async fn mkdir(&mut self, _path: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn exec_all_runs_in_order_and_keeps_failures() {
        let shell = ScriptedShell::new(vec![
            ("first", reply(0, "one", "")),
            ("second", reply(3, "", "bad")),
            ("third", reply(0, "three", "")),
        ]);

        let results = shell.exec_all(&["first", "second", "third"]).await.unwrap();

        assert_eq!(*shell.ran.lock().unwrap(), ["first", "second", "third"]);
        let codes: Vec<u32> = results.iter().map(|r| r.exit_code).collect();
        assert_eq!(codes, [0, 3, 0]);
        assert_eq!(results[2].stdout, "three");
    }

    #[tokio::test]
    async fn exec_or_fail_returns_stdout_on_success() {
        let shell = ScriptedShell::new(vec![("hostname", reply(0, "web-1", ""))]);
        assert_eq!(shell.exec_or_fail("hostname").await.unwrap(), "web-1");
    }

    #[tokio::test]
    async fn exec_or_fail_carries_both_streams() {
        let shell = ScriptedShell::new(vec![(
            "apt-get install -y nginx",
            reply(100, "Reading package lists...", "E: Unable to locate package"),
        )]);

        let err = shell
            .exec_or_fail("apt-get install -y nginx")
            .await
            .unwrap_err();

        match err {
            Error::CommandFailed {
                command,
                exit_code,
                stdout,
                stderr,
            } => {
                assert_eq!(command, "apt-get install -y nginx");
                assert_eq!(exit_code, 100);
                assert_eq!(stdout, "Reading package lists...");
                assert_eq!(stderr, "E: Unable to locate package");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_template_applies_template_mode() {
        let mut shell = ScriptedShell::new(Vec::new());
        let template = RenderedTemplate {
            name: "setup".to_string(),
            content: "#!/bin/bash\n".to_string(),
            mode: 0o755,
        };

        shell.upload_template(&template, "/root/setup.sh").await.unwrap();

        assert_eq!(
            shell.uploaded,
            [("/root/setup.sh".to_string(), b"#!/bin/bash\n".to_vec(), Some(0o755))]
        );
    }
}
