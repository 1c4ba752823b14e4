// ABOUTME: Pre-rendered files uploaded during deployment.
// ABOUTME: Paths in the config are read relative to the config file's directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::deploy::DeployArtifacts;
use crate::error::{Error, Result};
use crate::ssh::RenderedTemplate;

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    pub setup_script: PathBuf,
    pub compose: PathBuf,
    #[serde(default)]
    pub env_file: Option<PathBuf>,
    pub proxy_config: PathBuf,
}

impl ArtifactsConfig {
    pub fn load(&self, base_dir: &Path) -> Result<DeployArtifacts> {
        Ok(DeployArtifacts {
            setup_script: read(base_dir, &self.setup_script, "setup.sh")?.mode(0o755),
            compose_manifest: read(base_dir, &self.compose, "docker-compose.yml")?,
            env_file: match &self.env_file {
                Some(path) => Some(read(base_dir, path, ".env")?.mode(0o600)),
                None => None,
            },
            proxy_config: read(base_dir, &self.proxy_config, "nginx.conf")?,
        })
    }
}

fn read(base_dir: &Path, path: &Path, name: &str) -> Result<RenderedTemplate> {
    let path = base_dir.join(path);
    let content = std::fs::read_to_string(&path).map_err(|source| Error::Artifact {
        path: path.clone(),
        source,
    })?;
    Ok(RenderedTemplate::new(name, content))
}
