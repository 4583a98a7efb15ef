use super::GatewayInstall;
use crate::cleanup;
use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// A copy of `root/conf.yaml` with the listen port substituted, written next
/// to the original as `conf-{port}.yaml`.
///
/// The filename is deterministic per port and the contents are a pure
/// function of the stock config, so recreating an overlay (including by a
/// concurrent manager instance sharing the directory) is idempotent. The file
/// is removed on drop and by the signal-cleanup path; the gateway only reads
/// it at startup, so deletion while the gateway runs is harmless.
#[derive(Debug)]
pub struct TemporaryConfigOverlay {
    path: PathBuf,
    port: u16,
}

impl TemporaryConfigOverlay {
    /// Materialize an overlay for `port` beside the installation's conf.yaml.
    pub fn write(install: &GatewayInstall, port: u16) -> Result<Self> {
        let source = install.conf_file();
        let contents = fs::read_to_string(&source).map_err(|e| {
            Error::Config(format!(
                "Failed to read gateway config '{}': {}",
                source.display(),
                e
            ))
        })?;

        let rewritten = substitute_listen_port(&contents, port)?;
        let path = install.conf_dir().join(format!("conf-{}.yaml", port));
        fs::write(&path, rewritten)?;
        cleanup::register_overlay(&path);
        tracing::info!("Wrote overlay config {} for port {}", path.display(), port);

        Ok(Self { path, port })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for TemporaryConfigOverlay {
    fn drop(&mut self) {
        cleanup::unregister_overlay(&self.path);
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove overlay {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Rewrite the `listenPort:` line, preserving everything else byte for byte.
///
/// The gateway's conf.yaml carries upstream comments and non-standard tags a
/// YAML round-trip would mangle, so this is a line-oriented substitution
/// keyed on the one field we change.
fn substitute_listen_port(contents: &str, port: u16) -> Result<String> {
    let mut found = false;
    let rewritten: Vec<String> = contents
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("listenPort:") {
                found = true;
                let indent = &line[..line.len() - trimmed.len()];
                format!("{}listenPort: {}", indent, port)
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        return Err(Error::Config(
            "Gateway conf.yaml has no listenPort key".to_string(),
        ));
    }
    Ok(rewritten.join("\n") + "\n")
}
