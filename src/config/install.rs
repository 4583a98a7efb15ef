use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Name of the gateway's router jar inside `dist/`.
const GATEWAY_JAR: &str = "ibgroup.web.core.iblink.router.clientportal.gw.jar";

/// Which config file the gateway should be launched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigVariant {
    /// The stock `root/conf.yaml`.
    Default,
    /// A per-port overlay, `root/conf-{port}.yaml`.
    Overlay(u16),
}

impl ConfigVariant {
    /// Config path relative to the installation root, as passed on the
    /// gateway's `--conf` flag.
    pub fn conf_arg(&self) -> String {
        match self {
            ConfigVariant::Default => "root/conf.yaml".to_string(),
            ConfigVariant::Overlay(port) => format!("root/conf-{}.yaml", port),
        }
    }
}

/// Filesystem layout of a Client Portal Gateway installation.
///
/// The layout is fixed by the upstream bundle: a `root/` config directory,
/// the router jar under `dist/`, runtime libraries under `build/lib/runtime/`
/// and a bundled per-platform JRE under `runtime/<os>-<arch>/`.
#[derive(Debug, Clone)]
pub struct GatewayInstall {
    root: PathBuf,
}

impl GatewayInstall {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `root/` config directory (also first on the classpath).
    pub fn conf_dir(&self) -> PathBuf {
        self.root.join("root")
    }

    /// The stock configuration file with the `listenPort:` key.
    pub fn conf_file(&self) -> PathBuf {
        self.conf_dir().join("conf.yaml")
    }

    pub fn jar(&self) -> PathBuf {
        self.root.join("dist").join(GATEWAY_JAR)
    }

    /// Runtime library directory; appended to the classpath as a `/*` glob.
    pub fn runtime_lib_dir(&self) -> PathBuf {
        self.root.join("build").join("lib").join("runtime")
    }

    /// `{os}-{arch}` tag naming the bundled runtime directory for this host.
    pub fn platform_tag() -> String {
        let os = match std::env::consts::OS {
            "macos" => "macos",
            "windows" => "windows",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "x64",
            "aarch64" => "arm64",
            other => other,
        };
        format!("{}-{}", os, arch)
    }

    /// Path of the bundled `java` executable for this host platform. Fails
    /// with [`Error::RuntimeNotFound`] if the binary is absent — a packaging
    /// problem, not something a retry can fix.
    pub fn runtime_java(&self) -> Result<PathBuf> {
        let platform = Self::platform_tag();
        let binary = if cfg!(windows) { "java.exe" } else { "java" };
        let path = self
            .root
            .join("runtime")
            .join(&platform)
            .join("bin")
            .join(binary);
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::RuntimeNotFound {
                platform,
                path: path.display().to_string(),
            })
        }
    }

    /// Verify the installation exists on disk. Checked before every launch;
    /// failure is fatal and non-retryable.
    pub fn verify(&self) -> Result<()> {
        if !self.root.is_dir() {
            return Err(Error::GatewayNotInstalled(self.root.display().to_string()));
        }
        if !self.jar().is_file() {
            return Err(Error::GatewayNotInstalled(format!(
                "{} (missing {})",
                self.root.display(),
                self.jar().display()
            )));
        }
        if !self.conf_file().is_file() {
            return Err(Error::GatewayNotInstalled(format!(
                "{} (missing {})",
                self.root.display(),
                self.conf_file().display()
            )));
        }
        Ok(())
    }
}
