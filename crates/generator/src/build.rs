use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use storekit_core::error::{Error, Result};
use storekit_core::types::{AssetBundle, BundleFile};
use tokio::process::Command;
use walkdir::WalkDir;

/// Files and directories that must never reach the hosting provider even if
/// they end up under the output directory.
const DENY_LIST: &[&str] = &[
    "package.json",
    "package-lock.json",
    "node_modules",
    "src",
    "build.js",
    "site.config.json",
];

/// Toolchain invocations for one build. Defaults to npm; tests substitute
/// plain shell commands.
#[derive(Debug, Clone)]
pub struct BuildCommands {
    pub install: Vec<String>,
    pub build: Vec<String>,
    /// Directory of build output, relative to the workspace.
    pub output_dir: String,
}

impl Default for BuildCommands {
    fn default() -> Self {
        Self {
            install: vec!["npm".into(), "install".into(), "--no-audit".into()],
            build: vec!["npm".into(), "run".into(), "build".into()],
            output_dir: "dist".into(),
        }
    }
}

/// Run the build toolchain inside the workspace and collect the static asset
/// bundle. Either step failing, or the deadline expiring, aborts with no
/// partial bundle.
pub async fn run_build(
    workspace: &Path,
    commands: &BuildCommands,
    deadline: Duration,
) -> Result<AssetBundle> {
    let started = std::time::Instant::now();

    run_step(workspace, &commands.install, deadline).await?;

    let remaining = deadline
        .checked_sub(started.elapsed())
        .ok_or_else(|| Error::Timeout("build budget exhausted after install".into()))?;
    run_step(workspace, &commands.build, remaining).await?;

    let output = workspace.join(&commands.output_dir);
    if !output.is_dir() {
        return Err(Error::Build(format!(
            "build produced no {} directory",
            commands.output_dir
        )));
    }
    collect_bundle(&output)
}

/// Run one toolchain step to completion, killing the process if the deadline
/// expires so no orphan keeps writing into the workspace.
async fn run_step(workspace: &Path, argv: &[String], deadline: Duration) -> Result<()> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Build("empty toolchain command".into()))?;

    tracing::debug!(command = %argv.join(" "), "running build step");
    let child = Command::new(program)
        .args(args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::Build(format!("failed to spawn {}: {}", program, e)))?;

    let output = tokio::time::timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| Error::Timeout(format!("{} exceeded the build deadline", program)))?
        .map_err(|e| Error::Build(format!("{} did not complete: {}", program, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Build(format!(
            "{} exited with {}: {}",
            argv.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// Walk the output directory into an in-memory bundle, dropping anything on
/// the deny-list.
fn collect_bundle(output: &Path) -> Result<AssetBundle> {
    let mut files = Vec::new();
    for entry in WalkDir::new(output).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Build(format!("reading build output: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(output)
            .map_err(|e| Error::Build(format!("build output path: {}", e)))?;
        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if is_denied(&relative_str) {
            tracing::debug!(path = %relative_str, "excluded from bundle");
            continue;
        }
        let bytes = std::fs::read(entry.path())?;
        files.push(BundleFile {
            path: relative_str,
            bytes,
        });
    }
    if files.is_empty() {
        return Err(Error::Build("build produced an empty bundle".into()));
    }
    Ok(AssetBundle { files })
}

fn is_denied(relative: &str) -> bool {
    let first = relative.split('/').next().unwrap_or(relative);
    DENY_LIST.contains(&first) || first.ends_with(".config.js") || first.ends_with(".config.json")
}
