//! Headless document conversion with an ordered fallback chain.
//!
//! ## Why infer success from files?
//!
//! LibreOffice in `--headless --convert-to` mode exits with status 0 when it
//! could not load the document, and with non-zero statuses after successful
//! conversions when another instance held its profile lock. Its exit code is
//! therefore ignored: a stage succeeded if and only if the expected output
//! file `<outdir>/<stem>.<ext>` exists afterwards. That inference lives in
//! [`ConversionEngine`] and nowhere else, so any engine implementing
//! [`HeadlessEngine`] can be dropped in.
//!
//! ## Why a private profile per call?
//!
//! LibreOffice guards its user profile with a single-writer lock. Two
//! conversions sharing the default profile race for it, and the loser
//! silently produces nothing. Every [`ConversionEngine::convert`] call
//! creates its own `soffice_profile_*` directory, owned by a `TempDir` and
//! removed when the call returns, whatever the outcome.

use crate::pipeline::input::file_stem;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Prefix of the per-call engine profile directory.
pub const PROFILE_DIR_PREFIX: &str = "soffice_profile_";
/// Prefix of the per-job conversion output directory.
pub const CONVERT_DIR_PREFIX: &str = "soffice_convert_";

/// Formats the engine is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    /// Fixed-layout page description; the rasterisation input.
    Pdf,
    /// OpenDocument text; the stepping stone of the fallback stage.
    Odt,
}

impl TargetFormat {
    /// Value for `--convert-to`, which is also the output file extension.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Odt => "odt",
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One request to the external engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineInvocation<'a> {
    pub source: &'a Path,
    pub target: TargetFormat,
    pub output_dir: &'a Path,
    pub profile_dir: &'a Path,
}

/// A headless batch converter, treated as a black box.
///
/// Implementations run the conversion to completion and return nothing: the
/// caller judges the outcome by looking for
/// `<output_dir>/<source_stem>.<target_ext>`.
pub trait HeadlessEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Run one blocking conversion.
    fn invoke(&self, invocation: &EngineInvocation<'_>);
}

/// LibreOffice `soffice` driven from the command line.
#[derive(Debug, Clone)]
pub struct SofficeEngine {
    binary: PathBuf,
}

impl SofficeEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The full argument vector for an invocation.
    pub fn args(invocation: &EngineInvocation<'_>) -> Vec<String> {
        vec![
            format!(
                "-env:UserInstallation=file://{}",
                invocation.profile_dir.display()
            ),
            "--invisible".into(),
            "--headless".into(),
            "--norestore".into(),
            "--convert-to".into(),
            invocation.target.extension().into(),
            "--outdir".into(),
            invocation.output_dir.display().to_string(),
            invocation.source.display().to_string(),
        ]
    }
}

impl Default for SofficeEngine {
    fn default() -> Self {
        Self::new("soffice")
    }
}

impl HeadlessEngine for SofficeEngine {
    fn name(&self) -> &str {
        "soffice"
    }

    fn invoke(&self, invocation: &EngineInvocation<'_>) {
        let status = Command::new(&self.binary)
            .args(Self::args(invocation))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        // Logged only; the exit status carries no reliable information.
        match status {
            Ok(s) => debug!(
                "{} → {}: exited with {}",
                invocation.source.display(),
                invocation.target,
                s
            ),
            Err(e) => warn!("Failed to launch {}: {}", self.binary.display(), e),
        }
    }
}

/// Stages of the conversion fallback chain, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStage {
    /// Source → target in one invocation.
    Direct,
    /// Source → ODT, then ODT → target.
    ViaIntermediate,
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionAttempt {
    pub stage: ConversionStage,
    pub succeeded: bool,
}

/// Outcome of a whole [`ConversionEngine::convert`] call.
///
/// Failure is an ordinary value here: `output()` is `None` and `attempts`
/// tells which stages ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    attempts: Vec<ConversionAttempt>,
    output: Option<PathBuf>,
}

impl Conversion {
    /// Path of the converted file, if any stage produced it.
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn into_output(self) -> Option<PathBuf> {
        self.output
    }

    pub fn attempts(&self) -> &[ConversionAttempt] {
        &self.attempts
    }

    /// The stage that produced the output.
    pub fn succeeded_stage(&self) -> Option<ConversionStage> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| a.stage)
    }

    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }
}

/// Drives a [`HeadlessEngine`] through the fallback chain.
#[derive(Clone)]
pub struct ConversionEngine {
    engine: Arc<dyn HeadlessEngine>,
}

impl ConversionEngine {
    pub fn new(engine: Arc<dyn HeadlessEngine>) -> Self {
        Self { engine }
    }

    /// Stages to try for a target, in order.
    pub fn stages_for(target: TargetFormat) -> &'static [ConversionStage] {
        match target {
            TargetFormat::Odt => &[ConversionStage::Direct],
            TargetFormat::Pdf => &[ConversionStage::Direct, ConversionStage::ViaIntermediate],
        }
    }

    /// Convert `source` into `target`, writing into `output_dir`.
    ///
    /// `output_dir` must not already contain the expected output; callers
    /// pass a freshly created directory. Never fails with an error: an
    /// unsuccessful chain is a [`Conversion`] whose `output()` is `None`.
    pub fn convert(&self, source: &Path, target: TargetFormat, output_dir: &Path) -> Conversion {
        let profile = match tempfile::Builder::new()
            .prefix(PROFILE_DIR_PREFIX)
            .tempdir()
        {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Cannot create engine profile directory: {}", e);
                return Conversion {
                    attempts: Vec::new(),
                    output: None,
                };
            }
        };

        let mut attempts = Vec::new();
        let mut output = None;

        for &stage in Self::stages_for(target) {
            let produced = self.run_stage(stage, source, target, output_dir, &profile);
            attempts.push(ConversionAttempt {
                stage,
                succeeded: produced.is_some(),
            });
            if let Some(path) = produced {
                info!(
                    "Converted {} → {} via {:?} stage",
                    source.display(),
                    target,
                    stage
                );
                output = Some(path);
                break;
            }
            debug!("{:?} stage produced no {} output", stage, target);
        }

        if output.is_none() {
            warn!(
                "{} could not convert {} to {} ({} stage(s) tried)",
                self.engine.name(),
                source.display(),
                target,
                attempts.len()
            );
        }

        // `profile` dropped here: the directory goes on every path.
        Conversion { attempts, output }
    }

    fn run_stage(
        &self,
        stage: ConversionStage,
        source: &Path,
        target: TargetFormat,
        output_dir: &Path,
        profile: &TempDir,
    ) -> Option<PathBuf> {
        match stage {
            ConversionStage::Direct => self.invoke_expecting(source, target, output_dir, profile),
            ConversionStage::ViaIntermediate => {
                let intermediate =
                    self.invoke_expecting(source, TargetFormat::Odt, output_dir, profile)?;
                self.invoke_expecting(&intermediate, target, output_dir, profile)
            }
        }
    }

    /// Run one engine invocation and report the expected output if it exists.
    fn invoke_expecting(
        &self,
        source: &Path,
        target: TargetFormat,
        output_dir: &Path,
        profile: &TempDir,
    ) -> Option<PathBuf> {
        let expected = expected_output(source, target, output_dir);
        self.engine.invoke(&EngineInvocation {
            source,
            target,
            output_dir,
            profile_dir: profile.path(),
        });
        expected.is_file().then_some(expected)
    }
}

/// `<output_dir>/<source_stem>.<target_ext>`, the engine's naming convention.
pub fn expected_output(source: &Path, target: TargetFormat, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.{}", file_stem(source), target.extension()))
}

/// A fresh `soffice_convert_*` directory for one job's conversion outputs.
pub fn conversion_dir() -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix(CONVERT_DIR_PREFIX).tempdir()
}
