//! Subprocess wrappers for invoking the device and host compilers.
//!
//! Modeled on `xtask/src/cargo.rs`'s `CargoCommand::run`: build up an argv,
//! run it with `std::process::Command`, and turn a non-zero exit into a
//! `ToolchainFailure` carrying the captured stderr. Command construction is
//! split from execution so the argv itself is unit-testable without
//! spawning anything.

use crate::error::BuildError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

/// A compiler binary invoked as a subprocess, plus the fixed arguments every
/// invocation through it carries.
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Path or bare name of the compiler binary (e.g. `"clang"`, `"rustc"`).
    binary: String,
}

impl Toolchain {
    /// Builds a toolchain wrapper around the given compiler binary.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }

    /// Builds the `Command` that compiles `source` into a relocatable object
    /// at `output`, targeting `target_triple`, with `extra_args` appended
    /// (e.g. `-I` search paths, `-D` defines).
    #[must_use]
    pub fn build_object_command(
        &self,
        source: &Path,
        output: &Path,
        target_triple: &str,
        extra_args: &[&OsStr],
    ) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-c")
            .arg("--target")
            .arg(target_triple)
            .arg("-o")
            .arg(output)
            .args(extra_args)
            .arg(source);
        cmd
    }

    /// Compiles `source` into a relocatable object at `output`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the subprocess cannot be spawned, or
    /// [`BuildError::ToolchainFailure`] if it exits unsuccessfully.
    pub fn compile_object(
        &self,
        source: &Path,
        output: &Path,
        target_triple: &str,
        extra_args: &[&OsStr],
    ) -> Result<(), BuildError> {
        let mut cmd = self.build_object_command(source, output, target_triple, extra_args);
        self.run(&mut cmd)
    }

    /// Builds the `Command` that links `objects` into a single shared
    /// object or executable at `output`.
    #[must_use]
    pub fn build_link_command(&self, objects: &[&Path], output: &Path, extra_args: &[&OsStr]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(objects).arg("-o").arg(output).args(extra_args);
        cmd
    }

    /// Links `objects` into a single artefact at `output`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Io`] if the subprocess cannot be spawned, or
    /// [`BuildError::ToolchainFailure`] if it exits unsuccessfully.
    pub fn link(&self, objects: &[&Path], output: &Path, extra_args: &[&OsStr]) -> Result<(), BuildError> {
        let mut cmd = self.build_link_command(objects, output, extra_args);
        self.run(&mut cmd)
    }

    fn run(&self, cmd: &mut Command) -> Result<(), BuildError> {
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(BuildError::ToolchainFailure {
                tool: self.binary.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
