//! CMake adapter for recipes whose sources carry a CMakeLists.txt.

use std::path::{Path, PathBuf};

use crate::builder::tool::{BuildError, BuildOutput, BuildTool};
use crate::core::settings::{SettingsModel, BUILD_TYPE};
use crate::util::fs::ensure_dir;
use crate::util::process::{find_cmake, output_log, ProcessBuilder};

/// Build type used when the settings do not name one.
pub const DEFAULT_BUILD_TYPE: &str = "Release";

/// CMake build adapter.
///
/// Runs configure, build and install against `<work>/build`, installing into
/// `<work>/install`.
#[derive(Debug, Clone, Default)]
pub struct CMakeBuilder {
    cmake_args: Vec<String>,
    generator: Option<String>,
    jobs: Option<u32>,
}

impl CMakeBuilder {
    /// Create a new CMake builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add CMake arguments passed at configure time.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.cmake_args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Use a specific CMake generator.
    pub fn generator(mut self, generator: Option<String>) -> Self {
        self.generator = generator;
        self
    }

    /// Limit build parallelism.
    pub fn jobs(mut self, jobs: Option<u32>) -> Self {
        self.jobs = jobs;
        self
    }

    fn build_type(settings: &SettingsModel) -> &str {
        settings.get(BUILD_TYPE).unwrap_or(DEFAULT_BUILD_TYPE)
    }

    /// The configure invocation for a source tree.
    pub fn configure_command(
        &self,
        cmake: &Path,
        source: &Path,
        settings: &SettingsModel,
        work_dir: &Path,
    ) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(cmake)
            .arg("-S")
            .arg(source)
            .arg("-B")
            .arg(work_dir.join("build"));

        if let Some(generator) = &self.generator {
            cmd = cmd.arg("-G").arg(generator);
        }

        cmd = cmd
            .arg(format!("-DCMAKE_BUILD_TYPE={}", Self::build_type(settings)))
            .arg(format!(
                "-DCMAKE_INSTALL_PREFIX={}",
                install_prefix(work_dir).display()
            ));

        for (key, value) in settings.options() {
            cmd = cmd.arg(format!("-D{}={}", key, value));
        }

        cmd.args(&self.cmake_args)
    }

    fn compile_command(
        &self,
        cmake: &Path,
        settings: &SettingsModel,
        work_dir: &Path,
    ) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(cmake)
            .arg("--build")
            .arg(work_dir.join("build"))
            .arg("--parallel");
        if let Some(jobs) = self.jobs {
            cmd = cmd.arg(jobs.to_string());
        }

        // Multi-config generators (Visual Studio, Xcode) pick the config here
        cmd.arg("--config").arg(Self::build_type(settings))
    }

    fn install_command(
        &self,
        cmake: &Path,
        settings: &SettingsModel,
        work_dir: &Path,
    ) -> ProcessBuilder {
        ProcessBuilder::new(cmake)
            .arg("--install")
            .arg(work_dir.join("build"))
            .arg("--config")
            .arg(Self::build_type(settings))
    }
}

/// Run one step, turning a nonzero exit into `BuildFailed`.
fn run_step(step: &str, cmd: ProcessBuilder) -> Result<String, BuildError> {
    tracing::info!("CMake {}", step);

    let output = cmd.exec().map_err(|e| BuildError::BuildFailed {
        exit_code: None,
        log: format!("failed to run `{}`: {}", cmd.display_command(), e),
    })?;

    let log = output_log(&output);
    if !output.status.success() {
        return Err(BuildError::BuildFailed {
            exit_code: output.status.code(),
            log,
        });
    }

    Ok(log)
}

impl BuildTool for CMakeBuilder {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn build(
        &self,
        source: &Path,
        settings: &SettingsModel,
        work_dir: &Path,
    ) -> Result<BuildOutput, BuildError> {
        if !is_cmake_project(source) {
            return Err(BuildError::BuildFailed {
                exit_code: None,
                log: format!("no CMakeLists.txt in {}", source.display()),
            });
        }

        let cmake = find_cmake().ok_or_else(|| BuildError::BuildFailed {
            exit_code: None,
            log: "CMake not found\n\
                  \n\
                  CMake is required to build this recipe.\n\
                  Install CMake and ensure it's in your PATH."
                .to_string(),
        })?;

        let build_dir = work_dir.join("build");
        ensure_dir(&build_dir).map_err(|e| BuildError::BuildFailed {
            exit_code: None,
            log: format!("{:#}", e),
        })?;

        run_step(
            "configure",
            self.configure_command(&cmake, source, settings, work_dir),
        )?;
        run_step("build", self.compile_command(&cmake, settings, work_dir))?;
        run_step("install", self.install_command(&cmake, settings, work_dir))?;

        let install_dir = install_prefix(work_dir);
        Ok(BuildOutput {
            install_dir: install_dir.is_dir().then_some(install_dir),
            search_roots: vec![build_dir, source.to_path_buf()],
        })
    }
}

/// Check if a directory contains a CMake project.
pub fn is_cmake_project(dir: &Path) -> bool {
    dir.join("CMakeLists.txt").exists()
}

/// Directory CMake will install into for a given work dir.
pub fn install_prefix(work_dir: &Path) -> PathBuf {
    work_dir.join("install")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> SettingsModel {
        SettingsModel::new()
            .with("compiler", "gcc")
            .with(BUILD_TYPE, "Debug")
            .with("options.shared", "ON")
    }

    #[test]
    fn test_is_cmake_project() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_cmake_project(tmp.path()));

        std::fs::write(
            tmp.path().join("CMakeLists.txt"),
            "cmake_minimum_required(VERSION 3.10)",
        )
        .unwrap();
        assert!(is_cmake_project(tmp.path()));
    }

    #[test]
    fn test_build_requires_cmake_lists() {
        let tmp = TempDir::new().unwrap();
        let err = CMakeBuilder::new()
            .build(tmp.path(), &settings(), &tmp.path().join("work"))
            .unwrap_err();

        let BuildError::BuildFailed { exit_code, log } = err;
        assert_eq!(exit_code, None);
        assert!(log.contains("CMakeLists.txt"));
    }

    #[test]
    fn test_configure_command() {
        let builder = CMakeBuilder::new().args(["-DCELAENO_TESTS=OFF"]);
        let cmd = builder.configure_command(
            Path::new("cmake"),
            Path::new("/src"),
            &settings(),
            Path::new("/work"),
        );
        let args = cmd.get_args();

        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Debug".to_string()));
        assert!(args.contains(&format!(
            "-DCMAKE_INSTALL_PREFIX={}",
            install_prefix(Path::new("/work")).display()
        )));
        assert!(args.contains(&"-Dshared=ON".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("-DCELAENO_TESTS=OFF"));
        assert!(!args.contains(&"-G".to_string()));
    }

    #[test]
    fn test_configure_defaults_to_release() {
        let cmd = CMakeBuilder::new()
            .generator(Some("Ninja".into()))
            .configure_command(
                Path::new("cmake"),
                Path::new("/src"),
                &SettingsModel::new(),
                Path::new("/work"),
            );
        let args = cmd.get_args();

        assert!(args.contains(&"-DCMAKE_BUILD_TYPE=Release".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-G" && w[1] == "Ninja"));
    }

    #[test]
    fn test_compile_command_jobs() {
        let cmd = CMakeBuilder::new()
            .jobs(Some(4))
            .compile_command(Path::new("cmake"), &settings(), Path::new("/work"));
        let args = cmd.get_args();

        assert!(args.windows(2).any(|w| w[0] == "--parallel" && w[1] == "4"));
        assert!(args.windows(2).any(|w| w[0] == "--config" && w[1] == "Debug"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_step_reports_exit_code() {
        let cmd = ProcessBuilder::new("sh").args(["-c", "echo CMake Error; exit 1"]);
        let err = run_step("configure", cmd).unwrap_err();

        let BuildError::BuildFailed { exit_code, log } = err;
        assert_eq!(exit_code, Some(1));
        assert!(log.contains("CMake Error"));
    }

    #[test]
    fn test_missing_program_has_no_exit_code() {
        let cmd = ProcessBuilder::new("quay-definitely-not-cmake");
        let err = run_step("configure", cmd).unwrap_err();

        let BuildError::BuildFailed { exit_code, .. } = err;
        assert_eq!(exit_code, None);
    }
}
