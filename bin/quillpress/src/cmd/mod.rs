//! Command implementations.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, eyre};
use quillpress_core::{ConfigFile, config::CONFIG_FILE_NAMES};
use quillpress_generator::BuildOptions;

pub mod build;
pub mod watch;

/// Resolve command line flags into build options.
///
/// Without `--config`, the first of `config.toml`, `config.yaml` and
/// `config.yml` found in `cwd` is used.
pub fn build_options(
    config: Option<&Path>,
    cwd: &Path,
    output: Option<PathBuf>,
    drafts: bool,
) -> Result<BuildOptions> {
    let config_file = match config {
        Some(path) => ConfigFile::from_path(path).wrap_err("Invalid config file")?,
        None => ConfigFile::detect(cwd).ok_or_else(|| {
            eyre!(
                "no config file found in {}, expected one of {}",
                cwd.display(),
                CONFIG_FILE_NAMES.join(", ")
            )
        })?,
    };

    Ok(BuildOptions {
        output_dir: output,
        enable_drafts: drafts,
        env_overrides: true,
        ..BuildOptions::new(config_file)
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use quillpress_core::ConfigFormat;

    use super::*;

    #[test]
    fn test_explicit_config() {
        let options =
            build_options(Some(Path::new("site/config.yml")), Path::new("."), None, true).expect("options");

        assert_eq!(options.config_file.format, ConfigFormat::Yaml);
        assert_eq!(options.root, PathBuf::from("site"));
        assert!(options.enable_drafts);
        assert!(options.env_overrides);
        assert!(options.output_dir.is_none());
    }

    #[test]
    fn test_detect_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::write(dir.path().join("config.yaml"), "").expect("write config");

        let options =
            build_options(None, dir.path(), Some(PathBuf::from("out")), false).expect("options");
        assert_eq!(options.config_file.path, dir.path().join("config.yaml"));
        assert_eq!(options.root, dir.path());
        assert_eq!(options.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_missing_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let err = build_options(None, dir.path(), None, false).expect_err("no config");
        assert!(err.to_string().contains("no config file found"));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(build_options(Some(Path::new("config.json")), Path::new("."), None, false).is_err());
    }
}
