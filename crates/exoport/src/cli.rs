use std::path::PathBuf;

use clap::{
    builder::{OsStringValueParser, TypedValueParser},
    Args, Parser,
};

/// CLI configuration.
#[derive(Parser)]
#[command(about, version)]
pub(crate) struct Cli {
    /// Configuration file path.
    #[arg(long, default_value = common::config::DEFAULT_CONFIG_FILE)]
    pub config_file: Option<PathBuf>,

    /// Custom build service path, overrides the configuration file.
    #[arg(long)]
    pub server_path: Option<String>,

    /// Write a copy of the packaged application archive to this path.
    #[arg(long, value_name = "PATH")]
    pub dump_archive: Option<PathBuf>,

    /// Build request arguments.
    #[command(flatten)]
    pub build: BuildArgs,
}

/// Raw build request arguments.
///
/// Every value is optional at the parser level, so that all of the missing
/// values can be reported at once during validation. A flag given without
/// a value is read as an empty string.
#[derive(Args, Debug, Default)]
pub(crate) struct BuildArgs {
    /// Application name.
    #[arg(
        short = 'a',
        long = "appName",
        num_args = 0..=1,
        default_missing_value = "",
    )]
    pub app_name: Option<String>,

    /// Application package name, e.g. `com.example.app`.
    #[arg(
        short = 'p',
        long = "packageName",
        num_args = 0..=1,
        default_missing_value = "",
    )]
    pub package_name: Option<String>,

    /// Build type, either `production` or `debug`.
    #[arg(long = "buildType", num_args = 0..=1, default_missing_value = "")]
    pub build_type: Option<String>,

    /// Model archive path.
    #[arg(
        short = 'm',
        long = "model",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub model: Option<PathBuf>,

    /// Portal archive path.
    #[arg(
        short = 'r',
        long = "portal",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub portal: Option<PathBuf>,

    /// Application content directory.
    #[arg(
        short = 'f',
        long = "content",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub content: Option<PathBuf>,

    /// Path where to save the built artifact.
    #[arg(
        short = 'o',
        long = "output",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub output: Option<PathBuf>,

    /// Signing certificate path.
    #[arg(
        short = 'c',
        long = "cert",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub cert: Option<PathBuf>,

    /// Signing private key path.
    #[arg(
        short = 'k',
        long = "privkey",
        num_args = 0..=1,
        default_missing_value = "",
        value_parser = path_parser(),
    )]
    pub privkey: Option<PathBuf>,
}

/// Path value parser that, unlike the default one, accepts empty values.
fn path_parser() -> impl TypedValueParser<Value = PathBuf> {
    OsStringValueParser::new().map(PathBuf::from)
}
