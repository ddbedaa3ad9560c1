use std::{fmt, path::PathBuf, str::FromStr};

use derive_more::{Display, Error};
use itertools::Itertools;

use crate::cli::BuildArgs;

/// Requested build flavor.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum BuildType {
    /// Release build.
    #[display(fmt = "production")]
    Production,

    /// Debug build.
    #[default]
    #[display(fmt = "debug")]
    Debug,
}

/// Unknown build type name.
#[derive(Debug, Display, Error)]
#[display(fmt = "unknown build type")]
pub(crate) struct UnknownBuildType;

impl FromStr for BuildType {
    type Err = UnknownBuildType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "production" => Ok(Self::Production),
            "debug" => Ok(Self::Debug),
            _ => Err(UnknownBuildType),
        }
    }
}

/// A single problem found during argument validation.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValidationIssue {
    /// Application name is absent or empty.
    #[display(fmt = "missing appName")]
    MissingAppName,

    /// Package name is absent or empty.
    #[display(fmt = "missing packageName")]
    MissingPackageName,

    /// Build type is neither `production` nor `debug`.
    #[display(fmt = "invalid buildType")]
    InvalidBuildType,

    /// Content directory path is absent or empty.
    #[display(fmt = "missing content path")]
    MissingContentPath,

    /// Artifact output path is absent or empty.
    #[display(fmt = "missing output path")]
    MissingOutputPath,

    /// Private key path is absent or empty.
    #[display(fmt = "missing privkey path")]
    MissingPrivkeyPath,

    /// Certificate path is absent or empty.
    #[display(fmt = "missing cert path")]
    MissingCertPath,
}

/// Arguments did not pass validation.
///
/// Contains every detected problem, not just the first one.
#[derive(Debug, Error)]
pub(crate) struct ValidationError {
    /// Detected problems, in validation order.
    #[error(not(source))]
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid arguments: {}", self.issues.iter().join(", "))
    }
}

/// Validated build submission request.
#[derive(Debug, Clone)]
pub(crate) struct BuildRequest {
    /// Application name.
    pub app_name: String,

    /// Application package name.
    pub package_name: String,

    /// Requested build flavor.
    pub build_type: BuildType,

    /// Directory packaged as the application archive.
    pub content_path: PathBuf,

    /// Optional model archive.
    pub model_path: Option<PathBuf>,

    /// Optional portal archive.
    pub portal_path: Option<PathBuf>,

    /// Signing certificate.
    pub cert_path: PathBuf,

    /// Signing private key.
    pub privkey_path: PathBuf,

    /// Where the built artifact is saved.
    pub output_path: PathBuf,
}

/// Treat empty values the same way as absent ones.
fn non_empty<T: AsRef<std::ffi::OsStr>>(value: Option<T>) -> Option<T> {
    value.filter(|value| !value.as_ref().is_empty())
}

impl BuildRequest {
    /// Validate raw arguments, applying defaults.
    ///
    /// No filesystem or network access happens here.
    pub(crate) fn resolve(args: BuildArgs) -> Result<Self, ValidationError> {
        let BuildArgs {
            app_name,
            package_name,
            build_type,
            model,
            portal,
            content,
            output,
            cert,
            privkey,
        } = args;

        let mut issues = Vec::new();

        let app_name = non_empty(app_name);
        if app_name.is_none() {
            issues.push(ValidationIssue::MissingAppName);
        }

        let package_name = non_empty(package_name);
        if package_name.is_none() {
            issues.push(ValidationIssue::MissingPackageName);
        }

        let build_type = match non_empty(build_type) {
            Some(value) => value.parse().ok(),
            None => Some(BuildType::default()),
        };
        if build_type.is_none() {
            issues.push(ValidationIssue::InvalidBuildType);
        }

        let content_path = non_empty(content);
        if content_path.is_none() {
            issues.push(ValidationIssue::MissingContentPath);
        }

        let output_path = non_empty(output);
        if output_path.is_none() {
            issues.push(ValidationIssue::MissingOutputPath);
        }

        let privkey_path = non_empty(privkey);
        if privkey_path.is_none() {
            issues.push(ValidationIssue::MissingPrivkeyPath);
        }

        let cert_path = non_empty(cert);
        if cert_path.is_none() {
            issues.push(ValidationIssue::MissingCertPath);
        }

        match (
            app_name,
            package_name,
            build_type,
            content_path,
            output_path,
            privkey_path,
            cert_path,
        ) {
            (
                Some(app_name),
                Some(package_name),
                Some(build_type),
                Some(content_path),
                Some(output_path),
                Some(privkey_path),
                Some(cert_path),
            ) => Ok(Self {
                app_name,
                package_name,
                build_type,
                content_path,
                model_path: non_empty(model),
                portal_path: non_empty(portal),
                cert_path,
                privkey_path,
                output_path,
            }),
            _ => Err(ValidationError { issues }),
        }
    }
}
