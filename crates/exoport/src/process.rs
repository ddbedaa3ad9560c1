use std::{
    fmt, io,
    path::{Path, PathBuf},
    time::Duration,
};

use derive_more::{Display, Error, From};
use futures_util::StreamExt;
use indicatif::ProgressBar;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tempfile::PersistError;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{
    archiver::{package_directory, ArchiverError},
    request::BuildRequest,
};

/// Build submission route, relative to the build service host.
const SUBMIT_ROUTE: &str = "/mpk";

/// Content type of the archive form parts.
const ZIP_MIME: &str = "application/zip";

/// Content type of the signing file form parts.
const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// JSON response body returned by a build submission request.
#[derive(Deserialize)]
struct SubmitResponse {
    /// Server-relative artifact download path.
    url: String,
}

/// Accepted build submission.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SubmissionResult {
    /// Server-relative path of the built artifact.
    pub download_path: String,
}

/// Unable to read an auxiliary file attached to the build submission.
#[derive(Debug, Error)]
pub(crate) struct FileReadError {
    /// Path of the unreadable file.
    path: PathBuf,

    /// Underlying IO error.
    source: io::Error,
}

impl fmt::Display for FileReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to read {}: {}", self.path.display(), self.source)
    }
}

/// Artifact download errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum FetchError {
    /// HTTP client error.
    Http(reqwest::Error),

    /// IO-related error.
    Io(io::Error),

    /// Unable to move the downloaded artifact onto the output path.
    Persist(PersistError),
}

/// Remote build process errors.
#[derive(Debug, Display, From, Error)]
pub(crate) enum RemoteBuildError {
    /// Zip archiver error.
    #[display(fmt = "unable to create zip archive: {}", _0)]
    Archive(ArchiverError),

    /// Auxiliary file read error.
    FileRead(FileReadError),

    /// Build submission transport or status error.
    #[display(fmt = "unable to submit build: {}", _0)]
    Submission(reqwest::Error),

    /// Build service returned an unexpected response body.
    #[display(fmt = "unexpected build service response: {}", _0)]
    ResponseFormat(serde_json::Error),

    /// Artifact download error.
    #[display(fmt = "unable to download artifact: {}", _0)]
    Fetch(FetchError),
}

/// Start the remote build process.
///
/// Packages the content directory, submits it alongside the auxiliary files
/// to the build service at `host` and downloads the resulting artifact onto
/// the request's output path. Every stage starts only after the previous one
/// has finished, and the first error aborts the rest.
pub(crate) async fn remote_build(
    client: &Client,
    host: &str,
    request: &BuildRequest,
    progress: &ProgressBar,
    dump_archive: Option<&Path>,
) -> Result<SubmissionResult, RemoteBuildError> {
    progress.enable_steady_tick(Duration::from_millis(150));
    progress.set_message("Archiving...");

    let archive = package_directory(&request.content_path).await?;
    info!(size = archive.len(), "application archive created");

    if let Some(path) = dump_archive {
        match tokio::fs::write(path, &archive).await {
            Ok(()) => debug!(path = %path.display(), "archive dump written"),
            Err(error) => warn!(%error, path = %path.display(), "unable to write archive dump"),
        }
    }

    let form = build_form(request, archive).await?;

    progress.set_message("Uploading...");

    let submission = submit(client, host, form).await?;
    info!(download_path = %submission.download_path, "build submitted");

    progress.set_message("Downloading...");

    fetch(client, host, &submission.download_path, &request.output_path).await?;
    info!(output = %request.output_path.display(), "artifact downloaded");

    Ok(submission)
}

/// Read an auxiliary file into memory.
async fn read_file(path: &Path) -> Result<Vec<u8>, FileReadError> {
    tokio::fs::read(path).await.map_err(|source| FileReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Assemble the build submission form.
///
/// All auxiliary files are read before returning, so that an unreadable
/// file aborts the process before any network activity.
async fn build_form(request: &BuildRequest, archive: Vec<u8>) -> Result<Form, RemoteBuildError> {
    let mut form = Form::new()
        .text("appname", request.app_name.clone())
        .text("packagename", request.package_name.clone())
        .text("buildtype", request.build_type.to_string())
        .part("app.zip", zip_part(archive, "app.zip")?);

    if let Some(model_path) = &request.model_path {
        let model = read_file(model_path).await?;
        form = form.part("model.zip", zip_part(model, "model.zip")?);
    }

    if let Some(portal_path) = &request.portal_path {
        let portal = read_file(portal_path).await?;
        form = form.part("portal.zip", zip_part(portal, "portal.zip")?);
    }

    let cert = read_file(&request.cert_path).await?;
    let privkey = read_file(&request.privkey_path).await?;

    Ok(form
        .part("app.cert", Part::bytes(cert).mime_str(OCTET_STREAM_MIME)?)
        .part("app.privkey", Part::bytes(privkey).mime_str(OCTET_STREAM_MIME)?))
}

/// Binary ZIP form part with the provided file name.
fn zip_part(data: Vec<u8>, file_name: &'static str) -> Result<Part, reqwest::Error> {
    Part::bytes(data).file_name(file_name).mime_str(ZIP_MIME)
}

/// Submit the build form and return the artifact download path.
pub(crate) async fn submit(
    client: &Client,
    host: &str,
    form: Form,
) -> Result<SubmissionResult, RemoteBuildError> {
    let response = client
        .post(format!("{host}{SUBMIT_ROUTE}"))
        .multipart(form)
        .send()
        .await?
        .error_for_status()?;

    debug!(headers = ?response.headers(), "build service responded");

    let body = response.bytes().await?;

    Ok(parse_submit_response(&body)?)
}

/// Decode the build submission response body.
///
/// Only JSON objects are accepted, a sequence holding the same values is not.
fn parse_submit_response(body: &[u8]) -> Result<SubmissionResult, serde_json::Error> {
    let object: Map<String, Value> = serde_json::from_slice(body)?;
    let SubmitResponse { url } = serde_json::from_value(Value::Object(object))?;

    Ok(SubmissionResult { download_path: url })
}

/// Download the artifact at `download_path` into `output_path`.
///
/// The response body is streamed into a temporary file next to the output
/// path, which replaces the output path only once the download is complete.
pub(crate) async fn fetch(
    client: &Client,
    host: &str,
    download_path: &str,
    output_path: &Path,
) -> Result<(), FetchError> {
    let response = client
        .get(format!("{host}{download_path}"))
        .send()
        .await?
        .error_for_status()?;

    let output_dir = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let temp_file = tempfile::Builder::new()
        .prefix(".exoport-")
        .tempfile_in(output_dir)?;

    let mut file = tokio::fs::File::from_std(temp_file.reopen()?);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    temp_file.persist(output_path)?;

    Ok(())
}
