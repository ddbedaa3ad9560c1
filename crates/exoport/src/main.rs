//! # Exoport
//!
//! Packages an application directory and submits it to a remote build service,
//! then downloads the resulting artifact.
//!
//! The whole flow is a strictly sequential pipeline:
//!
//! 1. command line arguments are validated into a [`BuildRequest`], reporting
//!    every problem at once before any other work starts;
//! 2. the content directory is packaged into an in-memory ZIP archive (see
//!    the [`archiver`] module);
//! 3. the archive, optional model and portal archives and the signing files
//!    are submitted as a multipart form (see [`process::submit`]);
//! 4. the artifact behind the returned download path is streamed onto the
//!    output path (see [`process::fetch`]).
//!
//! The first error aborts the remaining stages.
//!
//! [`BuildRequest`]: request::BuildRequest

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

use clap::Parser;
use cli::Cli;
use common::{config::Config, logging};
use indicatif::ProgressBar;
use request::BuildRequest;
use reqwest::Client;
use tracing::{debug, warn};

/// Application directory archiving utilities.
mod archiver;

/// CLI configuration.
mod cli;

/// Remote build process implementation.
mod process;

/// Build request validation.
mod request;

/// Mock build service used by tests.
#[cfg(test)]
mod testing;

/// CLI entrypoint.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let mut config = Config::new(cli.config_file)?;

    if let Some(server_path) = cli.server_path {
        config.server_path = server_path;
    }

    logging::init(&config);

    let request = match BuildRequest::resolve(cli.build) {
        Ok(request) => request,
        Err(error) => {
            for issue in &error.issues {
                warn!("{issue}");
            }

            return Err(error.into());
        }
    };

    debug!(?request, server_path = config.host(), "resolved build request");

    let progress = ProgressBar::new_spinner();

    let submission = process::remote_build(
        &Client::new(),
        config.host(),
        &request,
        &progress,
        cli.dump_archive.as_deref(),
    )
    .await;

    match submission {
        Ok(submission) => {
            progress.finish_with_message("Build finished.");
            println!("{}", submission.download_path);
            Ok(())
        }
        Err(error) => {
            progress.abandon_with_message("Build failed.");
            Err(error.into())
        }
    }
}
