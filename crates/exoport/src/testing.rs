use std::{
    net::TcpListener,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Multipart, Path},
    http::StatusCode,
    routing::{get, post},
    Router, Server,
};

/// Single multipart form field received by [`MockBuildService`].
#[derive(Debug, Clone)]
pub(crate) struct ReceivedPart {
    /// Form field name.
    pub name: String,

    /// File name from the part's `Content-Disposition`, if any.
    pub file_name: Option<String>,

    /// Part `Content-Type`, if any.
    pub content_type: Option<String>,

    /// Raw part body.
    pub data: Vec<u8>,
}

/// In-process build service bound to an ephemeral local port.
///
/// `POST /mpk` records the submitted form and replies with the configured
/// status and body. `GET /dl/abc123` serves the configured artifact, any
/// other download path returns `404 Not Found`.
pub(crate) struct MockBuildService {
    /// Base URL of the running service.
    pub server_path: String,

    /// Form fields received so far.
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
}

impl MockBuildService {
    /// Start the service on the current tokio runtime.
    ///
    /// Build submissions are answered with `submit_status` and `submit_body`,
    /// and `artifact` is served from `/dl/abc123`.
    pub(crate) fn spawn(
        submit_status: StatusCode,
        submit_body: &'static str,
        artifact: &'static [u8],
    ) -> Self {
        let parts = Arc::new(Mutex::new(Vec::new()));
        let recorded = parts.clone();

        let router = Router::new()
            .route(
                "/mpk",
                post(move |mut form: Multipart| {
                    let recorded = recorded.clone();

                    async move {
                        while let Some(field) = form.next_field().await.expect("invalid form") {
                            let name = field.name().unwrap_or_default().to_string();
                            let file_name = field.file_name().map(str::to_string);
                            let content_type = field.content_type().map(str::to_string);
                            let data = field.bytes().await.expect("unable to read field").to_vec();

                            recorded.lock().unwrap().push(ReceivedPart {
                                name,
                                file_name,
                                content_type,
                                data,
                            });
                        }

                        (submit_status, submit_body)
                    }
                }),
            )
            .route(
                "/dl/:id",
                get(move |Path(id): Path<String>| async move {
                    if id == "abc123" {
                        (StatusCode::OK, artifact.to_vec())
                    } else {
                        (StatusCode::NOT_FOUND, Vec::new())
                    }
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").expect("unable to bind mock server");
        let address = listener.local_addr().expect("unable to get local address");

        let server = Server::from_tcp(listener)
            .expect("unable to create mock server")
            .serve(router.into_make_service());

        tokio::spawn(server);

        Self {
            server_path: format!("http://{address}"),
            parts,
        }
    }

    /// Form fields received so far, in order of arrival.
    pub(crate) fn received_parts(&self) -> Vec<ReceivedPart> {
        self.parts.lock().unwrap().clone()
    }

    /// Names of the received form fields.
    pub(crate) fn received_names(&self) -> Vec<String> {
        self.received_parts()
            .into_iter()
            .map(|part| part.name)
            .collect()
    }
}
