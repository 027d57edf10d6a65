use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use http::Method;
use log::debug;
use std::path::{Path, PathBuf};
use tower::ServiceExt;
use tower_http::services::ServeDir;

const INDEX_FILE: &str = "index.html";

/// Serves the front-end build output ahead of routing
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a request path onto a file under the root, if one exists.
    ///
    /// Paths escaping the root and percent-encoded paths never resolve and
    /// fall through to routing.
    pub async fn resolve(&self, uri_path: &str) -> Option<PathBuf> {
        let relative = uri_path.trim_start_matches('/');
        if relative.contains('\\') || relative.contains('%') {
            return None;
        }
        if relative
            .split('/')
            .any(|segment| segment == ".." || segment == ".")
        {
            return None;
        }

        let candidate = self.root.join(relative);
        let metadata = tokio::fs::metadata(&candidate).await.ok()?;
        if metadata.is_file() {
            return Some(candidate);
        }
        if metadata.is_dir() {
            let index = candidate.join(INDEX_FILE);
            if tokio::fs::metadata(&index).await.ok()?.is_file() {
                return Some(index);
            }
        }
        None
    }

    /// Entries of the front-end bundle missing from the root
    pub fn verify_bundle(&self, vendor_scripts: &[String]) -> Vec<String> {
        if !self.root.is_dir() {
            return vec![self.root.display().to_string()];
        }
        std::iter::once(INDEX_FILE)
            .chain(vendor_scripts.iter().map(String::as_str))
            .filter(|entry| !self.root.join(entry).is_file())
            .map(str::to_string)
            .collect()
    }
}

/// Answer GET and HEAD requests for existing files; everything else goes on
/// to routing
pub(crate) async fn serve_static(
    State(files): State<StaticFiles>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return next.run(request).await;
    }
    let Some(path) = files.resolve(request.uri().path()).await else {
        return next.run(request).await;
    };

    debug!("Serving static file {}", path.display());
    match ServeDir::new(files.root())
        .append_index_html_on_directories(true)
        .oneshot(request)
        .await
    {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}
