//! Project pages and the static trees beside them

use std::io::ErrorKind;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::Uri,
    response::{Html, IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// A page rendered from a template file
pub struct ProjectPage {
    pub name: &'static str,
    pub template: &'static str,
    /// Served without the trailing slash too
    pub slash_optional: bool,
}

pub const PROJECT_PAGES: [ProjectPage; 9] = [
    ProjectPage { name: "schedulerjones", template: "schedulerjones.html", slash_optional: true },
    ProjectPage { name: "caselife", template: "caselife.html", slash_optional: true },
    ProjectPage { name: "sunraylab", template: "sunraylab.html", slash_optional: true },
    ProjectPage { name: "brainexplorer", template: "brainexplorer.html", slash_optional: true },
    ProjectPage { name: "donationparty", template: "donationparty.html", slash_optional: true },
    ProjectPage { name: "kickpoint", template: "kickpoint.html", slash_optional: true },
    ProjectPage { name: "podlife", template: "podlife.html", slash_optional: true },
    ProjectPage { name: "boston-bikes", template: "bikes.html", slash_optional: false },
    ProjectPage { name: "portfolio", template: "portfolio.html", slash_optional: false },
];

/// URL prefix to directory name, relative to the media root's parent
pub const STATIC_TREES: [(&str, &str); 8] = [
    ("raphael", "raphael"),
    ("schedulerjones", "schedulerjones"),
    ("caselife", "caselife"),
    ("sunraylab", "sunraylab"),
    ("boston-bikes", "bikes"),
    ("kickpoint", "kickpoint"),
    ("podlife", "podlife"),
    ("portfolio", "portfolio"),
];

impl AppState {
    /// Directory served under `/<section>/`, `/static/` only in debug
    pub fn static_root(&self, section: &str) -> Option<PathBuf> {
        if section == "static" {
            return self.debug.then(|| self.media_root.clone());
        }
        STATIC_TREES
            .iter()
            .find(|(prefix, _)| *prefix == section)
            .map(|(_, dir)| self.media_root.join("..").join(dir))
    }
}

/// GET /:section and /:section/
pub async fn project_page(
    State(state): State<AppState>,
    Path(section): Path<String>,
    uri: Uri,
) -> ApiResult<Html<String>> {
    let with_slash = uri.path().ends_with('/');
    let page = PROJECT_PAGES
        .iter()
        .find(|p| p.name == section && (p.slash_optional || with_slash))
        .ok_or_else(|| ApiError::NotFound(uri.path().to_string()))?;

    let path = state.templates_root.join(page.template);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(ApiError::NotFound(format!("template {}", page.template)))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /:section/*path
pub async fn static_file(
    State(state): State<AppState>,
    Path((section, _path)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let root = state
        .static_root(&section)
        .ok_or_else(|| ApiError::NotFound(request.uri().path().to_string()))?;

    // Strip "/<section>" so the tree sees paths relative to its root
    let (mut parts, body) = request.into_parts();
    let rest = parts
        .uri
        .path()
        .get(section.len() + 1..)
        .unwrap_or("/")
        .to_string();
    debug!(section = %section, path = %rest, "Static file");
    parts.uri = rest
        .parse()
        .map_err(|_| ApiError::NotFound(rest.clone()))?;

    let response = ServeDir::new(root)
        .oneshot(Request::from_parts(parts, body))
        .await
        .unwrap_or_else(|never| match never {});
    Ok(response.map(Body::new).into_response())
}
