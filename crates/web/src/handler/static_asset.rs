//! Serves assets from an [`AssetSource`].
//!
//! A handler works in one of two modes, fixed when it is built:
//!
//! - pinned: every request gets the same asset, e.g. `index.html` for both
//!   `/` and `/index.html`
//! - prefixed: the asset path is what is left of the request path once the
//!   route's leading part is removed, e.g. `/assets/css/site.css` under
//!   `/assets/*` serves `css/site.css`
//!
//! Assets are streamed with chunked transfer encoding. When a prefixed asset
//! is missing the handler can answer with a listing of the directory of the
//! same name instead of a bare `404`.

use std::borrow::Cow;
use std::sync::Arc;

use http::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::asset::{AssetError, AssetReader, AssetSource};
use crate::body::{ASSET_CHUNK_SIZE, ResponseBody};
use crate::error::HandlerError;
use crate::router::split_path;
use crate::{RequestContext, debug as debug_flag, response};

/// How a prefixed handler turns the request path into an asset path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixStrip {
    /// Drop the route pattern's leading literal segments and keep the rest.
    #[default]
    Segments,
    /// Drop a leading `/` from both the request path and the route base
    /// (`/assets/` for `/assets/*`), then drop their longest common leading
    /// characters. Not segment aware: `/assetsfoo` under `/assets/*` gives
    /// `foo`. A path that is itself a prefix of the base, such as `/assets`,
    /// is kept whole.
    CharacterPrefix,
}

#[derive(Debug, Clone)]
enum Mode {
    Pinned(String),
    Prefixed(PrefixStrip),
}

pub struct StaticAssetHandler {
    source: Arc<dyn AssetSource>,
    mode: Mode,
    directory_listing: bool,
    escape_listing: bool,
    chunk_size: usize,
}

impl StaticAssetHandler {
    /// A handler that always serves `path`.
    pub fn pinned(source: Arc<dyn AssetSource>, path: impl Into<String>) -> StaticAssetHandlerBuilder {
        StaticAssetHandlerBuilder::new(source, Mode::Pinned(path.into()))
    }

    /// A handler that derives the asset path from the request path.
    pub fn prefixed(source: Arc<dyn AssetSource>) -> StaticAssetHandlerBuilder {
        StaticAssetHandlerBuilder::new(source, Mode::Prefixed(PrefixStrip::default()))
    }

    pub fn pinned_path(&self) -> Option<&str> {
        match &self.mode {
            Mode::Pinned(path) => Some(path),
            Mode::Prefixed(_) => None,
        }
    }

    /// Checks that a pinned asset can be opened. Prefixed handlers always pass.
    ///
    /// # Errors
    ///
    /// [`HandlerError::Configuration`] when the pinned asset can't be opened.
    pub async fn verify(&self) -> Result<(), HandlerError> {
        match self.pinned_path() {
            Some(path) => self.source.open(path).await.map(drop).map_err(|e| pinned_error(path, &e)),
            None => Ok(()),
        }
    }

    /// The asset path a request resolves to.
    pub fn asset_path(&self, req: &RequestContext) -> String {
        match &self.mode {
            Mode::Pinned(path) => path.clone(),
            Mode::Prefixed(PrefixStrip::Segments) => {
                let leading = req.matched_pattern().map_or(0, |pattern| pattern.leading_literals());
                split_path(req.path()).get(leading..).map(|rest| rest.join("/")).unwrap_or_default()
            }
            Mode::Prefixed(PrefixStrip::CharacterPrefix) => {
                let base = req.matched_pattern().map_or_else(|| "/".to_owned(), |pattern| pattern.base());
                strip_common_prefix(strip_slash(req.path()), strip_slash(&base)).to_owned()
            }
        }
    }

    pub async fn get(&self, req: &RequestContext) -> Result<Response<ResponseBody>, HandlerError> {
        let asset_path = self.asset_path(req);
        if debug_flag::enabled() {
            debug!(path = req.path(), asset_path, "trying to open asset");
        }

        match self.source.open(&asset_path).await {
            Ok(reader) => Ok(self.stream(reader, &asset_path)),
            Err(e) if self.pinned_path().is_some() => Err(pinned_error(&asset_path, &e)),
            Err(AssetError::NotFound { .. }) => self.missing(req, &asset_path).await,
            Err(e) => Err(e.into()),
        }
    }

    fn stream(&self, reader: AssetReader, asset_path: &str) -> Response<ResponseBody> {
        let content_type = mime_guess::from_path(asset_path).first_or_octet_stream();
        if debug_flag::enabled() {
            debug!(asset_path, content_type = %content_type, "serving asset");
        }
        response::chunked(StatusCode::OK, &content_type, ResponseBody::asset(reader, self.chunk_size))
    }

    async fn missing(&self, req: &RequestContext, asset_path: &str) -> Result<Response<ResponseBody>, HandlerError> {
        if !self.directory_listing {
            return Ok(response::empty(StatusCode::NOT_FOUND));
        }

        match self.source.list(asset_path).await {
            Ok(entries) if !entries.is_empty() => {
                let html = listing_html(req.path(), &entries, self.escape_listing);
                Ok(response::fixed_length(StatusCode::OK, &mime::TEXT_HTML, html))
            }
            Ok(_) => Ok(response::empty(StatusCode::NOT_FOUND)),
            Err(e) => {
                if debug_flag::enabled() {
                    debug!(cause = %e, asset_path, "can't list asset directory");
                }
                Ok(response::empty(StatusCode::NOT_FOUND))
            }
        }
    }
}

impl std::fmt::Debug for StaticAssetHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAssetHandler")
            .field("mode", &self.mode)
            .field("directory_listing", &self.directory_listing)
            .field("escape_listing", &self.escape_listing)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

pub struct StaticAssetHandlerBuilder {
    source: Arc<dyn AssetSource>,
    mode: Mode,
    directory_listing: bool,
    escape_listing: bool,
    chunk_size: usize,
}

impl std::fmt::Debug for StaticAssetHandlerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticAssetHandlerBuilder").field("mode", &self.mode).finish_non_exhaustive()
    }
}

impl StaticAssetHandlerBuilder {
    fn new(source: Arc<dyn AssetSource>, mode: Mode) -> Self {
        Self { source, mode, directory_listing: false, escape_listing: false, chunk_size: ASSET_CHUNK_SIZE }
    }

    /// List the directory when a prefixed asset is missing.
    pub fn directory_listing(mut self, enabled: bool) -> Self {
        self.directory_listing = enabled;
        self
    }

    /// HTML-escape paths and entry names in directory listings.
    pub fn escape_listing(mut self, enabled: bool) -> Self {
        self.escape_listing = enabled;
        self
    }

    /// Has no effect on a pinned handler.
    pub fn strip(mut self, strip: PrefixStrip) -> Self {
        if let Mode::Prefixed(current) = &mut self.mode {
            *current = strip;
        }
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn build(self) -> StaticAssetHandler {
        StaticAssetHandler {
            source: self.source,
            mode: self.mode,
            directory_listing: self.directory_listing,
            escape_listing: self.escape_listing,
            chunk_size: self.chunk_size,
        }
    }
}

fn pinned_error(path: &str, e: &AssetError) -> HandlerError {
    warn!(cause = %e, path, "pinned asset can't be opened");
    HandlerError::configuration(format!("pinned asset '{path}' can't be opened: {e}"))
}

fn strip_slash(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Drops from `path` the longest leading run of characters it shares with `base`.
///
/// A path that ends before `base` does, without differing from it, is
/// returned unchanged.
fn strip_common_prefix<'a>(path: &'a str, base: &str) -> &'a str {
    let mismatch = path.char_indices().zip(base.chars()).find(|((_, path_char), base_char)| path_char != base_char);

    match mismatch {
        Some(((index, _), _)) => &path[index..],
        None if path.len() > base.len() => &path[base.len()..],
        None => path,
    }
}

fn listing_html(path: &str, entries: &[String], escape: bool) -> String {
    let text = |s: &'_ str| -> String {
        if escape { escape_html(s).into_owned() } else { s.to_owned() }
    };
    let path = text(path);

    let mut html = String::with_capacity(128 + entries.len() * (path.len() + 32));
    html.push_str("<html><head><title>Index of ");
    html.push_str(&path);
    html.push_str("</title></head><body><h1>Index of ");
    html.push_str(&path);
    html.push_str("</h1><hr>");
    for entry in entries {
        let entry = text(entry);
        html.push_str("<a href=\"");
        html.push_str(&path);
        html.push('/');
        html.push_str(&entry);
        html.push_str("\">");
        html.push_str(&entry);
        html.push_str("</a><br/>");
    }
    html.push_str("<hr></body></html>");
    html
}

fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    let mut escaped = String::with_capacity(s.len() + 16);
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}
