//! Resolution of URIs to bytes

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::rc::Rc;

use base64::Engine as _;
use tokio::io::AsyncReadExt;

/// Future returned by resolvers; `None` when the resource does not exist
pub type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Option<Vec<u8>>> + 'a>>;

/// Resolves relative URIs against a base location.
///
/// Data URIs decode in-process. Absolute URIs (`scheme://...`) are never
/// fetched and resolve to `None`.
pub trait ResourceResolver: fmt::Debug {
    /// The full location `uri` refers to, for messages
    fn resolve_uri(&self, uri: &str) -> String;

    fn resolve_data<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a>;

    /// At most `max_bytes` from the start of the resource, for type sniffing
    fn resolve_data_partial<'a>(&'a self, uri: &'a str, max_bytes: usize) -> ResolveFuture<'a>;

    /// A resolver for URIs relative to `base_path`, itself relative to this resolver
    fn derive(&self, base_path: &str) -> Rc<dyn ResourceResolver>;
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Whether `uri` carries a scheme followed by `//` (`https://`, `file://`, ...)
pub fn is_absolute_uri(uri: &str) -> bool {
    match uri.find("://") {
        Some(end) if end > 0 => {
            let scheme = &uri[..end];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Decode the payload of a `data:` URI. Base64 payloads are decoded,
/// anything else is returned as raw bytes.
pub fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if header.ends_with(";base64") {
        match base64::engine::general_purpose::STANDARD.decode(payload.trim()) {
            Ok(data) => Some(data),
            Err(e) => {
                log::debug!("Invalid base64 in data URI: {e}");
                None
            }
        }
    } else {
        Some(payload.as_bytes().to_vec())
    }
}

/// Join a relative URI to a base directory, normalizing `.` and `..`.
///
/// Data URIs and absolute URIs are returned unchanged.
pub fn join_uri(base_directory: &str, relative: &str) -> String {
    if is_data_uri(relative) || is_absolute_uri(relative) {
        return relative.to_string();
    }
    // A rooted relative path replaces the base
    let base = if relative.starts_with('/') { "" } else { base_directory };
    let absolute = relative.starts_with('/') || base.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    let mut leading_parents = 0usize;
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() && !absolute {
                    leading_parents += 1;
                }
            }
            other => segments.push(other),
        }
    }
    let mut joined = String::new();
    if absolute {
        joined.push('/');
    }
    for _ in 0..leading_parents {
        joined.push_str("../");
    }
    joined.push_str(&segments.join("/"));
    joined
}

/// Directory part of a URI: everything before the last `/`, or `""`
pub fn uri_directory(uri: &str) -> &str {
    match uri.rfind('/') {
        Some(index) => &uri[..index],
        None => "",
    }
}

/// Resolves data URIs, or returns `None` for absolute URIs that are never fetched
fn resolve_special(uri: &str) -> Option<Option<Vec<u8>>> {
    if is_data_uri(uri) {
        return Some(decode_data_uri(uri));
    }
    if is_absolute_uri(uri) {
        log::debug!("Not resolving absolute URI {uri}");
        return Some(None);
    }
    None
}

/// In-memory resources, keyed by normalized path
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceResolver {
    base_path: String,
    entries: Rc<HashMap<String, Rc<[u8]>>>,
}

impl MemoryResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource at `path`, relative to the root of the store
    pub fn with_entry(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        let key = join_uri("", path);
        Rc::make_mut(&mut self.entries).insert(key, Rc::from(data.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn lookup(&self, uri: &str) -> Option<Rc<[u8]>> {
        let key = join_uri(&self.base_path, uri);
        let entry = self.entries.get(&key).cloned();
        if entry.is_none() {
            log::debug!("No in-memory resource at {key}");
        }
        entry
    }
}

impl ResourceResolver for MemoryResourceResolver {
    fn resolve_uri(&self, uri: &str) -> String {
        join_uri(&self.base_path, uri)
    }

    fn resolve_data<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a> {
        let result = match resolve_special(uri) {
            Some(result) => result,
            None => self.lookup(uri).map(|data| data.to_vec()),
        };
        Box::pin(std::future::ready(result))
    }

    fn resolve_data_partial<'a>(&'a self, uri: &'a str, max_bytes: usize) -> ResolveFuture<'a> {
        let result = match resolve_special(uri) {
            Some(result) => result.map(|mut data| {
                data.truncate(max_bytes);
                data
            }),
            None => self
                .lookup(uri)
                .map(|data| data[..data.len().min(max_bytes)].to_vec()),
        };
        Box::pin(std::future::ready(result))
    }

    fn derive(&self, base_path: &str) -> Rc<dyn ResourceResolver> {
        Rc::new(Self {
            base_path: join_uri(&self.base_path, base_path),
            entries: Rc::clone(&self.entries),
        })
    }
}

/// Resources in a local directory, read with `tokio::fs`
#[derive(Debug, Clone)]
pub struct FileResourceResolver {
    base_directory: PathBuf,
}

impl FileResourceResolver {
    pub fn new(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    fn path(&self, uri: &str) -> PathBuf {
        self.base_directory.join(uri)
    }
}

impl ResourceResolver for FileResourceResolver {
    fn resolve_uri(&self, uri: &str) -> String {
        if is_data_uri(uri) || is_absolute_uri(uri) {
            return uri.to_string();
        }
        self.path(uri).display().to_string()
    }

    fn resolve_data<'a>(&'a self, uri: &'a str) -> ResolveFuture<'a> {
        Box::pin(async move {
            if let Some(result) = resolve_special(uri) {
                return result;
            }
            let path = self.path(uri);
            match tokio::fs::read(&path).await {
                Ok(data) => Some(data),
                Err(e) => {
                    log::debug!("Could not read {}: {e}", path.display());
                    None
                }
            }
        })
    }

    fn resolve_data_partial<'a>(&'a self, uri: &'a str, max_bytes: usize) -> ResolveFuture<'a> {
        Box::pin(async move {
            if let Some(result) = resolve_special(uri) {
                return result.map(|mut data| {
                    data.truncate(max_bytes);
                    data
                });
            }
            let path = self.path(uri);
            let file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    log::debug!("Could not open {}: {e}", path.display());
                    return None;
                }
            };
            let mut data = Vec::with_capacity(max_bytes.min(64 * 1024));
            match file.take(max_bytes as u64).read_to_end(&mut data).await {
                Ok(_) => Some(data),
                Err(e) => {
                    log::debug!("Could not read {}: {e}", path.display());
                    None
                }
            }
        })
    }

    fn derive(&self, base_path: &str) -> Rc<dyn ResourceResolver> {
        Rc::new(Self::new(self.path(base_path)))
    }
}
