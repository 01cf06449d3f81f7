//! Mapping request paths onto files under the document root, and caching
//! their contents.

use std::io;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use log::debug;
use lru::LruCache;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;

use crate::parser::HttpRequest;
use crate::server::config::ServerConfig;
use crate::server::error::{Error, HttpError};
use crate::server::response::StatusCode;

/// Files larger than this are streamed from disk on every request.
pub const CACHE_LIMIT: u64 = 1024 * 1024;

/// Chunk size used when streaming an uncacheable file.
pub const SEGMENT_SIZE: usize = 4096;

/// A file under the document root, possibly with its contents cached.
///
/// Contents are read into memory at most once per successful read; a failed
/// read leaves the entry unpopulated so a later request tries again.
#[derive(Debug)]
pub struct Resource {
    path: PathBuf,
    size: u64,
    too_large: bool,
    cached: OnceCell<Bytes>,
    disk_reads: AtomicUsize,
}

impl Resource {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            too_large: size > CACHE_LIMIT,
            cached: OnceCell::new(),
            disk_reads: AtomicUsize::new(0),
        }
    }

    /// The canonical path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The size of the file when it was first resolved.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_cacheable(&self) -> bool {
        !self.too_large
    }

    pub fn is_cached(&self) -> bool {
        self.cached.initialized()
    }

    /// How many times the file has been opened for reading its contents.
    pub fn disk_reads(&self) -> usize {
        self.disk_reads.load(Ordering::SeqCst)
    }

    /// The contents of the file as a sequence of chunks.
    ///
    /// Cacheable files come out as one chunk, read from disk only if the cache
    /// is not yet populated. Concurrent callers wait for a single populate.
    /// Files over [`CACHE_LIMIT`] are reopened and streamed in
    /// [`SEGMENT_SIZE`] chunks on every call.
    pub async fn segments(&self) -> io::Result<Segments> {
        if self.too_large {
            self.disk_reads.fetch_add(1, Ordering::SeqCst);
            let file = File::open(&self.path).await?;
            return Ok(Segments::streamed(file));
        }

        if let Some(data) = self.cached.get() {
            debug!("File {} yielded from cache.", self.path.display());
            return Ok(Segments::cached(data.clone()));
        }

        let data = self.cached.get_or_try_init(|| self.populate()).await?;
        Ok(Segments::cached(data.clone()))
    }

    async fn populate(&self) -> io::Result<Bytes> {
        self.disk_reads.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(&self.path).await?;
        debug!("Cached {} ({} bytes).", self.path.display(), data.len());
        Ok(Bytes::from(data))
    }
}

/// A finite sequence of content chunks produced by [`Resource::segments`].
#[derive(Debug)]
pub struct Segments {
    state: SegmentState,
}

#[derive(Debug)]
enum SegmentState {
    Cached(Bytes),
    Streamed(File),
    Done,
}

impl Segments {
    fn cached(data: Bytes) -> Self {
        Self {
            state: SegmentState::Cached(data),
        }
    }

    fn streamed(file: File) -> Self {
        Self {
            state: SegmentState::Streamed(file),
        }
    }

    /// The next chunk, or `None` once the content is exhausted.
    pub async fn next(&mut self) -> io::Result<Option<Bytes>> {
        match std::mem::replace(&mut self.state, SegmentState::Done) {
            SegmentState::Cached(data) => Ok(Some(data)),
            SegmentState::Streamed(mut file) => {
                let mut buf = vec![0u8; SEGMENT_SIZE];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    // Dropping the handle closes the file.
                    return Ok(None);
                }
                buf.truncate(n);
                self.state = SegmentState::Streamed(file);
                Ok(Some(Bytes::from(buf)))
            }
            SegmentState::Done => Ok(None),
        }
    }
}

/// Resolved resources keyed by canonical path.
///
/// Bounded by entry count with least-recently-used eviction. Entries are never
/// invalidated when the file changes; an evicted entry is simply rebuilt on
/// its next lookup.
pub struct ResourceCache {
    entries: Mutex<LruCache<PathBuf, Arc<Resource>>>,
}

impl ResourceCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The entry for `path`, created from `size` if there is none.
    ///
    /// Lookup and insertion happen under one lock, so concurrent resolutions
    /// of the same path always share a single entry.
    pub fn get_or_insert(&self, path: PathBuf, size: u64) -> Arc<Resource> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.get_or_insert(path.clone(), || Arc::new(Resource::new(path, size))))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Why a lookup under the document root failed.
enum Lookup {
    Forbidden,
    NotFound,
}

/// Maps requests onto files inside the document root.
pub struct ResourceResolver {
    root: PathBuf,
    default_document: String,
    directory_default: Option<String>,
    cache: ResourceCache,
}

impl ResourceResolver {
    /// Build a resolver from the configuration.
    ///
    /// The document root is canonicalized here, once; a root that does not
    /// exist is a configuration error.
    pub fn new(config: &ServerConfig) -> Result<Self, Error> {
        let root = std::fs::canonicalize(&config.document_root).map_err(|e| Error::Config {
            path: config.document_root.clone(),
            reason: format!("document root is not accessible: {e}"),
        })?;

        Ok(Self {
            root,
            default_document: config.default_document.clone(),
            directory_default: config.directory_default_document.clone(),
            cache: ResourceCache::new(config.cache_capacity),
        })
    }

    /// The canonical document root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Resolve `request` to a cached or freshly created [`Resource`].
    ///
    /// # Errors
    ///
    /// * 400 if the path does not percent-decode to UTF-8
    /// * 403 if the path leaves the document root, before or after symlinks
    ///   are resolved
    /// * 404 if no readable file is found, also after trying the directory
    ///   default document
    pub async fn resolve(&self, request: &HttpRequest) -> Result<Arc<Resource>, HttpError> {
        let decoded = request
            .path()
            .map_err(|_| HttpError::for_request(StatusCode::BAD_REQUEST, request))?;
        let stripped = decoded.strip_prefix('/').unwrap_or(&decoded);

        let relative = if decoded == "/" {
            PathBuf::from(&self.default_document)
        } else {
            PathBuf::from(stripped)
        };

        let located = match self.locate(&relative).await {
            Err(Lookup::NotFound) => match &self.directory_default {
                Some(directory_default) => {
                    let fallback = Path::new(stripped).join(directory_default);
                    debug!("Trying directory default {} for {}", fallback.display(), request.resource);
                    self.locate(&fallback).await
                }
                None => Err(Lookup::NotFound),
            },
            other => other,
        };

        let (path, size) = located.map_err(|lookup| {
            let status = match lookup {
                Lookup::Forbidden => StatusCode::FORBIDDEN,
                Lookup::NotFound => StatusCode::NOT_FOUND,
            };
            HttpError::for_request(status, request)
        })?;

        Ok(self.cache.get_or_insert(path, size))
    }

    /// Find a readable regular file at `relative` under the root.
    ///
    /// Returns its canonical path and size.
    async fn locate(&self, relative: &Path) -> Result<(PathBuf, u64), Lookup> {
        let candidate = self.root.join(relative);
        if !is_within(&self.root, &candidate) {
            return Err(Lookup::Forbidden);
        }

        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| Lookup::NotFound)?;
        if !is_within(&self.root, &canonical) {
            return Err(Lookup::Forbidden);
        }

        let file = File::open(&canonical).await.map_err(|_| Lookup::NotFound)?;
        let metadata = file.metadata().await.map_err(|_| Lookup::NotFound)?;
        if !metadata.is_file() {
            return Err(Lookup::NotFound);
        }

        Ok((canonical, metadata.len()))
    }
}

/// Whether `path`, once `.` and `..` are folded away, is `root` or lies below it.
///
/// Compares whole path components along the ancestor chain, so `/a/bc` is not
/// inside `/a/b`.
pub fn is_within(root: &Path, path: &Path) -> bool {
    let cleaned = lexically_normalize(path);
    cleaned.ancestors().any(|ancestor| ancestor == root)
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                cleaned.pop();
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}
