use std::fs;
use std::path::Path;

/// Errors from fetching an include source.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read include source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// External fetch seam for include sources missing from the store.
///
/// One request is outstanding at a time; the include expander retries the
/// whole expansion once the body has been delivered and stored.
pub trait IncludeLoader {
    fn load(&mut self, url: &str) -> Result<String, LoadError>;
}

/// Conventional location of a named include below a shader repository.
pub fn include_url(repository: &str, name: &str) -> String {
    format!("{}/ShadersInclude/{}.fx", repository.trim_end_matches('/'), name)
}

/// Loads include sources from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileIncludeLoader;

impl FileIncludeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl IncludeLoader for FileIncludeLoader {
    fn load(&mut self, url: &str) -> Result<String, LoadError> {
        tracing::debug!(url, "reading include source");
        fs::read_to_string(Path::new(url)).map_err(|source| LoadError::Io {
            path: url.to_string(),
            source,
        })
    }
}
