//! Local-filesystem provider: `file://` URIs and bare paths.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use super::{FileHandle, FileProvider, SchemeOptions};
use crate::error::Error;

/// Resolves bare paths (absolute or relative to the working directory) and
/// `file://` URIs. Scheme options do not apply to local access.
pub struct LocalProvider;

impl FileProvider for LocalProvider {
    fn resolve(
        &self,
        location: &str,
        _options: Option<&SchemeOptions>,
    ) -> Result<Arc<dyn FileHandle>, Error> {
        let path = location_to_path(location)
            .map_err(|e| Error::resolution(location, e))?;
        let handle = LocalFile::from_path(path).map_err(|e| Error::resolution(location, e))?;
        Ok(as_handle(handle))
    }
}

fn as_handle(file: Arc<LocalFile>) -> Arc<dyn FileHandle> {
    file
}

fn location_to_path(location: &str) -> io::Result<PathBuf> {
    if location
        .get(..7)
        .is_some_and(|head| head.eq_ignore_ascii_case("file://"))
    {
        let url = Url::parse(location)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        return url
            .to_file_path()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "not a local file URI"));
    }
    if location.contains("://") {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no provider registered for scheme",
        ));
    }
    Ok(PathBuf::from(location))
}

struct LocalFile {
    path: PathBuf,
    uri: String,
}

impl LocalFile {
    fn from_path(path: PathBuf) -> io::Result<Arc<Self>> {
        let path = std::path::absolute(&path)?;
        let uri = Url::from_file_path(&path)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path is not absolute"))?
            .to_string();
        Ok(Arc::new(Self { path, uri }))
    }
}

impl FileHandle for LocalFile {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    fn exists(&self) -> io::Result<bool> {
        Ok(self.path.exists())
    }

    fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn is_container(&self) -> io::Result<bool> {
        Ok(self.path.is_dir())
    }

    fn children(&self) -> io::Result<Vec<Arc<dyn FileHandle>>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        // Stable enumeration order regardless of the underlying filesystem.
        paths.sort();
        paths
            .into_iter()
            .map(|p| LocalFile::from_path(p).map(as_handle))
            .collect()
    }

    fn parent(&self) -> Option<Arc<dyn FileHandle>> {
        let parent: &Path = self.path.parent()?;
        LocalFile::from_path(parent.to_path_buf()).ok().map(as_handle)
    }

    fn create_container(&self) -> io::Result<()> {
        fs::create_dir_all(&self.path)
    }

    fn open_read_at(&self, offset: u64) -> io::Result<Box<dyn Read + Send>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(Box::new(file))
    }

    fn open_append(&self) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;
        Ok(Box::new(file))
    }
}
