use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::model::Result;

/// Client for the hand-off buffer that decouples staging from loading.
///
/// Objects live under `<root>/<container>/<name>`. The staged session
/// document is written here by the stage step and picked up by the load
/// step, mirroring the deployed topology where the buffer write triggers
/// the loader.
#[derive(Debug)]
pub struct Buffer {
    container_dir: PathBuf,
}

impl Buffer {
    pub fn new(config: &Config) -> Buffer {
        Buffer {
            container_dir: config.buffer_root.join(&config.buffer_container),
        }
    }

    /// Stores a local file under the given object name, creating the
    /// container if it does not exist yet. Overwrites any previous object.
    pub fn put_file(&self, name: &str, local_path: &Path) -> Result<()> {
        fs::create_dir_all(&self.container_dir)?;
        let target = self.container_dir.join(name);
        fs::copy(local_path, &target)?;
        log::info!("stored {} in {}", name, self.container_dir.display());
        Ok(())
    }

    /// Returns an object's bytes, or `None` if no such object exists.
    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.container_dir.join(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &Path) -> Config {
        Config {
            sqlite_file: ":memory:".to_string(),
            buffer_root: root.to_path_buf(),
            buffer_container: "pregao-xml".to_string(),
        }
    }

    #[test]
    fn put_then_get_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let buffer = Buffer::new(&test_config(root.path()));

        let source = root.path().join("doc.xml");
        fs::write(&source, b"<doc/>").unwrap();

        buffer.put_file("BVBG186_240101.xml", &source).unwrap();
        let bytes = buffer.get("BVBG186_240101.xml").unwrap();
        assert_eq!(bytes.as_deref(), Some(b"<doc/>".as_slice()));
    }

    #[test]
    fn get_of_missing_object_is_none() {
        let root = tempfile::tempdir().unwrap();
        let buffer = Buffer::new(&test_config(root.path()));
        assert!(buffer.get("absent.xml").unwrap().is_none());
    }

    #[test]
    fn put_overwrites_existing_object() {
        let root = tempfile::tempdir().unwrap();
        let buffer = Buffer::new(&test_config(root.path()));

        let source = root.path().join("doc.xml");
        fs::write(&source, b"first").unwrap();
        buffer.put_file("doc.xml", &source).unwrap();
        fs::write(&source, b"second").unwrap();
        buffer.put_file("doc.xml", &source).unwrap();

        assert_eq!(buffer.get("doc.xml").unwrap().as_deref(), Some(b"second".as_slice()));
    }
}
