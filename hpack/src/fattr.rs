//! Out of band key/value attributes attached to finished files.
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::HtpackError;

pub const DEFAULT_NAMESPACE: &str = "feep";

/// Name of the attribute holding the content digest of a file.
pub fn digest_name(namespace: &str) -> String {
    format!("user.{}.sha512", namespace)
}

pub trait AttrStore {
    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), HtpackError>;
    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, HtpackError>;
}

/// Filesystem extended attributes.
pub struct Xattr;

impl AttrStore for Xattr {
    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), HtpackError> {
        xattr::set(path, name, value).map_err(|source| HtpackError::AttrError {
            name: name.to_string(),
            source,
        })
    }

    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, HtpackError> {
        xattr::get(path, name).map_err(|source| HtpackError::AttrError {
            name: name.to_string(),
            source,
        })
    }
}

/// In memory attributes, for tests and filesystems without xattr support.
#[derive(Default)]
pub struct MemAttrs {
    attrs: RefCell<HashMap<(PathBuf, String), Vec<u8>>>,
}

impl MemAttrs {
    pub fn new() -> Self {
        MemAttrs::default()
    }
}

impl AttrStore for MemAttrs {
    fn set(&self, path: &Path, name: &str, value: &[u8]) -> Result<(), HtpackError> {
        self.attrs
            .borrow_mut()
            .insert((path.to_path_buf(), name.to_string()), value.to_vec());
        Ok(())
    }

    fn get(&self, path: &Path, name: &str) -> Result<Option<Vec<u8>>, HtpackError> {
        Ok(self
            .attrs
            .borrow()
            .get(&(path.to_path_buf(), name.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod test_fattr {
    use super::*;

    #[test]
    fn digest_key() {
        assert_eq!(digest_name(DEFAULT_NAMESPACE), "user.feep.sha512");
        assert_eq!(digest_name("crawl"), "user.crawl.sha512");
    }

    #[test]
    fn mem_attrs() {
        let attrs = MemAttrs::new();
        let path = Path::new("/tmp/a.htpack");

        assert_eq!(attrs.get(path, "user.x").unwrap(), None);
        attrs.set(path, "user.x", b"1").unwrap();
        attrs.set(path, "user.x", b"2").unwrap();
        assert_eq!(attrs.get(path, "user.x").unwrap(), Some(b"2".to_vec()));
        assert_eq!(attrs.get(Path::new("/tmp/b.htpack"), "user.x").unwrap(), None);
    }
}
