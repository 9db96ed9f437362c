// gridx_core/src/vault.rs
use std::io::Read;

use crate::catalog::Catalog;
use crate::domain::FileRecord;
use crate::error::Result;
use crate::options::StoreOptions;
use crate::reader::FileReader;
use crate::store::{Backend, SharedStore, open_store};
use crate::writer::{StreamWriter, UploadSession};

/// A chunk store plus the options uploads are written with.
#[derive(Clone)]
pub struct Vault {
    store: SharedStore,
    opts: StoreOptions,
}

impl Vault {
    pub fn new(store: SharedStore, opts: StoreOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self { store, opts })
    }

    pub fn open(backend: Backend, opts: StoreOptions) -> Result<Self> {
        Self::new(open_store(backend)?, opts)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn writer(&self) -> Result<StreamWriter> {
        StreamWriter::new(self.store.clone(), &self.opts)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.store.clone())
    }

    pub fn upload<R: Read>(
        &self,
        name_hint: &str,
        content_type: Option<&str>,
        source: R,
    ) -> Result<FileRecord> {
        self.writer()?.write(name_hint, content_type, source)
    }

    pub fn begin_upload(
        &self,
        name_hint: &str,
        content_type: Option<&str>,
    ) -> Result<UploadSession> {
        self.writer()?.begin(name_hint, content_type)
    }

    pub fn download(&self, id_or_name: &str) -> Result<FileReader> {
        FileReader::open(self.store.clone(), id_or_name)
    }

    pub fn list(&self) -> Result<Vec<FileRecord>> {
        self.catalog().list()
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.catalog().delete(id)
    }
}
