//! In-memory fakes for the store and client traits, shared by the unit tests.

use crate::{
    catalog::{CatalogMetadata, CatalogRecord, CatalogStore},
    error::{ClientError, StoreError},
    state::{LedgerEntry, LedgerStore},
    tinify::{CompressionClient, ResizeOptions, Source},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub type Shared<T> = Arc<Mutex<Vec<T>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    FindRecords(String),
    FindMetadata(i64),
    UpdateSize(i64, u64),
    UpdateDimensions(i64, u32, u32),
}

#[derive(Default)]
pub struct FakeCatalog {
    records: Vec<CatalogRecord>,
    metadata: Vec<CatalogMetadata>,
    fail: bool,
    calls: Shared<CatalogCall>,
}

impl FakeCatalog {
    pub fn with_record(id: i64, identifier: &str) -> Self {
        Self {
            records: vec![CatalogRecord { id, identifier: identifier.to_string(), size: 0 }],
            ..Default::default()
        }
    }

    /// Attach a metadata row to the first record
    pub fn with_metadata(mut self, id: i64) -> Self {
        let file_id = self.records.first().map(|r| r.id).unwrap_or_default();
        self.metadata.push(CatalogMetadata { id, file_id, width: 0, height: 0 });
        self
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn calls(&self) -> Shared<CatalogCall> {
        Arc::clone(&self.calls)
    }

    fn record(&self, call: CatalogCall) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(StoreError::Unavailable("catalog offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CatalogStore for FakeCatalog {
    fn find_records_by_identifier(&self, fragment: &str) -> Result<Vec<CatalogRecord>, StoreError> {
        self.record(CatalogCall::FindRecords(fragment.to_string()))?;
        Ok(self.records.iter().filter(|r| r.identifier.contains(fragment)).cloned().collect())
    }

    fn find_metadata_by_file_id(&self, file_id: i64) -> Result<Vec<CatalogMetadata>, StoreError> {
        self.record(CatalogCall::FindMetadata(file_id))?;
        Ok(self.metadata.iter().filter(|m| m.file_id == file_id).cloned().collect())
    }

    fn update_record_size(&self, id: i64, size: u64) -> Result<(), StoreError> {
        self.record(CatalogCall::UpdateSize(id, size))
    }

    fn update_metadata_dimensions(&self, id: i64, width: u32, height: u32) -> Result<(), StoreError> {
        self.record(CatalogCall::UpdateDimensions(id, width, height))
    }
}

#[derive(Default)]
pub struct FakeLedger {
    entries: Shared<LedgerEntry>,
    lookups: Shared<String>,
    fail: bool,
}

impl FakeLedger {
    pub fn with_entry(identifier: &str) -> Self {
        let ledger = Self::default();
        ledger.entries.lock().unwrap().push(LedgerEntry::new(identifier, 2560, 1));
        ledger
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn entries(&self) -> Shared<LedgerEntry> {
        Arc::clone(&self.entries)
    }

    pub fn lookups(&self) -> Shared<String> {
        Arc::clone(&self.lookups)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Unavailable("ledger offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl LedgerStore for FakeLedger {
    fn has_active_entry(&self, identifier: &str) -> Result<bool, StoreError> {
        self.lookups.lock().unwrap().push(identifier.to_string());
        self.check()?;
        Ok(self.entries.lock().unwrap().iter().any(|e| e.identifier == identifier))
    }

    fn insert(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.check()?;
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn invalidate(&self, identifier: &str) -> Result<usize, StoreError> {
        self.check()?;
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.identifier != identifier);
        Ok(before - entries.len())
    }

    fn active_count(&self) -> Result<usize, StoreError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().len())
    }
}

/// How the fake service answers the credential check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accept,
    RejectCredentials,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Validate,
    Upload(usize),
    Resize(u32),
}

pub struct FakeClient {
    validation: Validation,
    output: Vec<u8>,
    fail_upload: bool,
    calls: Shared<ClientCall>,
}

impl FakeClient {
    /// Accepts the credentials and shrinks every image to `output`
    pub fn returning(output: &[u8]) -> Self {
        Self {
            validation: Validation::Accept,
            output: output.to_vec(),
            fail_upload: false,
            calls: Arc::default(),
        }
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }

    pub fn calls(&self) -> Shared<ClientCall> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CompressionClient for FakeClient {
    async fn validate(&self) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(ClientCall::Validate);
        match self.validation {
            Validation::Accept => Ok(()),
            Validation::RejectCredentials => Err(ClientError::Account {
                status: 401,
                message: "Credentials are invalid (Unauthorized)".to_string(),
            }),
            Validation::Unreachable => Err(ClientError::Connection("connection refused".to_string())),
        }
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<Source, ClientError> {
        self.calls.lock().unwrap().push(ClientCall::Upload(bytes.len()));
        if self.fail_upload {
            return Err(ClientError::Server { status: 503, message: "unavailable".to_string() });
        }
        Ok(Source {
            location: "https://api.tinify.test/output/1".to_string(),
            input_size: Some(bytes.len() as u64),
            output_size: Some(self.output.len() as u64),
        })
    }

    async fn resize(&self, _source: &Source, options: &ResizeOptions) -> Result<Vec<u8>, ClientError> {
        self.calls.lock().unwrap().push(ClientCall::Resize(options.width));
        Ok(self.output.clone())
    }
}
