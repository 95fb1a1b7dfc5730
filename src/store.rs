//! RocksDB header and record store
//!
//! Holds the headers written by upstream header tracking and the event
//! records written by transformers. Implements both the header source and
//! the record repository for every event type.

use crate::event::Event;
use crate::keys::{
    decode_block_number_key, encode_block_number_key, encode_checked_key, encode_header_key,
    encode_meta_key, encode_record_key, encode_record_prefix,
};
use crate::records::Header;
use crate::transformer::{HeaderSource, RecordRepository};
use alloy_primitives::B256;
use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const NEXT_HEADER_ID: u8 = 0x01;

/// RocksDB-backed header source and record repository.
///
/// Uses column families to organize different types of data:
/// - headers: header records by id
/// - header_numbers: block number -> header id index
/// - records: event records by (event, header id, occurrence)
/// - checked_headers: headers fully processed, per event
/// - meta: counters
pub struct RocksEventStore {
    db: DB,
    /// Serializes header id allocation
    insert_lock: Mutex<()>,
}

impl RocksEventStore {
    /// Open or create a RocksDB database at the given path.
    ///
    /// Creates all required column families if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![
            ColumnFamilyDescriptor::new("headers", Options::default()),
            ColumnFamilyDescriptor::new("header_numbers", Options::default()),
            ColumnFamilyDescriptor::new("records", Options::default()),
            ColumnFamilyDescriptor::new("checked_headers", Options::default()),
            ColumnFamilyDescriptor::new("meta", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .context("Failed to open RocksDB database")?;

        Ok(Self {
            db,
            insert_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Column family '{}' not found", name))
    }

    /// Store a header and assign it an id.
    ///
    /// Inserting a (block number, hash) pair that is already stored returns
    /// the existing header. A different hash at the same block number is
    /// stored as a new header.
    pub fn insert_header(&self, block_number: u64, hash: B256, raw: Vec<u8>) -> Result<Header> {
        let _guard = self
            .insert_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Header insert lock poisoned"))?;

        if let Some(existing) = self
            .headers_at(block_number)?
            .into_iter()
            .find(|h| h.hash == hash)
        {
            return Ok(existing);
        }

        let meta_cf = self.get_cf("meta")?;
        let id_key = encode_meta_key(NEXT_HEADER_ID);
        let id = match self
            .db
            .get_cf(meta_cf, &id_key)
            .context("Failed to read next header id")?
        {
            Some(bytes) => u64::from_be_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .context("Invalid next header id")?,
            ),
            None => 1,
        };

        let header = Header {
            id,
            block_number,
            hash,
            raw,
        };
        let value = postcard::to_allocvec(&header).context("Failed to serialize header")?;

        let mut batch = WriteBatch::default();
        batch.put_cf(self.get_cf("headers")?, encode_header_key(id), value);
        batch.put_cf(
            self.get_cf("header_numbers")?,
            encode_block_number_key(block_number, id),
            b"",
        );
        batch.put_cf(meta_cf, &id_key, (id + 1).to_be_bytes());
        self.db.write(batch).context("Failed to insert header")?;

        debug!("Inserted header {} for block {}", id, block_number);
        Ok(header)
    }

    /// Get a header by id.
    pub fn get_header(&self, header_id: u64) -> Result<Option<Header>> {
        let cf = self.get_cf("headers")?;
        match self
            .db
            .get_cf(cf, encode_header_key(header_id))
            .context("Failed to get header")?
        {
            Some(bytes) => {
                let header = postcard::from_bytes(&bytes)
                    .context("Failed to deserialize header")?;
                Ok(Some(header))
            }
            None => Ok(None),
        }
    }

    /// All headers stored for one block number.
    pub fn headers_at(&self, block_number: u64) -> Result<Vec<Header>> {
        self.headers_in_range(block_number, block_number)
    }

    /// Headers with block numbers in `[start, end]`, ordered by block
    /// number then id.
    pub fn headers_in_range(&self, start: u64, end: u64) -> Result<Vec<Header>> {
        if start > end {
            return Ok(Vec::new());
        }

        let cf = self.get_cf("header_numbers")?;
        let start_key = encode_block_number_key(start, 0);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&start_key, Direction::Forward));

        let mut headers = Vec::new();
        for item in iter {
            let (key, _) = item.context("Failed to read iterator")?;
            let (block_number, header_id) =
                decode_block_number_key(&key).context("Failed to decode block number key")?;
            if block_number > end {
                break;
            }
            let header = self
                .get_header(header_id)?
                .with_context(|| format!("Header {} missing for block {}", header_id, block_number))?;
            headers.push(header);
        }

        Ok(headers)
    }

    /// Whether the header is marked checked for `event`. Records alone do
    /// not count: a header with only some of its logs stored is still open.
    fn is_checked(&self, event: &str, header_id: u64) -> Result<bool> {
        let cf = self.get_cf("checked_headers")?;
        Ok(self
            .db
            .get_cf(cf, encode_checked_key(event, header_id))
            .context("Failed to read checked header")?
            .is_some())
    }

    /// Records of event `E` stored for a header, ordered by occurrence.
    pub fn records<E: Event>(&self, header_id: u64) -> Result<Vec<E::Model>> {
        let cf = self.get_cf("records")?;
        let prefix = encode_record_prefix(E::NAME, header_id);
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut models = Vec::new();
        for item in iter {
            let (key, value) = item.context("Failed to read iterator")?;
            if !key.starts_with(&prefix) {
                break;
            }
            let model = postcard::from_bytes(&value)
                .with_context(|| format!("Failed to deserialize {} record", E::NAME))?;
            models.push(model);
        }

        Ok(models)
    }
}

impl<E: Event> HeaderSource<E> for RocksEventStore {
    fn missing_headers(
        &self,
        starting_block_number: u64,
        ending_block_number: u64,
    ) -> Result<Vec<Header>> {
        let mut missing = Vec::new();
        for header in self.headers_in_range(starting_block_number, ending_block_number)? {
            if !self.is_checked(E::NAME, header.id)? {
                missing.push(header);
            }
        }
        Ok(missing)
    }
}

impl<E: Event> RecordRepository<E> for RocksEventStore {
    fn create_record(&self, header_id: u64, model: &E::Model) -> Result<()> {
        if self.get_header(header_id)?.is_none() {
            anyhow::bail!("Cannot create {} record: header {} not found", E::NAME, header_id);
        }

        let cf = self.get_cf("records")?;
        let key = encode_record_key(E::NAME, header_id, E::occurrence(model));

        if let Some(bytes) = self.db.get_cf(cf, &key).context("Failed to read record")? {
            let existing: E::Model = postcard::from_bytes(&bytes)
                .with_context(|| format!("Failed to deserialize {} record", E::NAME))?;
            if existing == *model {
                debug!("{} record for header {} already stored", E::NAME, header_id);
                return Ok(());
            }
            anyhow::bail!(
                "Conflicting {} record for header {} occurrence {}",
                E::NAME,
                header_id,
                E::occurrence(model)
            );
        }

        let value = postcard::to_allocvec(model)
            .with_context(|| format!("Failed to serialize {} record", E::NAME))?;
        self.db
            .put_cf(cf, &key, &value)
            .with_context(|| format!("Failed to put {} record", E::NAME))?;
        Ok(())
    }

    fn mark_header_checked(&self, header_id: u64) -> Result<()> {
        let cf = self.get_cf("checked_headers")?;
        self.db
            .put_cf(cf, encode_checked_key(E::NAME, header_id), b"")
            .context("Failed to mark header checked")?;
        Ok(())
    }
}
