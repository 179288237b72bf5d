use std::path::Path;

use bincode::Options;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sled::{Config, Db, IVec, Tree};
use tracing::{debug, warn};

use crate::{
    application::services::ContactStore,
    domain::{Contact, ContactFields, ContactId, DomainError, FieldMatch, OwnerId},
};

const CONTACTS_TREE: &str = "contacts";

/// Embedded contact store backed by `sled`.
///
/// Keys are `owner length (u32 BE) | owner bytes | id (u64 BE)`, so a prefix
/// scan over one owner yields exactly that owner's contacts in ascending id
/// order. A lookup with the wrong owner builds a different key and misses.
pub struct SledContactStore {
    db: Db,
    contacts: Tree,
    write_lock: Mutex<()>,
}

impl SledContactStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|err| {
            DomainError::storage(format!("failed to create data directory {:?}: {err}", dir))
        })?;

        let db = Config::default()
            .path(&dir)
            .cache_capacity(16 * 1024 * 1024)
            .open()
            .map_err(|err| DomainError::storage(format!("failed to open sled db: {err}")))?;

        let contacts = db
            .open_tree(CONTACTS_TREE)
            .map_err(|err| DomainError::storage(format!("failed to open contacts tree: {err}")))?;

        Ok(Self {
            db,
            contacts,
            write_lock: Mutex::new(()),
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| DomainError::storage(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| DomainError::storage(format!("deserialization error: {err}")))
    }

    fn owner_prefix(owner: &OwnerId) -> Vec<u8> {
        let raw = owner.as_str().as_bytes();
        let mut prefix = Vec::with_capacity(4 + raw.len() + 8);
        prefix.extend_from_slice(&(raw.len() as u32).to_be_bytes());
        prefix.extend_from_slice(raw);
        prefix
    }

    fn encode_key(owner: &OwnerId, id: ContactId) -> Vec<u8> {
        let mut key = Self::owner_prefix(owner);
        key.extend_from_slice(&id.0.to_be_bytes());
        key
    }

    fn decode_record(bytes: &IVec) -> Result<Contact, DomainError> {
        Self::deserialize(bytes.as_ref())
    }

    /// Decoded records for one owner, lazily, in key order.
    fn scan_owner<'a>(
        &'a self,
        owner: &OwnerId,
    ) -> impl Iterator<Item = Result<Contact, DomainError>> + 'a {
        self.contacts
            .scan_prefix(Self::owner_prefix(owner))
            .map(|entry| {
                let (_, value) = entry.map_err(|err| {
                    DomainError::storage(format!("failed to read contact record: {err}"))
                })?;
                Self::decode_record(&value)
            })
    }

    fn next_id(&self) -> Result<ContactId, DomainError> {
        // Identifiers start at 1.
        self.db
            .generate_id()
            .map(|raw| ContactId(raw + 1))
            .map_err(|err| DomainError::storage(format!("failed to allocate id: {err}")))
    }

    fn write(&self, owner: &OwnerId, contact: &Contact) -> Result<(), DomainError> {
        let bytes = Self::serialize(contact)?;
        Self::put_durable(
            &self.contacts,
            &Self::encode_key(owner, contact.id),
            bytes,
            Self::flush,
        )
    }

    /// Inserts `bytes` under `key` and makes it durable with `flush`. If the
    /// flush fails the previous value (or absence) is restored before the
    /// error is returned, so a failed write leaves no record behind.
    fn put_durable(
        tree: &Tree,
        key: &[u8],
        bytes: Vec<u8>,
        flush: impl FnOnce(&Tree) -> Result<(), DomainError>,
    ) -> Result<(), DomainError> {
        let previous = tree
            .insert(key, bytes)
            .map_err(|err| DomainError::storage(format!("failed to persist contact: {err}")))?;

        if let Err(err) = flush(tree) {
            let restored = match previous {
                Some(old) => tree.insert(key, old).map(|_| ()),
                None => tree.remove(key).map(|_| ()),
            };
            if let Err(undo) = restored {
                warn!(target: "contacts::store", "failed to roll back contact write: {undo}");
            }
            return Err(err);
        }
        Ok(())
    }

    fn flush(tree: &Tree) -> Result<(), DomainError> {
        tree.flush()
            .map_err(|err| DomainError::storage(format!("failed to flush contacts: {err}")))?;
        Ok(())
    }
}

impl ContactStore for SledContactStore {
    fn insert(&self, owner: &OwnerId, fields: ContactFields) -> Result<Contact, DomainError> {
        let _guard = self.write_lock.lock();

        let contact = Contact::from_fields(self.next_id()?, owner.clone(), fields);
        self.write(owner, &contact)?;
        debug!(target: "contacts::store", %owner, id = %contact.id, "inserted contact");

        Ok(contact)
    }

    fn fetch(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        self.contacts
            .get(Self::encode_key(owner, id))
            .map_err(|err| DomainError::storage(format!("failed to read contact {id}: {err}")))?
            .map(|value| Self::decode_record(&value))
            .transpose()
    }

    fn page(
        &self,
        owner: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Contact>, DomainError> {
        self.scan_owner(owner).skip(offset).take(limit).collect()
    }

    fn replace(
        &self,
        owner: &OwnerId,
        id: ContactId,
        fields: ContactFields,
    ) -> Result<Option<Contact>, DomainError> {
        let _guard = self.write_lock.lock();

        let Some(mut contact) = self.fetch(owner, id)? else {
            return Ok(None);
        };
        contact.overwrite(fields);
        self.write(owner, &contact)?;
        debug!(target: "contacts::store", %owner, %id, "replaced contact");

        Ok(Some(contact))
    }

    fn remove(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        let _guard = self.write_lock.lock();

        let removed = self
            .contacts
            .remove(Self::encode_key(owner, id))
            .map_err(|err| DomainError::storage(format!("failed to remove contact {id}: {err}")))?;

        let Some(value) = removed else {
            return Ok(None);
        };
        Self::flush(&self.contacts)?;
        debug!(target: "contacts::store", %owner, %id, "removed contact");

        Self::decode_record(&value).map(Some)
    }

    fn find(
        &self,
        owner: &OwnerId,
        predicates: &[FieldMatch],
    ) -> Result<Vec<Contact>, DomainError> {
        let mut matches = Vec::new();

        for record in self.scan_owner(owner) {
            let contact = record?;
            if contact.matches_all(predicates) {
                matches.push(contact);
            }
        }

        Ok(matches)
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.db
            .flush()
            .map_err(|err| DomainError::storage(format!("failed to flush db: {err}")))?;

        Ok(())
    }
}
