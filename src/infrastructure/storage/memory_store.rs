use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::{
    application::services::ContactStore,
    domain::{Contact, ContactFields, ContactId, DomainError, FieldMatch, OwnerId},
};

type Key = (OwnerId, ContactId);

/// Process-local contact store. Nothing survives a restart.
pub struct InMemoryContactStore {
    contacts: RwLock<BTreeMap<Key, Contact>>,
    next_id: AtomicU64,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self {
            contacts: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn owner_range(owner: &OwnerId) -> RangeInclusive<Key> {
        (owner.clone(), ContactId(u64::MIN))..=(owner.clone(), ContactId(u64::MAX))
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactStore for InMemoryContactStore {
    fn insert(&self, owner: &OwnerId, fields: ContactFields) -> Result<Contact, DomainError> {
        let id = ContactId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let contact = Contact::from_fields(id, owner.clone(), fields);
        self.contacts
            .write()
            .insert((owner.clone(), id), contact.clone());
        Ok(contact)
    }

    fn fetch(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(self.contacts.read().get(&(owner.clone(), id)).cloned())
    }

    fn page(
        &self,
        owner: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Contact>, DomainError> {
        Ok(self
            .contacts
            .read()
            .range(Self::owner_range(owner))
            .skip(offset)
            .take(limit)
            .map(|(_, contact)| contact.clone())
            .collect())
    }

    fn replace(
        &self,
        owner: &OwnerId,
        id: ContactId,
        fields: ContactFields,
    ) -> Result<Option<Contact>, DomainError> {
        let mut guard = self.contacts.write();
        Ok(guard.get_mut(&(owner.clone(), id)).map(|contact| {
            contact.overwrite(fields);
            contact.clone()
        }))
    }

    fn remove(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        Ok(self.contacts.write().remove(&(owner.clone(), id)))
    }

    fn find(
        &self,
        owner: &OwnerId,
        predicates: &[FieldMatch],
    ) -> Result<Vec<Contact>, DomainError> {
        Ok(self
            .contacts
            .read()
            .range(Self::owner_range(owner))
            .filter(|(_, contact)| contact.matches_all(predicates))
            .map(|(_, contact)| contact.clone())
            .collect())
    }

    fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
