use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    application::dtos::HealthStatusResponse,
    domain::{
        days_until_birthday, Contact, ContactField, ContactFields, ContactId, DomainError,
        FieldMatch, OwnerId,
    },
};

/// How `search` treats several supplied filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchMode {
    /// Only the highest-precedence filter applies: email, then last name,
    /// then first name. The others are ignored.
    #[default]
    LastFilterWins,
    /// Every supplied filter must match.
    AllFilters,
}

/// Whether `upcoming_birthdays` pages before or after the proximity filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BirthdayScan {
    /// Take the `limit`/`offset` window in store order, then keep the
    /// contacts whose birthday is close.
    #[default]
    WindowFirst,
    /// Keep every owned contact whose birthday is close, then apply
    /// `offset`/`limit` to those matches.
    FilterFirst,
}

/// Behavioural knobs for [`ContactService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub search_mode: SearchMode,
    pub birthday_scan: BirthdayScan,
    /// Days ahead, inclusive, that count as "upcoming". Today is day 0.
    pub horizon_days: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            search_mode: SearchMode::default(),
            birthday_scan: BirthdayScan::default(),
            horizon_days: 7,
        }
    }
}

impl ServiceConfig {
    pub fn with_search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    pub fn with_birthday_scan(mut self, scan: BirthdayScan) -> Self {
        self.birthday_scan = scan;
        self
    }

    pub fn with_horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }
}

/// Contract for contact persistence.
///
/// Every method takes the owner explicitly; implementations must never
/// return or mutate another owner's records. A missing record is `Ok(None)`,
/// never an error.
pub trait ContactStore: Send + Sync {
    fn insert(&self, owner: &OwnerId, fields: ContactFields) -> Result<Contact, DomainError>;

    fn fetch(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError>;

    /// Owned contacts in ascending id order, skipping `offset`, at most `limit`.
    fn page(
        &self,
        owner: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Contact>, DomainError>;

    fn replace(
        &self,
        owner: &OwnerId,
        id: ContactId,
        fields: ContactFields,
    ) -> Result<Option<Contact>, DomainError>;

    fn remove(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError>;

    /// Owned contacts matching every predicate, in ascending id order.
    fn find(&self, owner: &OwnerId, predicates: &[FieldMatch])
        -> Result<Vec<Contact>, DomainError>;

    fn ping(&self) -> Result<(), DomainError>;

    fn all(&self, owner: &OwnerId) -> Result<Vec<Contact>, DomainError> {
        self.page(owner, usize::MAX, 0)
    }
}

/// Source of the current calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Owner-scoped CRUD, search and birthday queries over a [`ContactStore`].
pub struct ContactService {
    store: Arc<dyn ContactStore>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

impl ContactService {
    pub fn new(store: Arc<dyn ContactStore>, clock: Arc<dyn Clock>, config: ServiceConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Bounds are the caller's concern; nothing is clamped here.
    pub fn list(
        &self,
        owner: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Contact>, DomainError> {
        debug!(target: "contacts::service", %owner, limit, offset, "list contacts");
        self.store.page(owner, limit, offset)
    }

    pub fn get(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        debug!(target: "contacts::service", %owner, %id, "get contact");
        self.store.fetch(owner, id)
    }

    pub fn create(&self, owner: &OwnerId, fields: ContactFields) -> Result<Contact, DomainError> {
        let contact = self.store.insert(owner, fields)?;
        info!(target: "contacts::service", %owner, id = %contact.id, "contact created");
        Ok(contact)
    }

    /// Overwrites every mutable field; there is no partial patch.
    pub fn update(
        &self,
        owner: &OwnerId,
        id: ContactId,
        fields: ContactFields,
    ) -> Result<Option<Contact>, DomainError> {
        let updated = self.store.replace(owner, id, fields)?;
        match &updated {
            Some(_) => info!(target: "contacts::service", %owner, %id, "contact updated"),
            None => debug!(target: "contacts::service", %owner, %id, "update target absent"),
        }
        Ok(updated)
    }

    pub fn delete(&self, owner: &OwnerId, id: ContactId) -> Result<Option<Contact>, DomainError> {
        let removed = self.store.remove(owner, id)?;
        match &removed {
            Some(_) => info!(target: "contacts::service", %owner, %id, "contact deleted"),
            None => debug!(target: "contacts::service", %owner, %id, "delete target absent"),
        }
        Ok(removed)
    }

    /// Case-insensitive substring search on the literal filter text. Blank
    /// filters count as absent, and with no filter at all the result is empty.
    pub fn search(
        &self,
        owner: &OwnerId,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Vec<Contact>, DomainError> {
        let predicates = self.search_predicates(first_name, last_name, email);
        if predicates.is_empty() {
            debug!(target: "contacts::service", %owner, "search without filters");
            return Ok(Vec::new());
        }

        debug!(
            target: "contacts::service",
            %owner,
            mode = ?self.config.search_mode,
            filters = predicates.len(),
            "search contacts"
        );
        self.store.find(owner, &predicates)
    }

    /// Contacts whose next birthday is at most `horizon_days` away, in store
    /// order. See [`BirthdayScan`] for how `limit`/`offset` interact with the
    /// date filter.
    pub fn upcoming_birthdays(
        &self,
        owner: &OwnerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Contact>, DomainError> {
        let today = self.clock.today();
        let horizon = i64::from(self.config.horizon_days);
        let is_upcoming = |contact: &Contact| {
            days_until_birthday(contact.birthday, today).is_some_and(|days| days <= horizon)
        };

        let contacts: Vec<Contact> = match self.config.birthday_scan {
            BirthdayScan::WindowFirst => self
                .store
                .page(owner, limit, offset)?
                .into_iter()
                .filter(|contact| is_upcoming(contact))
                .collect(),
            BirthdayScan::FilterFirst => self
                .store
                .all(owner)?
                .into_iter()
                .filter(|contact| is_upcoming(contact))
                .skip(offset)
                .take(limit)
                .collect(),
        };

        debug!(
            target: "contacts::service",
            %owner,
            %today,
            found = contacts.len(),
            "upcoming birthdays"
        );
        Ok(contacts)
    }

    pub fn health(&self) -> Result<HealthStatusResponse, DomainError> {
        self.store.ping()?;

        Ok(HealthStatusResponse {
            ok: true,
            message: "ready".into(),
            details: Some(format!(
                "search: {:?}, birthdays: {:?}/{}d, checked_at: {}",
                self.config.search_mode,
                self.config.birthday_scan,
                self.config.horizon_days,
                Utc::now()
            )),
        })
    }

    fn search_predicates(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> Vec<FieldMatch> {
        // Ascending precedence: a later entry overrides an earlier one.
        let supplied = [
            (ContactField::FirstName, first_name),
            (ContactField::LastName, last_name),
            (ContactField::Email, email),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            let needle = value.filter(|text| !text.trim().is_empty())?;
            Some(FieldMatch::new(field, needle))
        });

        match self.config.search_mode {
            SearchMode::AllFilters => supplied.collect(),
            SearchMode::LastFilterWins => supplied.last().into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Duration};

    use super::*;
    use crate::domain::ExtraData;
    use crate::infrastructure::{FixedClock, InMemoryContactStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn service_with(config: ServiceConfig) -> ContactService {
        ContactService::new(
            Arc::new(InMemoryContactStore::new()),
            Arc::new(FixedClock::new(today())),
            config,
        )
    }

    fn service() -> ContactService {
        service_with(ServiceConfig::default())
    }

    fn fields(first: &str, last: &str, email: &str, birthday: NaiveDate) -> ContactFields {
        ContactFields {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            phone_number: "1".into(),
            birthday,
            extra_data: ExtraData::new(),
        }
    }

    fn born_in(days_from_today: i64) -> NaiveDate {
        // Same month/day in an earlier year so only the anniversary matters.
        let date = today() + Duration::days(days_from_today);
        NaiveDate::from_ymd_opt(1990, date.month(), date.day()).unwrap()
    }

    #[test]
    fn test_get_after_create_is_scoped_to_owner() {
        let service = service();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");

        let created = service
            .create(&alice, fields("Ann", "Smith", "ann@x.com", born_in(40)))
            .unwrap();

        assert_eq!(service.get(&alice, created.id).unwrap(), Some(created.clone()));
        assert_eq!(service.get(&bob, created.id).unwrap(), None);
    }

    #[test]
    fn test_update_overwrites_every_field() {
        let service = service();
        let owner = OwnerId::new("alice");
        let created = service
            .create(&owner, fields("Ann", "Smith", "ann@x.com", born_in(40)))
            .unwrap();

        let mut replacement = fields("Anna", "Jones", "anna@y.org", born_in(2));
        replacement.phone_number = "555".into();
        replacement.extra_data.insert("company".into(), "Acme".into());

        let updated = service
            .update(&owner, created.id, replacement.clone())
            .unwrap()
            .unwrap();
        assert_eq!(updated.fields(), replacement);

        let fetched = service.get(&owner, created.id).unwrap().unwrap();
        assert_eq!(fetched.fields(), replacement);
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.owner, owner);
    }

    #[test]
    fn test_update_foreign_contact_is_absent() {
        let service = service();
        let created = service
            .create(&OwnerId::new("alice"), fields("Ann", "Smith", "a@x", born_in(1)))
            .unwrap();

        let result = service
            .update(&OwnerId::new("bob"), created.id, fields("X", "Y", "z", born_in(1)))
            .unwrap();
        assert!(result.is_none());
        let untouched = service.get(&OwnerId::new("alice"), created.id).unwrap().unwrap();
        assert_eq!(untouched.first_name, "Ann");
    }

    #[test]
    fn test_delete_twice_returns_absent() {
        let service = service();
        let owner = OwnerId::new("alice");
        let created = service
            .create(&owner, fields("Ann", "Smith", "a@x", born_in(1)))
            .unwrap();

        assert_eq!(service.delete(&owner, created.id).unwrap(), Some(created.clone()));
        assert_eq!(service.get(&owner, created.id).unwrap(), None);
        assert_eq!(service.delete(&owner, created.id).unwrap(), None);
    }

    #[test]
    fn test_list_pages_in_store_order() {
        let service = service();
        let owner = OwnerId::new("alice");
        let ids: Vec<ContactId> = (0..5)
            .map(|i| {
                service
                    .create(&owner, fields(&format!("C{i}"), "L", "e", born_in(30)))
                    .unwrap()
                    .id
            })
            .collect();
        service
            .create(&OwnerId::new("bob"), fields("Other", "L", "e", born_in(30)))
            .unwrap();

        let page: Vec<ContactId> = service
            .list(&owner, 2, 1)
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(page, ids[1..3].to_vec());
        assert_eq!(service.list(&owner, 10, 0).unwrap().len(), 5);
    }

    #[test]
    fn test_search_email_overrides_first_name() {
        let service = service();
        let owner = OwnerId::new("alice");
        let ann = service
            .create(&owner, fields("Ann", "Smith", "ann@home.net", born_in(30)))
            .unwrap();
        let bob = service
            .create(&owner, fields("Bob", "Annex", "bob@x.com", born_in(30)))
            .unwrap();

        let by_first = service.search(&owner, Some("aNN"), None, None).unwrap();
        assert_eq!(by_first, vec![ann.clone()]);

        // The first-name filter is ignored once an email filter is present.
        let with_email = service.search(&owner, Some("Ann"), None, Some("x")).unwrap();
        assert_eq!(with_email, vec![bob.clone()]);

        let by_last = service.search(&owner, Some("Bob"), Some("smith"), None).unwrap();
        assert_eq!(by_last, vec![ann]);
    }

    #[test]
    fn test_search_all_filters_requires_every_match() {
        let service = service_with(ServiceConfig::default().with_search_mode(SearchMode::AllFilters));
        let owner = OwnerId::new("alice");
        let ann = service
            .create(&owner, fields("Ann", "Smith", "ann@x.com", born_in(30)))
            .unwrap();
        service
            .create(&owner, fields("Annie", "Hall", "annie@home.net", born_in(30)))
            .unwrap();

        assert_eq!(service.search(&owner, Some("Ann"), None, None).unwrap().len(), 2);
        assert_eq!(
            service.search(&owner, Some("Ann"), None, Some("x")).unwrap(),
            vec![ann]
        );
        assert!(service
            .search(&owner, Some("Ann"), Some("jones"), None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_search_without_filters_is_empty() {
        let service = service();
        let owner = OwnerId::new("alice");
        service
            .create(&owner, fields("Ann", "Smith", "ann@x.com", born_in(30)))
            .unwrap();

        assert!(service.search(&owner, None, None, None).unwrap().is_empty());
        assert!(service.search(&owner, Some("  "), Some(""), None).unwrap().is_empty());
    }

    #[test]
    fn test_search_matches_text_as_given() {
        let service = service();
        let owner = OwnerId::new("alice");
        let annabel = service
            .create(&owner, fields("Annabel", "Lee", "annabel@x.com", born_in(30)))
            .unwrap();
        let ann_marie = service
            .create(&owner, fields("Ann Marie", "Ross", "am@x.com", born_in(30)))
            .unwrap();

        // The trailing space is part of the needle.
        assert_eq!(
            service.search(&owner, Some("Ann "), None, None).unwrap(),
            vec![ann_marie]
        );
        assert_eq!(
            service.search(&owner, Some("nabe"), None, None).unwrap(),
            vec![annabel]
        );
    }

    #[test]
    fn test_search_does_not_cross_owners() {
        let service = service();
        service
            .create(&OwnerId::new("alice"), fields("Ann", "Smith", "ann@x.com", born_in(30)))
            .unwrap();

        assert!(service
            .search(&OwnerId::new("bob"), Some("ann"), None, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_upcoming_birthdays_within_a_week() {
        let service = service();
        let owner = OwnerId::new("alice");
        let soon = service
            .create(&owner, fields("Soon", "S", "s", born_in(3)))
            .unwrap();
        service
            .create(&owner, fields("Later", "L", "l", born_in(10)))
            .unwrap();
        let edge = service
            .create(&owner, fields("Edge", "E", "e", born_in(7)))
            .unwrap();
        let today_one = service
            .create(&owner, fields("Today", "T", "t", born_in(0)))
            .unwrap();
        service
            .create(&owner, fields("Yesterday", "Y", "y", born_in(-1)))
            .unwrap();

        let upcoming = service.upcoming_birthdays(&owner, 10, 0).unwrap();
        assert_eq!(upcoming, vec![soon, edge, today_one]);
    }

    #[test]
    fn test_upcoming_birthdays_window_first_only_sees_window() {
        let service = service();
        let owner = OwnerId::new("alice");
        service
            .create(&owner, fields("Far", "F", "f", born_in(100)))
            .unwrap();
        let near = service
            .create(&owner, fields("Near", "N", "n", born_in(1)))
            .unwrap();

        assert!(service.upcoming_birthdays(&owner, 1, 0).unwrap().is_empty());
        assert_eq!(service.upcoming_birthdays(&owner, 1, 1).unwrap(), vec![near]);
    }

    #[test]
    fn test_upcoming_birthdays_filter_first_pages_matches() {
        let service =
            service_with(ServiceConfig::default().with_birthday_scan(BirthdayScan::FilterFirst));
        let owner = OwnerId::new("alice");
        service
            .create(&owner, fields("Far", "F", "f", born_in(100)))
            .unwrap();
        let first = service
            .create(&owner, fields("Near", "N", "n", born_in(1)))
            .unwrap();
        let second = service
            .create(&owner, fields("Nearer", "N", "n", born_in(0)))
            .unwrap();

        assert_eq!(service.upcoming_birthdays(&owner, 1, 0).unwrap(), vec![first]);
        assert_eq!(service.upcoming_birthdays(&owner, 1, 1).unwrap(), vec![second]);
    }

    #[test]
    fn test_horizon_is_configurable() {
        let service = service_with(ServiceConfig::default().with_horizon_days(14));
        let owner = OwnerId::new("alice");
        service
            .create(&owner, fields("Later", "L", "l", born_in(10)))
            .unwrap();

        assert_eq!(service.upcoming_birthdays(&owner, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_owner_scenario() {
        let service = service();
        let a = OwnerId::new("owner-a");
        let b = OwnerId::new("owner-b");
        let jo = service
            .create(&a, fields("Jo", "Bee", "jo@x.com", today() + Duration::days(2)))
            .unwrap();

        assert!(service.list(&b, 10, 0).unwrap().is_empty());
        assert_eq!(service.upcoming_birthdays(&a, 10, 0).unwrap(), vec![jo]);
    }

    struct BrokenStore;

    impl ContactStore for BrokenStore {
        fn insert(&self, _: &OwnerId, _: ContactFields) -> Result<Contact, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn fetch(&self, _: &OwnerId, _: ContactId) -> Result<Option<Contact>, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn page(&self, _: &OwnerId, _: usize, _: usize) -> Result<Vec<Contact>, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn replace(
            &self,
            _: &OwnerId,
            _: ContactId,
            _: ContactFields,
        ) -> Result<Option<Contact>, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn remove(&self, _: &OwnerId, _: ContactId) -> Result<Option<Contact>, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn find(&self, _: &OwnerId, _: &[FieldMatch]) -> Result<Vec<Contact>, DomainError> {
            Err(DomainError::storage("offline"))
        }
        fn ping(&self) -> Result<(), DomainError> {
            Err(DomainError::storage("offline"))
        }
    }

    #[test]
    fn test_store_faults_are_not_absence() {
        let service = ContactService::new(
            Arc::new(BrokenStore),
            Arc::new(FixedClock::new(today())),
            ServiceConfig::default(),
        );
        let owner = OwnerId::new("alice");

        assert!(matches!(
            service.get(&owner, ContactId(1)),
            Err(DomainError::Storage(_))
        ));
        assert!(matches!(
            service.delete(&owner, ContactId(1)),
            Err(DomainError::Storage(_))
        ));
        assert!(service.upcoming_birthdays(&owner, 10, 0).is_err());
        assert!(service.health().is_err());
    }
}
