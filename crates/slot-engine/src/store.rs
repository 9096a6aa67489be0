//! Datastore boundary and an in-memory implementation.
//!
//! The engine never persists anything itself. It reads through [`Datastore`]
//! and writes only inside [`Datastore::with_staff_calendar`], which must give
//! the closure exclusive access to one staff member's calendar for one date.
//! The guard's re-check and the insert therefore happen as one unit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{EngineError, Result};
use crate::interval::{BookedInterval, BookingStatus, TimeInterval};
use crate::overlap::find_conflict;
use crate::schedule::{Business, BookingId, BusinessId, Service, ServiceId, StaffId, StaffMember};

/// A booking that has passed validation but has not been committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub business_id: BusinessId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    pub interval: TimeInterval,
    pub client_name: String,
    pub client_phone: Option<String>,
}

/// Exclusive view of one staff member's bookings on one date.
pub trait StaffCalendar {
    /// Current bookings, read fresh under the calendar's lock.
    fn booked(&self) -> Vec<BookedInterval>;

    /// Commit a booking.
    ///
    /// # Errors
    /// Returns `EngineError::Conflict` if the interval overlaps an existing
    /// booking, whether or not the caller checked first.
    fn insert(&mut self, booking: NewBooking) -> Result<BookedInterval>;
}

/// Synchronous persistence collaborator.
pub trait Datastore {
    fn business(&self, id: BusinessId) -> Result<Option<Business>>;

    fn service(&self, id: ServiceId) -> Result<Option<Service>>;

    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>>;

    /// All bookings of a business on `date`, optionally scoped to one staff
    /// member, sorted by start time then staff id.
    fn booked_intervals(
        &self,
        business_id: BusinessId,
        date: NaiveDate,
        staff_id: Option<StaffId>,
    ) -> Result<Vec<BookedInterval>>;

    /// Run `f` while holding the write boundary for `(staff_id, date)`.
    fn with_staff_calendar<T, F>(&self, staff_id: StaffId, date: NaiveDate, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StaffCalendar) -> Result<T>;
}

/// Serializable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub businesses: Vec<Business>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub bookings: Vec<BookedInterval>,
    /// Next booking id to hand out. Cancelled bookings are not exported, so
    /// their ids survive only through this counter.
    #[serde(default)]
    pub next_id: BookingId,
}

type CalendarKey = (StaffId, NaiveDate);
type Calendar = Arc<Mutex<Vec<BookedInterval>>>;

/// Thread-safe datastore held entirely in memory.
///
/// Each `(staff, date)` calendar has its own lock, so bookings for different
/// staff members or days never wait on each other.
#[derive(Debug)]
pub struct InMemoryStore {
    businesses: RwLock<HashMap<BusinessId, Business>>,
    services: RwLock<HashMap<ServiceId, Service>>,
    staff: RwLock<HashMap<StaffId, StaffMember>>,
    calendars: Mutex<HashMap<CalendarKey, Calendar>>,
    next_id: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            businesses: RwLock::default(),
            services: RwLock::default(),
            staff: RwLock::default(),
            calendars: Mutex::default(),
            next_id: AtomicU64::new(1),
        }
    }
}

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::Datastore("in-memory store lock poisoned".to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot. Bookings go through the same exclusion check as live
    /// commits, so an overlapping snapshot is rejected with `Conflict`.
    /// Cancelled bookings occupy no time and are skipped, but their ids are
    /// never handed out again.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let store = Self::new();
        for business in snapshot.businesses {
            store.put_business(business)?;
        }
        for service in snapshot.services {
            store.put_service(service)?;
        }
        for member in snapshot.staff {
            store.put_staff_member(member)?;
        }

        let mut max_id: BookingId = 0;
        for booking in snapshot.bookings {
            max_id = max_id.max(booking.id);
            if booking.status == BookingStatus::Cancelled {
                continue;
            }
            let calendar = store.calendar(booking.staff_id, booking.date)?;
            let mut entries = calendar.lock().map_err(poisoned)?;
            check_exclusion(&entries, &booking.interval)?;
            insert_sorted(&mut entries, booking);
        }
        let after_max = max_id.checked_add(1).ok_or_else(|| {
            EngineError::InvalidInput(format!("booking id {} leaves no room for new bookings", max_id))
        })?;
        store
            .next_id
            .store(after_max.max(snapshot.next_id), Ordering::SeqCst);

        Ok(store)
    }

    /// Export everything, bookings ordered by id.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut businesses: Vec<Business> =
            self.businesses.read().map_err(poisoned)?.values().cloned().collect();
        businesses.sort_by_key(|b| b.id);
        let mut services: Vec<Service> =
            self.services.read().map_err(poisoned)?.values().cloned().collect();
        services.sort_by_key(|s| s.id);
        let mut staff: Vec<StaffMember> =
            self.staff.read().map_err(poisoned)?.values().cloned().collect();
        staff.sort_by_key(|s| s.id);

        let mut bookings = Vec::new();
        for calendar in self.calendars_matching(|_| true)? {
            bookings.extend(calendar.lock().map_err(poisoned)?.iter().cloned());
        }
        bookings.sort_by_key(|b| b.id);

        Ok(Snapshot {
            businesses,
            services,
            staff,
            bookings,
            next_id: self.next_id.load(Ordering::SeqCst),
        })
    }

    pub fn put_business(&self, business: Business) -> Result<()> {
        self.businesses
            .write()
            .map_err(poisoned)?
            .insert(business.id, business);
        Ok(())
    }

    pub fn put_service(&self, service: Service) -> Result<()> {
        self.services
            .write()
            .map_err(poisoned)?
            .insert(service.id, service);
        Ok(())
    }

    pub fn put_staff_member(&self, member: StaffMember) -> Result<()> {
        self.staff.write().map_err(poisoned)?.insert(member.id, member);
        Ok(())
    }

    /// Remove a booking from its calendar, freeing the time it occupied.
    ///
    /// # Errors
    /// Returns `EngineError::NotFound` if no booking has that id.
    pub fn cancel(&self, id: BookingId) -> Result<BookedInterval> {
        let mut cancelled = None;
        for calendar in self.calendars_matching(|_| true)? {
            let mut entries = calendar.lock().map_err(poisoned)?;
            if let Some(pos) = entries.iter().position(|b| b.id == id) {
                cancelled = Some(entries.remove(pos));
                break;
            }
        }
        let Some(mut removed) = cancelled else {
            return Err(EngineError::NotFound {
                kind: "booking",
                id,
            });
        };

        removed.status = BookingStatus::Cancelled;
        debug!(booking_id = id, staff_id = removed.staff_id, date = %removed.date, "cancelled booking");
        self.prune_calendar((removed.staff_id, removed.date))?;
        Ok(removed)
    }

    /// Handles are only cloned under the outer map lock.
    fn calendar(&self, staff_id: StaffId, date: NaiveDate) -> Result<Calendar> {
        let mut calendars = self.calendars.lock().map_err(poisoned)?;
        Ok(Arc::clone(calendars.entry((staff_id, date)).or_default()))
    }

    /// Drop the calendar for `key` if it is empty and nobody else holds it.
    fn prune_calendar(&self, key: CalendarKey) -> Result<()> {
        let mut calendars = self.calendars.lock().map_err(poisoned)?;
        let idle = calendars.get(&key).is_some_and(|calendar| {
            Arc::strong_count(calendar) == 1
                && calendar.lock().map_or(false, |entries| entries.is_empty())
        });
        if idle {
            calendars.remove(&key);
        }
        Ok(())
    }

    /// Clone out the matching calendar handles so the outer map lock is
    /// released before any calendar is locked.
    fn calendars_matching(&self, keep: impl Fn(&CalendarKey) -> bool) -> Result<Vec<Calendar>> {
        let calendars = self.calendars.lock().map_err(poisoned)?;
        Ok(calendars
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(_, calendar)| Arc::clone(calendar))
            .collect())
    }
}

impl Datastore for InMemoryStore {
    fn business(&self, id: BusinessId) -> Result<Option<Business>> {
        Ok(self.businesses.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn service(&self, id: ServiceId) -> Result<Option<Service>> {
        Ok(self.services.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn staff_member(&self, id: StaffId) -> Result<Option<StaffMember>> {
        Ok(self.staff.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn booked_intervals(
        &self,
        business_id: BusinessId,
        date: NaiveDate,
        staff_id: Option<StaffId>,
    ) -> Result<Vec<BookedInterval>> {
        let matching = self.calendars_matching(|&(staff, day)| {
            day == date && staff_id.map_or(true, |wanted| wanted == staff)
        })?;

        let mut booked = Vec::new();
        for calendar in matching {
            let entries = calendar.lock().map_err(poisoned)?;
            booked.extend(
                entries
                    .iter()
                    .filter(|b| b.business_id == business_id)
                    .cloned(),
            );
        }
        booked.sort_by_key(|b| (b.interval.start(), b.staff_id));
        Ok(booked)
    }

    fn with_staff_calendar<T, F>(&self, staff_id: StaffId, date: NaiveDate, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn StaffCalendar) -> Result<T>,
    {
        let calendar = self.calendar(staff_id, date)?;
        let outcome = {
            let mut entries = calendar.lock().map_err(poisoned)?;
            let mut locked = LockedCalendar {
                staff_id,
                date,
                entries: &mut *entries,
                next_id: &self.next_id,
            };
            f(&mut locked)
        };
        drop(calendar);
        self.prune_calendar((staff_id, date))?;
        outcome
    }
}

struct LockedCalendar<'a> {
    staff_id: StaffId,
    date: NaiveDate,
    entries: &'a mut Vec<BookedInterval>,
    next_id: &'a AtomicU64,
}

impl StaffCalendar for LockedCalendar<'_> {
    fn booked(&self) -> Vec<BookedInterval> {
        self.entries.clone()
    }

    fn insert(&mut self, booking: NewBooking) -> Result<BookedInterval> {
        if booking.staff_id != self.staff_id || booking.date != self.date {
            return Err(EngineError::InvalidInput(format!(
                "booking for staff {} on {} does not belong to calendar of staff {} on {}",
                booking.staff_id, booking.date, self.staff_id, self.date
            )));
        }

        // Checked before an id is consumed.
        check_exclusion(self.entries.as_slice(), &booking.interval)?;

        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| id.checked_add(1))
            .map_err(|_| EngineError::Datastore("booking ids exhausted".to_string()))?;
        let record = BookedInterval {
            id,
            business_id: booking.business_id,
            service_id: booking.service_id,
            staff_id: booking.staff_id,
            date: booking.date,
            interval: booking.interval,
            client_name: booking.client_name,
            client_phone: booking.client_phone,
            status: BookingStatus::Pending,
        };
        insert_sorted(self.entries, record.clone());
        Ok(record)
    }
}

/// Exclusion constraint: no two entries of one calendar may overlap.
fn check_exclusion(entries: &[BookedInterval], requested: &TimeInterval) -> Result<()> {
    if let Some(existing) = find_conflict(requested, entries) {
        warn!(
            staff_id = existing.staff_id,
            date = %existing.date,
            requested = %requested,
            existing = %existing.interval,
            "exclusion constraint rejected overlapping booking"
        );
        return Err(conflict(requested, existing));
    }
    Ok(())
}

fn insert_sorted(entries: &mut Vec<BookedInterval>, record: BookedInterval) {
    let pos = entries.partition_point(|b| b.interval <= record.interval);
    entries.insert(pos, record);
}

fn conflict(requested: &TimeInterval, existing: &BookedInterval) -> EngineError {
    EngineError::Conflict {
        staff_id: existing.staff_id,
        date: existing.date,
        requested: *requested,
        existing: existing.interval,
    }
}
