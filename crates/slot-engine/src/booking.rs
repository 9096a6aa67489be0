//! Booking commit and the read-side views built on the datastore.
//!
//! [`book`] is the only way a [`BookedInterval`] comes into existence. It
//! re-reads the staff member's calendar and re-runs the overlap guard inside
//! the datastore's write boundary, immediately before inserting. A check made
//! earlier while handling the request is never trusted.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{EngineError, Result};
use crate::interval::{hhmm, AvailabilityWindow, BookedInterval, TimeInterval};
use crate::overlap::{find_conflict, has_overlap};
use crate::schedule::{Business, BusinessId, ScheduleQuery, Service, ServiceId, StaffId, StaffMember};
use crate::slots::generate_slots;
use crate::store::{Datastore, NewBooking};

/// A client's request to book a service with a staff member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub business_id: BusinessId,
    pub service_id: ServiceId,
    pub staff_id: StaffId,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    pub client_name: String,
    #[serde(default)]
    pub client_phone: Option<String>,
}

/// Commit a booking if the staff member is free for the whole service.
///
/// # Errors
/// - `NotFound` if the business, service or staff member does not exist.
/// - `InvalidInput` if the service or staff member belongs to another business
///   or is inactive, the client name is blank, or the appointment does not fit
///   inside the business's operating hours.
/// - `Conflict` if the interval overlaps an existing booking of that staff
///   member on that date.
#[instrument(
    skip(store, request),
    fields(
        business_id = request.business_id,
        staff_id = request.staff_id,
        date = %request.date,
        start = %request.start
    )
)]
pub fn book<S: Datastore>(store: &S, request: BookingRequest) -> Result<BookedInterval> {
    let business = require_business(store, request.business_id)?;
    let service = require_service(store, &business, request.service_id)?;
    let staff = require_staff(store, &business, request.staff_id)?;

    let client_name = request.client_name.trim();
    if client_name.is_empty() {
        return Err(EngineError::InvalidInput(
            "client name must not be empty".to_string(),
        ));
    }

    let interval = TimeInterval::starting_at(request.start, service.duration_minutes)?;
    if !interval.within(&business.hours.as_interval()) {
        return Err(EngineError::InvalidInput(format!(
            "{} falls outside operating hours {}",
            interval,
            business.hours.as_interval()
        )));
    }

    let booking = NewBooking {
        business_id: business.id,
        service_id: service.id,
        staff_id: staff.id,
        date: request.date,
        interval,
        client_name: client_name.to_string(),
        client_phone: request
            .client_phone
            .map(|phone| phone.trim().to_string())
            .filter(|phone| !phone.is_empty()),
    };

    let committed = store.with_staff_calendar(staff.id, request.date, |calendar| {
        let existing = calendar.booked();
        if has_overlap(&interval, existing.iter().map(BookedInterval::interval)) {
            let blocking = find_conflict(&interval, &existing)
                .map(|b| b.interval)
                .unwrap_or(interval);
            warn!(requested = %interval, existing = %blocking, "slot no longer available");
            return Err(EngineError::Conflict {
                staff_id: staff.id,
                date: request.date,
                requested: interval,
                existing: blocking,
            });
        }
        calendar.insert(booking)
    })?;

    info!(booking_id = committed.id, interval = %committed.interval, "booking committed");
    Ok(committed)
}

/// Look up a service that the business currently offers.
///
/// # Errors
/// `NotFound` for a missing business or service, `InvalidInput` when the
/// service belongs to another business or has been retired.
pub fn offered_service<S: Datastore>(
    store: &S,
    business_id: BusinessId,
    service_id: ServiceId,
) -> Result<Service> {
    let business = require_business(store, business_id)?;
    require_service(store, &business, service_id)
}

/// Public availability for a business day: windows not blocked by any booking
/// of that business on that date, regardless of staff member.
pub fn availability<S: Datastore>(
    store: &S,
    query: &ScheduleQuery,
) -> Result<Vec<AvailabilityWindow>> {
    let business = require_business(store, query.business_id)?;
    let booked = store.booked_intervals(query.business_id, query.date, None)?;
    generate_slots(
        business.hours.opening(),
        business.hours.closing(),
        query.service_duration_minutes,
        &booked,
    )
}

/// Availability for one staff member: only their own bookings block windows.
///
/// Every window returned here would pass the guard in [`book`] if booked now.
pub fn staff_availability<S: Datastore>(
    store: &S,
    query: &ScheduleQuery,
    staff_id: StaffId,
) -> Result<Vec<AvailabilityWindow>> {
    let business = require_business(store, query.business_id)?;
    require_staff(store, &business, staff_id)?;
    let booked = store.booked_intervals(query.business_id, query.date, Some(staff_id))?;
    generate_slots(
        business.hours.opening(),
        business.hours.closing(),
        query.service_duration_minutes,
        &booked,
    )
}

/// The day's bookings for a business, sorted by start time then staff id.
/// An empty day is an empty list, not an error.
pub fn agenda<S: Datastore>(
    store: &S,
    business_id: BusinessId,
    date: NaiveDate,
) -> Result<Vec<BookedInterval>> {
    require_business(store, business_id)?;
    store.booked_intervals(business_id, date, None)
}

fn require_business<S: Datastore>(store: &S, id: BusinessId) -> Result<Business> {
    store.business(id)?.ok_or(EngineError::NotFound {
        kind: "business",
        id: u64::from(id),
    })
}

fn require_service<S: Datastore>(store: &S, business: &Business, id: ServiceId) -> Result<Service> {
    let service = store.service(id)?.ok_or(EngineError::NotFound {
        kind: "service",
        id: u64::from(id),
    })?;
    if service.business_id != business.id || !service.active {
        return Err(EngineError::InvalidInput(format!(
            "service {} is not offered by business {}",
            service.id, business.id
        )));
    }
    Ok(service)
}

fn require_staff<S: Datastore>(store: &S, business: &Business, id: StaffId) -> Result<StaffMember> {
    let staff = store.staff_member(id)?.ok_or(EngineError::NotFound {
        kind: "staff member",
        id: u64::from(id),
    })?;
    if staff.business_id != business.id || !staff.active {
        return Err(EngineError::InvalidInput(format!(
            "staff member {} does not work at business {}",
            staff.id, business.id
        )));
    }
    Ok(staff)
}
