//! # slot-engine
//!
//! Appointment availability and double-booking prevention for a staffed business.
//!
//! Given a business's operating hours, a service duration and the appointments
//! already committed for a day, the engine lists the bookable windows and
//! decides whether a proposed appointment would overlap an existing one for
//! the same staff member. Intervals are half-open: an appointment ending at
//! 09:30 and one starting at 09:30 do not collide.
//!
//! ## Modules
//!
//! - [`interval`] — `TimeInterval`, `BookedInterval` and time parsing
//! - [`overlap`] — the overlap guard (`has_overlap`)
//! - [`slots`] — the slot generator (`generate_slots`)
//! - [`booking`] — guarded commit plus availability and agenda views
//! - [`store`] — the `Datastore` boundary and `InMemoryStore`
//! - [`schedule`] — businesses, services, staff and `ScheduleQuery`
//! - [`error`] — Error types

pub mod booking;
pub mod error;
pub mod interval;
pub mod overlap;
pub mod schedule;
pub mod slots;
pub mod store;

pub use booking::{
    agenda, availability, book, offered_service, staff_availability, BookingRequest,
};
pub use error::EngineError;
pub use interval::{AvailabilityWindow, BookedInterval, BookingStatus, TimeInterval};
pub use overlap::has_overlap;
pub use schedule::{Business, OperatingHours, ScheduleQuery, Service, StaffMember};
pub use slots::generate_slots;
pub use store::{Datastore, InMemoryStore, Snapshot};
