//! Reference records owned by the datastore: businesses, services and staff.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::interval::{hhmm, whole_minute, TimeInterval};

pub type BusinessId = u32;
pub type ServiceId = u32;
pub type StaffId = u32;
pub type BookingId = u64;

/// Daily operating window `[opening, closing)` of a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHours")]
pub struct OperatingHours {
    #[serde(with = "hhmm")]
    opening: NaiveTime,
    #[serde(with = "hhmm")]
    closing: NaiveTime,
}

#[derive(Deserialize)]
struct RawHours {
    #[serde(with = "hhmm")]
    opening: NaiveTime,
    #[serde(with = "hhmm")]
    closing: NaiveTime,
}

impl TryFrom<RawHours> for OperatingHours {
    type Error = EngineError;

    fn try_from(raw: RawHours) -> Result<Self> {
        OperatingHours::new(raw.opening, raw.closing)
    }
}

impl OperatingHours {
    /// # Errors
    /// Returns `EngineError::InvalidInput` unless `opening < closing` and both
    /// fall on a whole minute.
    pub fn new(opening: NaiveTime, closing: NaiveTime) -> Result<Self> {
        whole_minute(opening)?;
        whole_minute(closing)?;
        if opening >= closing {
            return Err(EngineError::InvalidInput(format!(
                "opening {} must be before closing {}",
                opening.format("%H:%M"),
                closing.format("%H:%M")
            )));
        }
        Ok(Self { opening, closing })
    }

    pub fn opening(&self) -> NaiveTime {
        self.opening
    }

    pub fn closing(&self) -> NaiveTime {
        self.closing
    }

    pub fn as_interval(&self) -> TimeInterval {
        TimeInterval::from_ordered(self.opening, self.closing)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub slug: String,
    pub name: String,
    pub hours: OperatingHours,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub business_id: BusinessId,
    pub name: String,
    pub duration_minutes: i64,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub business_id: BusinessId,
    pub name: String,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

/// Which business, which day, and how long the requested service takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleQuery {
    pub business_id: BusinessId,
    pub date: NaiveDate,
    pub service_duration_minutes: i64,
}

impl ScheduleQuery {
    pub fn for_service(service: &Service, date: NaiveDate) -> Self {
        Self {
            business_id: service.business_id,
            date,
            service_duration_minutes: service.duration_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_must_open_before_closing() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let five = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert!(OperatingHours::new(nine, five).is_ok());
        assert!(OperatingHours::new(five, nine).is_err());
        assert!(OperatingHours::new(nine, nine).is_err());

        let nine_thirty_secs = NaiveTime::from_hms_opt(9, 0, 30).unwrap();
        assert!(OperatingHours::new(nine_thirty_secs, five).is_err());
    }

    #[test]
    fn business_deserializes_with_hh_mm_hours() {
        let json = r#"{"id":1,"slug":"corte-fino","name":"Corte Fino","hours":{"opening":"09:00","closing":"18:00"}}"#;
        let business: Business = serde_json::from_str(json).unwrap();
        assert_eq!(business.hours.opening(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(business.hours.closing(), NaiveTime::from_hms_opt(18, 0, 0).unwrap());

        let inverted = r#"{"id":1,"slug":"x","name":"X","hours":{"opening":"18:00","closing":"09:00"}}"#;
        assert!(serde_json::from_str::<Business>(inverted).is_err());
    }

    #[test]
    fn services_and_staff_default_to_active() {
        let service: Service =
            serde_json::from_str(r#"{"id":2,"business_id":1,"name":"Haircut","duration_minutes":30}"#).unwrap();
        assert!(service.active);

        let query = ScheduleQuery::for_service(&service, NaiveDate::from_ymd_opt(2026, 3, 16).unwrap());
        assert_eq!(query.business_id, 1);
        assert_eq!(query.service_duration_minutes, 30);
    }
}
