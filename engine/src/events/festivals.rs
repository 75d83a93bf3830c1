//! Festival-calendar mission templates.
//!
//! A static annual calendar filtered to a short lookahead window against
//! the injected clock. Each hit produces one template with a fixed
//! duration and impact vector; the dates are deliberately simplified
//! (training content, not an astronomical almanac).

use super::{EventSource, MissionTemplate, SourceError};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate};
use dropsim_core::environment::Clock;
use dropsim_core::impact::{ImpactVector, KpiDimension};
use dropsim_core::types::{EventOrigin, ImpactKind, Money};
use std::sync::Arc;

/// Days ahead (inclusive of today) a festival shows up in the pool.
const LOOKAHEAD_DAYS: i64 = 7;

struct FestivalEntry {
    name: &'static str,
    month: u32,
    day: u32,
    location: &'static str,
    duration_days: i64,
    cost_dollars: u64,
    expenses_percent: i32,
    satisfaction_percent: i32,
}

const CALENDAR: &[FestivalEntry] = &[
    FestivalEntry {
        name: "Lunar New Year",
        month: 1,
        day: 29,
        location: "Shenzhen",
        duration_days: 7,
        cost_dollars: 250,
        expenses_percent: 20,
        satisfaction_percent: -10,
    },
    FestivalEntry {
        name: "Holi",
        month: 3,
        day: 14,
        location: "Delhi",
        duration_days: 3,
        cost_dollars: 120,
        expenses_percent: 10,
        satisfaction_percent: -5,
    },
    FestivalEntry {
        name: "Songkran",
        month: 4,
        day: 13,
        location: "Bangkok",
        duration_days: 4,
        cost_dollars: 140,
        expenses_percent: 12,
        satisfaction_percent: -5,
    },
    FestivalEntry {
        name: "Golden Week",
        month: 10,
        day: 1,
        location: "Shenzhen",
        duration_days: 7,
        cost_dollars: 220,
        expenses_percent: 18,
        satisfaction_percent: -8,
    },
    FestivalEntry {
        name: "Diwali",
        month: 10,
        day: 21,
        location: "Mumbai",
        duration_days: 5,
        cost_dollars: 180,
        expenses_percent: 15,
        satisfaction_percent: -8,
    },
    FestivalEntry {
        name: "Christmas",
        month: 12,
        day: 25,
        location: "London",
        duration_days: 5,
        cost_dollars: 200,
        expenses_percent: 15,
        satisfaction_percent: -10,
    },
];

/// The festival-calendar event source.
pub struct FestivalEventSource {
    clock: Arc<dyn Clock>,
}

impl FestivalEventSource {
    /// Creates a source reading "today" from the injected clock.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Days from `today` until the entry's next occurrence, handling the
    /// year wrap (a late-December lookahead sees January festivals).
    fn days_until(today: NaiveDate, month: u32, day: u32) -> Option<i64> {
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day)?;
        if this_year >= today {
            return Some((this_year - today).num_days());
        }
        let next_year = NaiveDate::from_ymd_opt(today.year() + 1, month, day)?;
        Some((next_year - today).num_days())
    }
}

#[async_trait]
impl EventSource for FestivalEventSource {
    fn name(&self) -> &'static str {
        "festival-calendar"
    }

    async fn poll(&self, _locations: &[String]) -> Result<Vec<MissionTemplate>, SourceError> {
        let today = self.clock.now().date_naive();

        let mut templates = Vec::new();
        for entry in CALENDAR {
            let Some(days) = Self::days_until(today, entry.month, entry.day) else {
                continue;
            };
            if !(0..=LOOKAHEAD_DAYS).contains(&days) {
                continue;
            }

            templates.push(MissionTemplate {
                title: format!("{} shuts suppliers in {}", entry.name, entry.location),
                description: format!(
                    "{} begins in {days} day(s); supplier and courier capacity around {} \
                     will be reduced for about {} days.",
                    entry.name, entry.location, entry.duration_days
                ),
                kind: ImpactKind::Festival,
                origin: EventOrigin::FestivalCalendar,
                duration: Duration::days(entry.duration_days),
                cost_to_solve: Money::from_dollars(entry.cost_dollars),
                impact: ImpactVector::new()
                    .with(KpiDimension::Expenses, entry.expenses_percent)
                    .with(
                        KpiDimension::Informational("customer_satisfaction".into()),
                        entry.satisfaction_percent,
                    ),
                location: Some(entry.location.to_string()),
                source_url: None,
            });
        }
        Ok(templates)
    }
}
