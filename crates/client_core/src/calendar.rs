//! Calendar page: community events, the user's RSVPs, and the filters and views over them.

use std::{cmp::Ordering, collections::BTreeMap, fmt, sync::Arc};

use chrono::Datelike;
use shared::{
    domain::{EventId, UserId},
    protocol::{Event, Profile, ALWAYS_LISTED_STATE, NATIONWIDE_FILTER},
};
use tracing::{debug, info, warn};

use crate::{
    api::{CivixBackend, Versioned, MAX_CONFLICT_RETRIES},
    error::ClientError,
};

/// Narrows the displayed events to a city or state, or shows the whole country.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventsFilter {
    #[default]
    Nationwide,
    Place(String),
}

impl EventsFilter {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == NATIONWIDE_FILTER {
            EventsFilter::Nationwide
        } else {
            EventsFilter::Place(raw.to_string())
        }
    }

    /// DC events pass every place filter.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventsFilter::Nationwide => true,
            EventsFilter::Place(place) => {
                event.city == *place || event.state == *place || event.state == ALWAYS_LISTED_STATE
            }
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventsFilter::Nationwide => NATIONWIDE_FILTER,
            EventsFilter::Place(place) => place,
        }
    }
}

impl fmt::Display for EventsFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    Mine,
    Community,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarState {
    pub events: Vec<Event>,
    pub my_events: Vec<EventId>,
    pub profile: Profile,
    pub filter: EventsFilter,
    pub layout: Layout,
    pub scope: Scope,
    pub selected: Option<EventId>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ListView<'a> {
    /// Personal scope with nothing on the user's calendar.
    EmptyCalendar,
    Events(Vec<&'a Event>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChoice {
    pub filter: EventsFilter,
    pub selected: bool,
}

pub struct CalendarPage {
    backend: Arc<dyn CivixBackend>,
    user_id: UserId,
    state: CalendarState,
}

impl CalendarPage {
    pub fn new(backend: Arc<dyn CivixBackend>, user_id: UserId) -> Self {
        Self {
            backend,
            user_id,
            state: CalendarState::default(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> &CalendarState {
        &self.state
    }

    /// Loads events, profile and personal calendar together. On failure the previous state
    /// is kept as it was.
    pub async fn fetch_all(&mut self) -> Result<(), ClientError> {
        let user_id = self.user_id;
        let loaded = futures::try_join!(
            self.backend.list_events(),
            self.backend.get_profile(user_id),
            self.backend.get_calendar(user_id),
        );
        match loaded {
            Ok((events, profile, calendar)) => {
                info!(
                    user_id = user_id.0,
                    events = events.len(),
                    attending = calendar.value.events.len(),
                    "calendar: loaded"
                );
                self.state.events = events;
                self.state.profile = profile;
                self.state.my_events = calendar.value.events;
                Ok(())
            }
            Err(err) => {
                err.report("calendar: fetch");
                Err(err)
            }
        }
    }

    /// Marks the user as attending (`add`) or not attending `event_id`, then reloads the page.
    pub async fn toggle_attendance(
        &mut self,
        add: bool,
        event_id: EventId,
    ) -> Result<(), ClientError> {
        if let Err(err) = self.write_attendance(add, event_id).await {
            err.report("calendar: toggle attendance");
            return Err(err);
        }
        // The write landed; a failed reload is already reported and keeps the old state.
        if let Err(err) = self.fetch_all().await {
            debug!(error = %err, "calendar: reload after attendance change failed");
        }
        Ok(())
    }

    async fn write_attendance(&self, add: bool, event_id: EventId) -> Result<(), ClientError> {
        for attempt in 1..=MAX_CONFLICT_RETRIES {
            let Versioned {
                value: mut calendar,
                etag,
            } = self.backend.get_calendar(self.user_id).await?;

            let changed = if add {
                calendar.add(event_id)
            } else {
                calendar.remove(event_id)
            };
            if !changed {
                debug!(
                    user_id = self.user_id.0,
                    event_id = event_id.0,
                    add,
                    "calendar: attendance already in requested state"
                );
                return Ok(());
            }
            calendar.user = self.user_id;

            match self.backend.put_calendar(&calendar, etag.as_deref()).await {
                Ok(()) => {
                    info!(
                        user_id = self.user_id.0,
                        event_id = event_id.0,
                        add,
                        "calendar: attendance updated"
                    );
                    return Ok(());
                }
                Err(err) if err.is_precondition_failed() => {
                    warn!(
                        user_id = self.user_id.0,
                        attempt,
                        "calendar: changed since read, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Err(ClientError::Conflict {
            resource: format!("calendar for user {}", self.user_id),
            attempts: MAX_CONFLICT_RETRIES,
        })
    }

    pub fn change_filter(&mut self, filter: EventsFilter) {
        self.state.filter = filter;
    }

    pub fn change_layout(&mut self, layout: Layout) {
        self.state.layout = layout;
    }

    pub fn change_scope(&mut self, scope: Scope) {
        self.state.scope = scope;
    }

    /// Opens the details of `event_id`, or closes them if they are already open.
    pub fn toggle_event_details(&mut self, event_id: EventId) {
        self.state.selected = match self.state.selected {
            Some(open) if open == event_id => None,
            _ => Some(event_id),
        };
    }

    pub fn selected_event(&self) -> Option<&Event> {
        let selected = self.state.selected?;
        self.state.events.iter().find(|event| event.id == selected)
    }

    pub fn is_attending(&self, event_id: EventId) -> bool {
        self.state.my_events.contains(&event_id)
    }

    pub fn filtered_events(&self) -> Vec<&Event> {
        self.state
            .events
            .iter()
            .filter(|event| self.state.filter.matches(event))
            .collect()
    }

    pub fn visible_events(&self) -> Vec<&Event> {
        let mut events = self.filtered_events();
        if self.state.scope == Scope::Mine {
            events.retain(|event| self.is_attending(event.id));
        }
        events
    }

    pub fn list_view(&self) -> ListView<'_> {
        if self.state.scope == Scope::Mine && self.state.my_events.is_empty() {
            return ListView::EmptyCalendar;
        }
        let mut events = self.visible_events();
        events.sort_by(|a, b| compare_dates(a, b));
        ListView::Events(events)
    }

    /// Visible events grouped by `(year, month)`. Events without a readable date are left out.
    pub fn grid_view(&self) -> BTreeMap<(i32, u32), Vec<&Event>> {
        let mut months: BTreeMap<(i32, u32), Vec<&Event>> = BTreeMap::new();
        for event in self.visible_events() {
            if let Some(at) = event.starts_at() {
                months.entry((at.year(), at.month())).or_default().push(event);
            }
        }
        for events in months.values_mut() {
            events.sort_by(|a, b| compare_dates(a, b));
        }
        months
    }

    /// The profile's city and state plus the nationwide option.
    pub fn filter_choices(&self) -> Vec<FilterChoice> {
        let profile = &self.state.profile;
        [profile.city.as_str(), profile.state.as_str()]
            .into_iter()
            .filter(|place| !place.trim().is_empty())
            .map(EventsFilter::parse)
            .chain(std::iter::once(EventsFilter::Nationwide))
            .map(|filter| FilterChoice {
                selected: filter == self.state.filter,
                filter,
            })
            .collect()
    }
}

/// Earliest first; unreadable dates sort after every readable one.
fn compare_dates(a: &Event, b: &Event) -> Ordering {
    match (a.starts_at(), b.starts_at()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
