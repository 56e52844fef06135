//! Kiosk check-in flow
//!
//! A kiosk is a shared tablet at the camp entrance. Its screen state lives
//! on the server so a client cannot skip the onboarding acknowledgements.
//!
//! ```text
//! Locked --SelectCamp--> CampSelected --OpenRoster--> Roster
//! Roster --BeginOnboarding--> Onboarding --Confirm--> Submitted --Next--> Roster
//! Onboarding --Back--> Roster
//! any --Exit--> Locked
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use camp_core::{CampError, CampResult, Id};

/// Sessions idle longer than this are dropped
pub const KIOSK_IDLE_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum KioskState {
    Locked,
    CampSelected {
        camp_id: Id,
        date: NaiveDate,
    },
    Roster {
        camp_id: Id,
        date: NaiveDate,
    },
    Onboarding {
        camp_id: Id,
        date: NaiveDate,
        registration_id: Id,
    },
    Submitted {
        camp_id: Id,
        date: NaiveDate,
        registration_id: Id,
        attendance_id: Id,
    },
}

impl KioskState {
    pub fn name(&self) -> &'static str {
        match self {
            KioskState::Locked => "locked",
            KioskState::CampSelected { .. } => "camp_selected",
            KioskState::Roster { .. } => "roster",
            KioskState::Onboarding { .. } => "onboarding",
            KioskState::Submitted { .. } => "submitted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum KioskEvent {
    SelectCamp {
        camp_id: Id,
        date: NaiveDate,
    },
    OpenRoster,
    BeginOnboarding {
        registration_id: Id,
    },
    Confirm {
        emergency_contact_ok: bool,
        waiver_ok: bool,
    },
    Next,
    Back,
    Exit,
}

impl KioskEvent {
    pub fn name(&self) -> &'static str {
        match self {
            KioskEvent::SelectCamp { .. } => "select_camp",
            KioskEvent::OpenRoster => "open_roster",
            KioskEvent::BeginOnboarding { .. } => "begin_onboarding",
            KioskEvent::Confirm { .. } => "confirm",
            KioskEvent::Next => "next",
            KioskEvent::Back => "back",
            KioskEvent::Exit => "exit",
        }
    }
}

/// Outcome of feeding an event to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskStep {
    Move(KioskState),
    /// Confirmed onboarding: check the camper in, then enter `Submitted`
    CheckIn {
        camp_id: Id,
        date: NaiveDate,
        registration_id: Id,
    },
}

/// Pure transition table; database checks happen in the caller
pub fn next_step(state: &KioskState, event: &KioskEvent) -> CampResult<KioskStep> {
    use KioskState::*;

    let step = match (state, event) {
        (_, KioskEvent::Exit) => KioskStep::Move(Locked),
        (Locked, KioskEvent::SelectCamp { camp_id, date }) => KioskStep::Move(CampSelected {
            camp_id: *camp_id,
            date: *date,
        }),
        (CampSelected { camp_id, date }, KioskEvent::OpenRoster) => KioskStep::Move(Roster {
            camp_id: *camp_id,
            date: *date,
        }),
        (Roster { camp_id, date }, KioskEvent::BeginOnboarding { registration_id }) => {
            KioskStep::Move(Onboarding {
                camp_id: *camp_id,
                date: *date,
                registration_id: *registration_id,
            })
        }
        (
            Onboarding {
                camp_id,
                date,
                registration_id,
            },
            KioskEvent::Confirm {
                emergency_contact_ok,
                waiver_ok,
            },
        ) => {
            if !emergency_contact_ok || !waiver_ok {
                return Err(CampError::bad_request(
                    "Emergency contact and waiver must both be acknowledged",
                ));
            }
            KioskStep::CheckIn {
                camp_id: *camp_id,
                date: *date,
                registration_id: *registration_id,
            }
        }
        (Onboarding { camp_id, date, .. }, KioskEvent::Back)
        | (Submitted { camp_id, date, .. }, KioskEvent::Next) => KioskStep::Move(Roster {
            camp_id: *camp_id,
            date: *date,
        }),
        (state, event) => {
            return Err(CampError::bad_request(format!(
                "Cannot {} while the kiosk is {}",
                event.name(),
                state.name()
            )))
        }
    };
    Ok(step)
}

#[derive(Debug, Clone, Serialize)]
pub struct KioskSession {
    pub id: Uuid,
    /// Licensee the kiosk works for; `None` only for HQ-opened kiosks
    pub tenant_id: Option<Id>,
    pub opened_by: Id,
    #[serde(flatten)]
    pub state: KioskState,
    /// Bumped on every change
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl KioskSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.last_activity > Duration::hours(KIOSK_IDLE_HOURS)
    }
}

/// In-memory kiosk sessions shared by all requests
#[derive(Debug, Default)]
pub struct KioskRegistry {
    sessions: DashMap<Uuid, KioskSession>,
}

impl KioskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, tenant_id: Option<Id>, opened_by: Id, now: DateTime<Utc>) -> KioskSession {
        let session = KioskSession {
            id: Uuid::new_v4(),
            tenant_id,
            opened_by,
            state: KioskState::Locked,
            version: 0,
            created_at: now,
            last_activity: now,
        };
        self.sessions.insert(session.id, session.clone());
        session
    }

    /// Snapshot of a live session; expired sessions are removed
    pub fn get(&self, id: Uuid, now: DateTime<Utc>) -> Option<KioskSession> {
        let session = self.sessions.get(&id).map(|entry| entry.clone())?;
        if session.is_expired(now) {
            self.sessions.remove(&id);
            return None;
        }
        Some(session)
    }

    /// Store `state` if nobody changed the session since `version` was read
    pub fn advance(
        &self,
        id: Uuid,
        version: u64,
        state: KioskState,
        now: DateTime<Utc>,
    ) -> CampResult<KioskSession> {
        let mut entry = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| CampError::not_found("Kiosk", id))?;
        if entry.version != version {
            return Err(CampError::bad_request(
                "The kiosk was updated by another request; reload and retry",
            ));
        }
        entry.state = state;
        entry.version += 1;
        entry.last_activity = now;
        Ok(entry.clone())
    }

    /// Drop idle sessions; returns how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 6).unwrap()
    }

    fn moved(state: &KioskState, event: KioskEvent) -> KioskState {
        match next_step(state, &event).unwrap() {
            KioskStep::Move(next) => next,
            other => panic!("expected a move, got {other:?}"),
        }
    }

    #[test]
    fn test_happy_path() {
        let selected = moved(&KioskState::Locked, KioskEvent::SelectCamp { camp_id: 3, date: day() });
        let roster = moved(&selected, KioskEvent::OpenRoster);
        assert_eq!(roster, KioskState::Roster { camp_id: 3, date: day() });

        let onboarding = moved(&roster, KioskEvent::BeginOnboarding { registration_id: 9 });
        let step = next_step(
            &onboarding,
            &KioskEvent::Confirm {
                emergency_contact_ok: true,
                waiver_ok: true,
            },
        )
        .unwrap();
        assert_eq!(
            step,
            KioskStep::CheckIn {
                camp_id: 3,
                date: day(),
                registration_id: 9
            }
        );

        let submitted = KioskState::Submitted {
            camp_id: 3,
            date: day(),
            registration_id: 9,
            attendance_id: 1,
        };
        assert_eq!(moved(&submitted, KioskEvent::Next), roster);
    }

    #[test]
    fn test_back_and_exit() {
        let onboarding = KioskState::Onboarding {
            camp_id: 3,
            date: day(),
            registration_id: 9,
        };
        assert_eq!(
            moved(&onboarding, KioskEvent::Back),
            KioskState::Roster { camp_id: 3, date: day() }
        );
        assert_eq!(moved(&onboarding, KioskEvent::Exit), KioskState::Locked);
        assert_eq!(moved(&KioskState::Locked, KioskEvent::Exit), KioskState::Locked);
    }

    #[test]
    fn test_out_of_order_events_are_rejected() {
        let err = next_step(&KioskState::Locked, &KioskEvent::OpenRoster).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_string(), "Cannot open_roster while the kiosk is locked");

        let roster = KioskState::Roster { camp_id: 3, date: day() };
        assert!(next_step(&roster, &KioskEvent::Next).is_err());
        assert!(next_step(&roster, &KioskEvent::SelectCamp { camp_id: 4, date: day() }).is_err());
    }

    #[test]
    fn test_confirm_requires_both_acknowledgements() {
        let onboarding = KioskState::Onboarding {
            camp_id: 3,
            date: day(),
            registration_id: 9,
        };
        for (contact, waiver) in [(false, true), (true, false), (false, false)] {
            let event = KioskEvent::Confirm {
                emergency_contact_ok: contact,
                waiver_ok: waiver,
            };
            assert!(next_step(&onboarding, &event).is_err());
        }
    }

    #[test]
    fn test_registry_versions_and_expiry() {
        let registry = KioskRegistry::new();
        let now = Utc::now();
        let session = registry.open(Some(1), 2, now);
        assert_eq!(session.state, KioskState::Locked);

        let selected = KioskState::CampSelected { camp_id: 3, date: day() };
        let updated = registry.advance(session.id, 0, selected.clone(), now).unwrap();
        assert_eq!(updated.version, 1);

        // stale version loses
        assert!(registry.advance(session.id, 0, KioskState::Locked, now).is_err());

        let later = now + Duration::hours(KIOSK_IDLE_HOURS) + Duration::minutes(1);
        assert!(registry.get(session.id, now).is_some());
        assert!(registry.get(session.id, later).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let registry = KioskRegistry::new();
        let now = Utc::now();
        registry.open(Some(1), 2, now - Duration::hours(13));
        registry.open(Some(1), 2, now);
        assert_eq!(registry.purge_expired(now), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_event_json_shape() {
        let event: KioskEvent = serde_json::from_str(
            r#"{"event":"select_camp","camp_id":3,"date":"2026-07-06"}"#,
        )
        .unwrap();
        assert_eq!(event, KioskEvent::SelectCamp { camp_id: 3, date: day() });
    }
}
