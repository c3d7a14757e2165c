//! Seed data for scenario tests.
//!
//! A small motel: rooms 101 and 102 available, 103 under maintenance, a
//! 50.00 / 3h stay type, one retail article and the standard instrument
//! catalog. `open_desk` additionally opens a shift at [`TEST_RATE`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mfd_settlement::{
    Article, CheckinRequest, FrontDeskAdmin, GuestDetails, Money, NewShift, PaymentEntry,
    PaymentInstrument, Rate, Room, RoomState, StayType,
};

use crate::MemoryStore;

/// Local units per foreign unit for the fixture shift.
pub const TEST_RATE: i64 = 40;

pub struct DeskFixture {
    pub store: MemoryStore,
    pub user: Uuid,
    pub shift_type_id: Uuid,
    pub shift_id: Option<Uuid>,
    pub room_101: Uuid,
    pub room_102: Uuid,
    pub room_maintenance: Uuid,
    pub short_stay: Uuid,
    pub retired_stay: Uuid,
    pub soda: Uuid,
}

impl DeskFixture {
    /// Seeded catalog, no shift open.
    pub async fn closed_desk() -> Self {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let shift_type_id = Uuid::new_v4();
        let room_101 = Uuid::new_v4();
        let room_102 = Uuid::new_v4();
        let room_maintenance = Uuid::new_v4();
        let short_stay = Uuid::new_v4();
        let retired_stay = Uuid::new_v4();
        let soda = Uuid::new_v4();

        store
            .with_state(|s| {
                s.shift_types.insert(shift_type_id, true);

                for (id, number, state) in [
                    (room_101, "101", RoomState::Available),
                    (room_102, "102", RoomState::Available),
                    (room_maintenance, "103", RoomState::Maintenance),
                ] {
                    s.rooms.insert(
                        id,
                        Room {
                            room_id: id,
                            number: number.to_string(),
                            state,
                            active: true,
                        },
                    );
                }

                s.stay_types.insert(
                    short_stay,
                    StayType {
                        stay_type_id: short_stay,
                        name: "Short stay".to_string(),
                        price: units(50),
                        duration_hours: 3,
                        active: true,
                    },
                );
                s.stay_types.insert(
                    retired_stay,
                    StayType {
                        stay_type_id: retired_stay,
                        name: "Retired".to_string(),
                        price: units(80),
                        duration_hours: 6,
                        active: false,
                    },
                );

                for (code, name, active) in [
                    ("CASH", "Cash", true),
                    ("CARD", "Card", true),
                    ("TRANSFER", "Bank transfer", true),
                    ("CASH_USD", "Cash (foreign currency)", true),
                    ("CHEQUE", "Cheque", false),
                ] {
                    s.instruments.insert(
                        code.to_string(),
                        PaymentInstrument {
                            instrument_id: Uuid::new_v4(),
                            code: code.to_string(),
                            name: name.to_string(),
                            active,
                        },
                    );
                }

                s.articles.insert(
                    soda,
                    Article {
                        article_id: soda,
                        name: "Soda".to_string(),
                        unit_price: units(10),
                        tax_percent: Rate::from_micros(16_000_000),
                        stock: 5,
                        active: true,
                    },
                );
            })
            .await;

        Self {
            store,
            user,
            shift_type_id,
            shift_id: None,
            room_101,
            room_102,
            room_maintenance,
            short_stay,
            retired_stay,
            soda,
        }
    }

    /// Seeded catalog with a shift opened at `now` (which also records the
    /// day's first rate sample).
    pub async fn open_desk(now: DateTime<Utc>) -> Self {
        let mut fx = Self::closed_desk().await;
        let shift = fx
            .store
            .open_shift(&NewShift {
                shift_id: Uuid::new_v4(),
                shift_type_id: fx.shift_type_id,
                opened_by: fx.user,
                work_date: now.date_naive(),
                opening_cash: units(500),
                opening_foreign: Money::ZERO,
                exchange_rate: Rate::from_micros(TEST_RATE * 1_000_000),
                opened_at_utc: now,
            })
            .await
            .expect("fixture shift opens");
        fx.shift_id = Some(shift.shift_id);
        fx
    }

    pub fn checkin(&self, room_id: Uuid, document: &str, payments: Vec<PaymentEntry>) -> CheckinRequest {
        CheckinRequest::new(room_id, self.short_stay, guest(document), payments, self.user, None)
            .expect("fixture check-in request is valid")
    }
}

fn units(n: i64) -> Money {
    Money::from_micros(n * 1_000_000)
}

fn parse(amount: &str) -> Money {
    Money::parse(amount).expect("fixture amount parses")
}

pub fn guest(document: &str) -> GuestDetails {
    GuestDetails::new(document, "Ana Ruiz", Some("555-0101")).expect("fixture guest is valid")
}

pub fn cash(amount: &str) -> PaymentEntry {
    PaymentEntry::local("CASH", parse(amount)).expect("fixture payment is valid")
}

pub fn card(amount: &str, reference: &str) -> PaymentEntry {
    PaymentEntry::new("CARD", parse(amount), false, None, Some(reference))
        .expect("fixture payment is valid")
}

pub fn usd(amount: &str) -> PaymentEntry {
    PaymentEntry::foreign("CASH_USD", parse(amount)).expect("fixture payment is valid")
}
