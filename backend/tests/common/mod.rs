//! Fixtures shared by the workflow tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use shared::store::{Action, Snapshot};
use shared::{Actor, NewProduct, ReferenceEntry, ReferenceKind, StockPolicy, UserRole};
use uuid::Uuid;

pub fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

/// 2026-10-17 09:mm:ss UTC
pub fn at(minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 17, 9, minute, second).unwrap()
}

pub fn manager() -> Actor {
    Actor::new(Uuid::from_u128(1), "Manon", UserRole::Manager)
}

pub fn requester() -> Actor {
    Actor::new(Uuid::from_u128(2), "Lucas", UserRole::User)
}

pub fn other_requester() -> Actor {
    Actor::new(Uuid::from_u128(3), "Inès", UserRole::User)
}

pub struct Fixture {
    pub snapshot: Snapshot,
    pub category_id: Uuid,
    pub unit_id: Uuid,
    pub zone_id: Uuid,
}

fn entry(name: &str) -> ReferenceEntry {
    ReferenceEntry {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: None,
        created_at: at(0, 0),
    }
}

/// Snapshot holding one category, one unit and one storage zone
pub fn fixture(policy: StockPolicy) -> Fixture {
    let category = entry("Mécanique");
    let unit = entry("pièce");
    let zone = entry("A");
    let (category_id, unit_id, zone_id) = (category.id, unit.id, zone.id);

    let mut snapshot = Snapshot::with_policy(policy);
    for (kind, entry) in [
        (ReferenceKind::Category, category),
        (ReferenceKind::Unit, unit),
        (ReferenceKind::StorageZone, zone),
    ] {
        snapshot = snapshot
            .apply(&Action::AddReference { kind, entry }, &manager(), at(0, 0))
            .unwrap();
    }

    Fixture {
        snapshot,
        category_id,
        unit_id,
        zone_id,
    }
}

impl Fixture {
    pub fn new_product(&self, designation: &str, stock: Decimal, min: Decimal, max: Decimal) -> NewProduct {
        NewProduct {
            reference: None,
            designation: designation.to_string(),
            category_id: self.category_id,
            unit_id: self.unit_id,
            storage_zone_id: Some(self.zone_id),
            shelf: Some("3".to_string()),
            position: Some("12".to_string()),
            current_stock: stock,
            min_stock: min,
            max_stock: max,
            unit_price: None,
            supplier_links: vec![],
        }
    }

    /// Add a product and return its id
    pub fn add_product(&mut self, designation: &str, stock: Decimal, min: Decimal, max: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        let input = self.new_product(designation, stock, min, max);
        self.apply(Action::CreateProduct { id, input }, &manager(), at(0, 0));
        id
    }

    pub fn apply(&mut self, action: Action, actor: &Actor, now: DateTime<Utc>) {
        self.snapshot = self.snapshot.apply(&action, actor, now).unwrap();
    }

    pub fn stock(&self, product_id: Uuid) -> Decimal {
        self.snapshot.product(product_id).unwrap().current_stock
    }
}
