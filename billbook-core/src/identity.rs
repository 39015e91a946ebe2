//! Identity types for Billbook entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Untyped entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Generate a new UUIDv7 EntityId (timestamp-sortable).
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Common behaviour of the strongly-typed entity IDs.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// Return the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh UUIDv7-backed ID.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The nil ID, used as a placeholder in fixtures.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a business (the owning scope of every other entity).
    BusinessId
);
define_entity_id!(
    /// Identifier of a customer or supplier.
    PartyId
);
define_entity_id!(
    /// Identifier of an inventory item.
    ItemId
);
define_entity_id!(
    /// Identifier of a sales or purchase invoice.
    InvoiceId
);
define_entity_id!(
    /// Identifier of a payment.
    PaymentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_id_roundtrips_through_string() {
        let id = PartyId::now_v7();
        let parsed: PartyId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_typed_id_serializes_as_bare_uuid() {
        let uuid = Uuid::now_v7();
        let id = BusinessId::new(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }

    #[test]
    fn test_nil_id() {
        assert_eq!(ItemId::nil().as_uuid(), Uuid::nil());
    }
}
