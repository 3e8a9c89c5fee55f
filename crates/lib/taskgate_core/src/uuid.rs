// Identifiers are generated app-side as UUIDv7 strings so that rows sort by
// creation time regardless of the backing store. Stores treat them as opaque.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new opaque identifier string.
pub fn new_id() -> String {
    uuidv7().to_string()
}
