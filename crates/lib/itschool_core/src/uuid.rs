// Helper for generating UUIDv7 (timestamp-sortable UUIDs).
//
// Session rows are generated app-side as v7 so they sort by creation time.
// Users and roles keep PG's gen_random_uuid() (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
