//! SQLite schema definition.

/// Complete database schema for the dental chart engine.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    clinic_id TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_clinic ON patients(clinic_id);

-- ============================================================================
-- Catalogs (shared reference data)
-- ============================================================================

CREATE TABLE IF NOT EXISTS condition_catalog (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    color_code TEXT,
    icon TEXT,
    is_standard INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS procedure_catalog (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    default_price_cents INTEGER NOT NULL CHECK (default_price_cents >= 0),
    duration_minutes INTEGER NOT NULL DEFAULT 30,
    is_standard INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_procedure_catalog_category ON procedure_catalog(category);

-- ============================================================================
-- Chart state (mutable projection of history)
-- ============================================================================

-- Tooth identities are 1-32 or A-T. Dentition is never stored; it is implied
-- by the identity format.
CREATE TABLE IF NOT EXISTS tooth_conditions (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    tooth_number TEXT NOT NULL CHECK (
        tooth_number GLOB '[A-T]'
        OR (tooth_number NOT GLOB '*[^0-9]*' AND CAST(tooth_number AS INTEGER) BETWEEN 1 AND 32)
    ),
    catalog_condition_id INTEGER REFERENCES condition_catalog(id),
    custom_name TEXT,
    custom_code TEXT,
    custom_description TEXT,
    surface TEXT NOT NULL CHECK (surface <> ''),
    severity TEXT CHECK (severity IS NULL OR severity IN ('mild', 'moderate', 'severe')),
    notes TEXT,
    created_by TEXT NOT NULL,
    created_by_name TEXT,
    created_at TEXT NOT NULL,
    updated_by TEXT,
    updated_by_name TEXT,
    updated_at TEXT,
    CHECK (
        (catalog_condition_id IS NOT NULL AND custom_name IS NULL)
        OR (catalog_condition_id IS NULL AND custom_name IS NOT NULL AND custom_code IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_conditions_patient ON tooth_conditions(patient_id, tooth_number);

-- NULL tooth_number marks a general (whole-mouth) procedure.
CREATE TABLE IF NOT EXISTS tooth_procedures (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    tooth_number TEXT CHECK (
        tooth_number IS NULL
        OR tooth_number GLOB '[A-T]'
        OR (tooth_number NOT GLOB '*[^0-9]*' AND CAST(tooth_number AS INTEGER) BETWEEN 1 AND 32)
    ),
    catalog_procedure_id INTEGER REFERENCES procedure_catalog(id),
    custom_name TEXT,
    custom_code TEXT,
    custom_description TEXT,
    surface TEXT NOT NULL CHECK (surface <> ''),
    status TEXT NOT NULL CHECK (status IN ('planned', 'in_progress', 'completed', 'cancelled')),
    price_cents INTEGER CHECK (price_cents IS NULL OR price_cents >= 0),
    date_performed TEXT NOT NULL,
    performed_by TEXT,
    performed_by_name TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT,
    CHECK (
        (catalog_procedure_id IS NOT NULL AND custom_name IS NULL)
        OR (catalog_procedure_id IS NULL AND custom_name IS NOT NULL AND custom_code IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_procedures_patient ON tooth_procedures(patient_id, tooth_number);

-- Progress notes are append-only; they go away only with their procedure.
CREATE TABLE IF NOT EXISTS procedure_notes (
    id TEXT PRIMARY KEY,
    procedure_id TEXT NOT NULL REFERENCES tooth_procedures(id) ON DELETE CASCADE,
    note TEXT NOT NULL,
    appointment_date TEXT NOT NULL,
    created_by TEXT NOT NULL,
    created_by_name TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_notes_procedure ON procedure_notes(procedure_id, appointment_date);

CREATE TRIGGER IF NOT EXISTS procedure_notes_no_update BEFORE UPDATE ON procedure_notes
BEGIN
    SELECT RAISE(ABORT, 'procedure_notes is append-only');
END;

-- ============================================================================
-- Chart History (Append-Only - Immutable after creation)
-- ============================================================================

CREATE TABLE IF NOT EXISTS chart_history (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,       -- insertion order, breaks timestamp ties
    id TEXT NOT NULL UNIQUE,
    patient_id TEXT NOT NULL REFERENCES patients(patient_id),
    tooth_number TEXT,                           -- NULL for general procedures
    action TEXT NOT NULL CHECK (action IN (
        'add_condition', 'update_condition', 'remove_condition',
        'add_procedure', 'update_procedure', 'remove_procedure',
        'add_procedure_note'
    )),
    category TEXT NOT NULL CHECK (category IN ('conditions', 'procedures')),
    details TEXT NOT NULL,                       -- JSON snapshot
    actor_id TEXT NOT NULL,
    actor_name TEXT,
    timestamp TEXT NOT NULL,                     -- fixed-width RFC 3339, UTC
    prev_hash TEXT,
    entry_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_patient_time ON chart_history(patient_id, timestamp, seq);

CREATE TRIGGER IF NOT EXISTS chart_history_no_update BEFORE UPDATE ON chart_history
BEGIN
    SELECT RAISE(ABORT, 'chart_history is append-only');
END;

CREATE TRIGGER IF NOT EXISTS chart_history_no_delete BEFORE DELETE ON chart_history
BEGIN
    SELECT RAISE(ABORT, 'chart_history is append-only');
END;
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO patients (patient_id, clinic_id, name, created_at) VALUES ('p1', 'c1', 'Jane', 'now')",
            [],
        )
        .unwrap();
        conn
    }

    fn insert_history(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            INSERT INTO chart_history (id, patient_id, action, category, details, actor_id, timestamp, entry_hash)
            VALUES (?1, 'p1', 'add_condition', 'conditions', '{}', 'u1', '2024-03-01T10:00:00.000000Z', 'h')
            "#,
            [id],
        )
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_history_append_only() {
        let conn = setup_conn();
        insert_history(&conn, "h1").unwrap();

        let result = conn.execute("UPDATE chart_history SET details = '{\"x\":1}' WHERE id = 'h1'", []);
        assert!(result.is_err());

        let result = conn.execute("DELETE FROM chart_history WHERE id = 'h1'", []);
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM chart_history", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_tooth_number_constraint() {
        let conn = setup_conn();
        let insert = |tooth: &str| {
            conn.execute(
                r#"
                INSERT INTO tooth_conditions (id, patient_id, tooth_number, custom_name, custom_code, surface, created_by, created_at)
                VALUES (?1, 'p1', ?1, 'Wear', 'CUST-1', 'all', 'u1', 'now')
                "#,
                [tooth],
            )
        };

        assert!(insert("14").is_ok());
        assert!(insert("T").is_ok());
        assert!(insert("33").is_err());
        assert!(insert("U").is_err());
        assert!(insert("1A").is_err());
    }

    #[test]
    fn test_reference_shape_constraint() {
        let conn = setup_conn();
        // Neither catalog nor custom reference
        let result = conn.execute(
            r#"
            INSERT INTO tooth_conditions (id, patient_id, tooth_number, surface, created_by, created_at)
            VALUES ('c1', 'p1', '9', 'all', 'u1', 'now')
            "#,
            [],
        );
        assert!(result.is_err());
    }
}
