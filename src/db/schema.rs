//! Database schema

/// SQL schema for initialization
///
/// Mirrors the remote tables; `pharmacies` and `pharmacy_stock` back the
/// local stand-in for the nearby-pharmacy search procedure.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS conversation_state (
    user_phone TEXT PRIMARY KEY,
    context TEXT NOT NULL,
    options_map TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medicines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    brand_name TEXT NOT NULL,
    generic_name TEXT,
    strength TEXT
);

CREATE INDEX IF NOT EXISTS idx_medicines_brand ON medicines(brand_name);
CREATE INDEX IF NOT EXISTS idx_medicines_generic ON medicines(generic_name);

CREATE TABLE IF NOT EXISTS pharmacies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    pincode TEXT NOT NULL,
    phone TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pharmacies_pincode ON pharmacies(pincode);

CREATE TABLE IF NOT EXISTS pharmacy_stock (
    pharmacy_id INTEGER NOT NULL,
    medicine_id INTEGER NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (pharmacy_id, medicine_id),
    FOREIGN KEY (pharmacy_id) REFERENCES pharmacies(id) ON DELETE CASCADE,
    FOREIGN KEY (medicine_id) REFERENCES medicines(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS chat_history (
    session_id TEXT PRIMARY KEY,
    history TEXT NOT NULL DEFAULT '[]'
);
";

/// Local equivalent of the `get_nearby_pharmacies_sms` procedure
///
/// ?1 medicine fragment (LIKE-escaped), ?2 strength pattern, ?3 pincode.
pub const NEARBY_PHARMACIES: &str = r"
SELECT p.name, p.address, m.brand_name, COALESCE(m.strength, ''), s.stock, p.phone
FROM pharmacy_stock s
JOIN pharmacies p ON p.id = s.pharmacy_id
JOIN medicines m ON m.id = s.medicine_id
WHERE (m.brand_name LIKE '%' || ?1 || '%' ESCAPE '\'
       OR m.generic_name LIKE '%' || ?1 || '%' ESCAPE '\')
  AND COALESCE(m.strength, '') LIKE ?2
  AND p.pincode = ?3
  AND s.stock > 0
ORDER BY s.stock DESC, p.name
";
