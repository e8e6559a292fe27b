pub const CREATE_CLICKS: &str = r#"
CREATE TABLE IF NOT EXISTS clicks (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  x           INTEGER NOT NULL,
  y           INTEGER NOT NULL,
  viewport_w  INTEGER NOT NULL,
  viewport_h  INTEGER NOT NULL,
  url         TEXT NOT NULL CHECK (length(url) <= 512),
  timestamp   TEXT NOT NULL
);
"#;

pub const INDEX_CLICKS_URL: &str = "CREATE INDEX IF NOT EXISTS idx_clicks_url ON clicks(url);";

/// Mirrors the CHECK constraint on `clicks.url`.
#[cfg(test)]
pub const MAX_URL_LENGTH: usize = 512;

pub fn schema_statements() -> Vec<&'static str> {
    vec![CREATE_CLICKS, INDEX_CLICKS_URL]
}
