use crate::error::{Error, Result};
use crate::i18n::{LabelKey, LocaleCatalog, LocaleEntry};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

/// Read-only connection to a locale package (a SQLite file).
///
/// Expected schema:
/// - `meta(key, value)`, where the row `key = 'identifier'` names the package
/// - `locales(id, lang, code, locked)`
/// - `labels(id, locale, value)`, `locale` referencing `locales.id`
#[derive(Clone, Debug)]
pub struct PackageStore {
    pool: SqlitePool,
}

impl PackageStore {
    /// Open the package at `path` in read-only mode.
    pub async fn open(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| Error::store(format!("unable to connect to the package at {path}"), e))?;

        Ok(Self { pool })
    }

    /// Close the underlying pool; later queries fail with a store error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Package identifier from the `meta` table, if set and non-empty.
    pub async fn identifier(&self) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM meta WHERE key = 'identifier' LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("unable to load the package identifier", e))?;

        let identifier = match row {
            Some(row) => row
                .try_get::<Option<String>, _>("value")
                .map_err(|e| Error::store("unable to load the package identifier", e))?,
            None => None,
        };

        Ok(identifier.filter(|value| !value.is_empty()))
    }

    /// Every locale the package supports.
    pub async fn locales(&self) -> Result<Vec<LocaleEntry>> {
        let rows = sqlx::query("SELECT lang, code, id, locked FROM locales")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("unable to list the package locales", e))?;

        rows.iter()
            .map(locale_from_row)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::store("unable to list the package locales", e))
    }

    /// Labels with the given keys for one locale, in a single query.
    ///
    /// Keys without a row (or with a `NULL` value) are left out.
    pub async fn labels(
        &self,
        locale_id: i64,
        keys: &[LabelKey],
    ) -> Result<HashMap<LabelKey, String>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; keys.len()].join(",");
        let sql = format!(
            "SELECT CAST(id AS TEXT) AS id_text, value FROM labels WHERE locale = ? AND id IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql).bind(locale_id);
        for key in keys {
            query = match key {
                LabelKey::Id(id) => query.bind(*id),
                LabelKey::Name(name) => query.bind(name.as_str()),
            };
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("an error occurred during database transaction", e))?;

        debug!(
            "Loaded {} of {} labels for locale {}",
            rows.len(),
            keys.len(),
            locale_id
        );

        // Column affinity may match a row whose stored type differs from the
        // bound key, so rows are mapped back through the key's text form.
        let mut requested: HashMap<String, Vec<&LabelKey>> = HashMap::with_capacity(keys.len());
        for key in keys {
            requested.entry(key.to_string()).or_default().push(key);
        }

        let mut labels = HashMap::with_capacity(rows.len());
        for row in &rows {
            let Some((id_text, value)) = label_from_row(row)
                .map_err(|e| Error::store("an error occurred during database transaction", e))?
            else {
                continue;
            };
            for key in requested.get(&id_text).into_iter().flatten() {
                labels.insert((*key).clone(), value.clone());
            }
        }
        Ok(labels)
    }

    /// Every label of one locale.
    pub async fn all_labels(&self, locale_id: i64) -> Result<HashMap<LabelKey, String>> {
        let rows =
            sqlx::query("SELECT CAST(id AS TEXT) AS id_text, value FROM labels WHERE locale = ?")
                .bind(locale_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::store("an error occurred during database transaction", e))?;

        let mut labels = HashMap::with_capacity(rows.len());
        for row in &rows {
            let decoded = label_from_row(row)
                .map_err(|e| Error::store("an error occurred during database transaction", e))?;
            if let Some((id_text, value)) = decoded {
                labels.insert(label_key_from_text(id_text), value);
            }
        }
        Ok(labels)
    }
}

#[async_trait]
impl LocaleCatalog for PackageStore {
    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleEntry>> {
        let row = sqlx::query("SELECT lang, code, id, locked FROM locales WHERE code = ? LIMIT 1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("unable to look up the locale", e))?;

        row.as_ref()
            .map(locale_from_row)
            .transpose()
            .map_err(|e| Error::store("unable to look up the locale", e))
    }

    async fn locale_by_language(&self, language: &str) -> Result<Option<LocaleEntry>> {
        let row = sqlx::query("SELECT lang, code, id, locked FROM locales WHERE lang = ? LIMIT 1")
            .bind(language)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::store("unable to look up the locale", e))?;

        row.as_ref()
            .map(locale_from_row)
            .transpose()
            .map_err(|e| Error::store("unable to look up the locale", e))
    }
}

fn locale_from_row(row: &SqliteRow) -> std::result::Result<LocaleEntry, sqlx::Error> {
    Ok(LocaleEntry {
        language: row.try_get("lang")?,
        locale: row.try_get("code")?,
        id: row.try_get("id")?,
        locked: row.try_get::<Option<i64>, _>("locked")?.unwrap_or(0) != 0,
    })
}

/// Row id as text plus its value; rows with a `NULL` id or value yield `None`.
fn label_from_row(row: &SqliteRow) -> std::result::Result<Option<(String, String)>, sqlx::Error> {
    let id_text: Option<String> = row.try_get("id_text")?;
    let value: Option<String> = row.try_get("value")?;
    Ok(id_text.zip(value))
}

/// Canonical integer text becomes an id, anything else a name, whatever
/// storage class the row used.
fn label_key_from_text(id_text: String) -> LabelKey {
    match id_text.parse::<i64>() {
        Ok(id) if id.to_string() == id_text => LabelKey::Id(id),
        _ => LabelKey::Name(id_text),
    }
}
