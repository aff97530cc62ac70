use crate::errors::{DeskError, DeskResult};
use crate::models::{Deal, ListDealsFilters, PipelineSettings, Stage};
use crate::store::DealStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

const SETTINGS_KEY: &str = "pipeline";

const DEAL_COLUMNS: &str =
    "id, company, amount, raas, owner, product, stage, demo_date, summary, updated_at";

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> DeskResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| DeskError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(DeskError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(DeskError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn insert_deal(&self, deal: &Deal) -> DeskResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO deals (id, company, amount, raas, owner, product, stage, demo_date, summary, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                deal.id,
                deal.company,
                deal.amount,
                deal.raas,
                deal.owner,
                deal.product,
                deal.stage.as_str(),
                deal.demo_date.map(|at| at.to_rfc3339()),
                deal.summary,
                deal.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Upsert, matching the hosted backend's update call. The caller is
    /// responsible for refreshing `updated_at` before persisting.
    pub fn update_deal(&self, deal: &Deal) -> DeskResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO deals (id, company, amount, raas, owner, product, stage, demo_date, summary, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               company = excluded.company,
               amount = excluded.amount,
               raas = excluded.raas,
               owner = excluded.owner,
               product = excluded.product,
               stage = excluded.stage,
               demo_date = excluded.demo_date,
               summary = excluded.summary,
               updated_at = excluded.updated_at",
            params![
                deal.id,
                deal.company,
                deal.amount,
                deal.raas,
                deal.owner,
                deal.product,
                deal.stage.as_str(),
                deal.demo_date.map(|at| at.to_rfc3339()),
                deal.summary,
                deal.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn delete_deal(&self, deal_id: &str) -> DeskResult<bool> {
        let conn = self.lock_conn()?;
        let affected = conn.execute("DELETE FROM deals WHERE id = ?1", [deal_id])?;
        Ok(affected > 0)
    }

    pub fn get_deal(&self, deal_id: &str) -> DeskResult<Option<Deal>> {
        let conn = self.lock_conn()?;
        let deal = conn
            .query_row(
                &format!("SELECT {DEAL_COLUMNS} FROM deals WHERE id = ?1"),
                [deal_id],
                parse_deal_row,
            )
            .optional()?;
        Ok(deal)
    }

    pub fn list_deals(&self, filters: &ListDealsFilters) -> DeskResult<Vec<Deal>> {
        let conn = self.lock_conn()?;
        let mut query = format!("SELECT {DEAL_COLUMNS} FROM deals WHERE 1 = 1");

        let mut params_vec: Vec<String> = Vec::new();

        if let Some(stage) = filters.stage {
            query.push_str(" AND stage = ?");
            params_vec.push(stage.as_str().to_string());
        }
        if let Some(owner) = &filters.owner {
            query.push_str(" AND owner = ?");
            params_vec.push(owner.clone());
        }
        if let Some(product) = &filters.product {
            query.push_str(" AND product = ?");
            params_vec.push(product.clone());
        }
        if let Some(search) = &filters.search {
            query.push_str(" AND company LIKE ?");
            params_vec.push(format!("%{}%", search));
        }

        query.push_str(" ORDER BY updated_at DESC");

        let limit = filters.limit.unwrap_or(500);
        let offset = filters.offset.unwrap_or(0);
        query.push_str(" LIMIT ? OFFSET ?");

        let mut statement = conn.prepare(&query)?;
        let mut dyn_params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|param| param as &dyn rusqlite::ToSql)
            .collect();
        dyn_params.push(&limit);
        dyn_params.push(&offset);

        let rows = statement.query_map(rusqlite::params_from_iter(dyn_params), parse_deal_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    pub fn load_settings(&self) -> DeskResult<PipelineSettings> {
        let conn = self.lock_conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = ?1",
                [SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(PipelineSettings::default()),
        }
    }

    pub fn save_settings(&self, settings: &PipelineSettings) -> DeskResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![
                SETTINGS_KEY,
                serde_json::to_string(settings)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn ensure_default_settings(&self) -> DeskResult<()> {
        let conn = self.lock_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM settings WHERE key = ?1",
            [SETTINGS_KEY],
            |row| row.get(0),
        )?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES (?1, ?2, ?3)",
                params![
                    SETTINGS_KEY,
                    serde_json::to_string(&PipelineSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }

    fn lock_conn(&self) -> DeskResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| DeskError::Internal("database mutex poisoned".to_string()))
    }
}

impl DealStore for Database {
    fn list(&self, filters: &ListDealsFilters) -> DeskResult<Vec<Deal>> {
        self.list_deals(filters)
    }

    fn get(&self, deal_id: &str) -> DeskResult<Option<Deal>> {
        self.get_deal(deal_id)
    }

    fn insert(&self, deal: &Deal) -> DeskResult<()> {
        self.insert_deal(deal)
    }

    fn update(&self, deal: &Deal) -> DeskResult<()> {
        self.update_deal(deal)
    }

    fn delete(&self, deal_id: &str) -> DeskResult<bool> {
        self.delete_deal(deal_id)
    }

    fn load_settings(&self) -> DeskResult<PipelineSettings> {
        Database::load_settings(self)
    }

    fn save_settings(&self, settings: &PipelineSettings) -> DeskResult<()> {
        Database::save_settings(self, settings)
    }
}

fn parse_deal_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Deal> {
    Ok(Deal {
        id: row.get(0)?,
        company: row.get(1)?,
        amount: row.get(2)?,
        raas: row.get(3)?,
        owner: row.get(4)?,
        product: row.get(5)?,
        stage: parse_stage(&row.get::<_, String>(6)?)?,
        demo_date: row
            .get::<_, Option<String>>(7)?
            .map(|raw| parse_time(&raw))
            .transpose()?,
        summary: row.get(8)?,
        updated_at: parse_time(&row.get::<_, String>(9)?)?,
    })
}

fn parse_stage(raw: &str) -> rusqlite::Result<Stage> {
    Stage::parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Unknown stage '{}'", raw),
            )),
        )
    })
}

fn parse_time(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(error),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::models::{Deal, ListDealsFilters, Stage};
    use chrono::{Duration, Utc};

    fn sample_deal(id: &str, stage: Stage) -> Deal {
        Deal {
            id: id.to_string(),
            company: format!("company-{}", id),
            amount: 10_000.0,
            raas: 2_000.0,
            owner: "Hasan".to_string(),
            product: "Kayako".to_string(),
            stage,
            demo_date: None,
            summary: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn deal_round_trips_through_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let mut deal = sample_deal("deal-1", Stage::Demoed);
        deal.demo_date = Some(Utc::now() - Duration::days(3));
        deal.summary = Some("met the CTO".to_string());
        db.insert_deal(&deal).expect("insert");

        let loaded = db.get_deal("deal-1").expect("get").expect("deal exists");
        assert_eq!(loaded.company, deal.company);
        assert_eq!(loaded.stage, Stage::Demoed);
        assert_eq!(loaded.summary.as_deref(), Some("met the CTO"));
        assert!(loaded.demo_date.is_some());
    }

    #[test]
    fn list_is_ordered_by_updated_at_descending() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let now = Utc::now();
        let mut older = sample_deal("older", Stage::Demoed);
        older.updated_at = now - Duration::hours(2);
        let mut newer = sample_deal("newer", Stage::Closing);
        newer.updated_at = now;
        db.insert_deal(&older).expect("insert older");
        db.insert_deal(&newer).expect("insert newer");

        let deals = db.list_deals(&ListDealsFilters::default()).expect("list");
        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].id, "newer");
        assert_eq!(deals[1].id, "older");
    }

    #[test]
    fn filters_narrow_by_stage_owner_and_search() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let mut acme = sample_deal("acme", Stage::Closing);
        acme.company = "Acme Corp".to_string();
        let mut globex = sample_deal("globex", Stage::Demoed);
        globex.company = "Globex".to_string();
        globex.owner = "Jared".to_string();
        db.insert_deal(&acme).expect("insert acme");
        db.insert_deal(&globex).expect("insert globex");

        let closing = db
            .list_deals(&ListDealsFilters {
                stage: Some(Stage::Closing),
                ..Default::default()
            })
            .expect("list closing");
        assert_eq!(closing.len(), 1);
        assert_eq!(closing[0].id, "acme");

        let jared = db
            .list_deals(&ListDealsFilters {
                owner: Some("Jared".to_string()),
                ..Default::default()
            })
            .expect("list jared");
        assert_eq!(jared.len(), 1);
        assert_eq!(jared[0].id, "globex");

        let search = db
            .list_deals(&ListDealsFilters {
                search: Some("cme".to_string()),
                ..Default::default()
            })
            .expect("list search");
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, "acme");
    }

    #[test]
    fn update_moves_stage_and_delete_removes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let deal = sample_deal("deal-1", Stage::Demoed);
        db.insert_deal(&deal).expect("insert");

        let mut moved = deal.clone();
        moved.stage = Stage::Won;
        moved.updated_at = Utc::now();
        db.update_deal(&moved).expect("update");

        let loaded = db.get_deal("deal-1").expect("get").expect("deal exists");
        assert_eq!(loaded.stage, Stage::Won);

        assert!(db.delete_deal("deal-1").expect("delete"));
        assert!(!db.delete_deal("deal-1").expect("second delete"));
        assert!(db.get_deal("deal-1").expect("get").is_none());
    }

    #[test]
    fn default_settings_are_seeded_and_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("test.db")).expect("db");

        let settings = db.load_settings().expect("load settings");
        assert!(settings.owners.iter().any(|owner| owner == "Hasan"));
        assert!(settings.products.iter().any(|product| product == "AI Caller"));
        assert_eq!(settings.stage_percentage(Stage::Closing), 0.5);

        let mut updated = settings.clone();
        updated.owners.push("Priya".to_string());
        db.save_settings(&updated).expect("save settings");

        let reloaded = db.load_settings().expect("reload settings");
        assert!(reloaded.owners.iter().any(|owner| owner == "Priya"));
    }
}
