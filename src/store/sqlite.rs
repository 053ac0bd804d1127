use super::{RecordStore, StoreError, now_rfc3339, resolve};
use crate::catalog::{Catalog, Month};
use crate::dataset::{Cell, DatasetPatch, Field, IndicatorDataset};
use rusqlite::{Connection, Result as SqliteResult, params};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One row per present value; an absent value has no row.
pub struct SqliteStore {
    conn: Connection,
}

struct StoredValue {
    month_id: String,
    cell: Cell,
}

impl SqliteStore {
    /// Open (or create) the database and make sure the schema exists.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;

        // One row per (project, month) that has been saved at least once
        conn.execute(
            "CREATE TABLE IF NOT EXISTS datasets (
                project_id TEXT NOT NULL,
                month_id TEXT NOT NULL,
                last_updated TEXT NOT NULL,
                PRIMARY KEY (project_id, month_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS indicator_values (
                project_id TEXT NOT NULL,
                month_id TEXT NOT NULL,
                indicator TEXT NOT NULL,
                contract_id TEXT NOT NULL,
                field TEXT NOT NULL CHECK (field IN ('value', 'planned', 'actual')),
                value REAL NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (project_id, month_id, indicator, contract_id, field)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_values_project ON indicator_values(project_id)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    fn last_updated(&self, project_id: &str, month_id: &str) -> SqliteResult<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT last_updated FROM datasets WHERE project_id = ?1 AND month_id = ?2")?;
        let mut rows = stmt.query(params![project_id, month_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// All stored values of a project, optionally limited to one month.
    fn values_for(
        &self,
        project_id: &str,
        month_id: Option<&str>,
    ) -> SqliteResult<Vec<StoredValue>> {
        let mut stmt = self.conn.prepare(
            "SELECT month_id, indicator, contract_id, field, value
             FROM indicator_values
             WHERE project_id = ?1 AND (?2 IS NULL OR month_id = ?2)",
        )?;
        let rows = stmt.query_map(params![project_id, month_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (month_id, indicator, contract, field, value) = row?;
            let Some(field) = Field::parse(&field) else {
                warn!(field = %field, "Skipping row with unknown field");
                continue;
            };
            out.push(StoredValue {
                month_id,
                cell: Cell {
                    indicator,
                    contract,
                    field,
                    value,
                },
            });
        }
        Ok(out)
    }
}

impl RecordStore for SqliteStore {
    fn load(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
    ) -> Result<IndicatorDataset, StoreError> {
        let project = resolve(catalog, project_id, month_id)?;
        let mut dataset = IndicatorDataset::empty(project, month_id, catalog);
        for stored in self.values_for(project_id, Some(month_id))? {
            dataset.apply(&stored.cell);
        }
        dataset.last_updated = self.last_updated(project_id, month_id)?;
        Ok(dataset)
    }

    fn save(
        &self,
        catalog: &Catalog,
        project_id: &str,
        month_id: &str,
        patch: &DatasetPatch,
    ) -> Result<IndicatorDataset, StoreError> {
        let project = resolve(catalog, project_id, month_id)?;
        let cells = patch.cells(project, catalog);
        let now = now_rfc3339()?;

        let tx = self.conn.unchecked_transaction()?;
        for cell in &cells {
            tx.execute(
                "INSERT INTO indicator_values
                    (project_id, month_id, indicator, contract_id, field, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(project_id, month_id, indicator, contract_id, field) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at",
                params![
                    project_id,
                    month_id,
                    cell.indicator,
                    cell.contract,
                    cell.field.as_str(),
                    cell.value,
                    now,
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO datasets (project_id, month_id, last_updated)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(project_id, month_id) DO UPDATE SET last_updated = excluded.last_updated",
            params![project_id, month_id, now],
        )?;
        tx.commit()?;

        info!(project = %project_id, month = %month_id, values = cells.len(), "Dataset saved");
        self.load(catalog, project_id, month_id)
    }

    fn load_all(
        &self,
        catalog: &Catalog,
        project_id: &str,
        months: &[Month],
    ) -> Result<Vec<IndicatorDataset>, StoreError> {
        let mut by_month: HashMap<String, Vec<Cell>> = HashMap::new();
        for stored in self.values_for(project_id, None)? {
            by_month.entry(stored.month_id).or_default().push(stored.cell);
        }

        let mut out = Vec::with_capacity(months.len());
        for month in months {
            let project = resolve(catalog, project_id, &month.id)?;
            let mut dataset = IndicatorDataset::empty(project, &month.id, catalog);
            for cell in by_month.get(&month.id).into_iter().flatten() {
                dataset.apply(cell);
            }
            dataset.last_updated = self.last_updated(project_id, &month.id)?;
            out.push(dataset);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MANHOURS;
    use crate::dataset::PlannedActual;
    use crate::store::test_support::catalog;

    fn store() -> SqliteStore {
        SqliteStore::new(":memory:").unwrap()
    }

    #[test]
    fn missing_record_loads_empty() {
        let catalog = catalog();
        let ds = store().load(&catalog, "chenda", "Mar-26").unwrap();
        assert!(ds.cells().is_empty());
        assert_eq!(ds.last_updated, None);
        assert_eq!(ds.indicators.len(), 18);
    }

    #[test]
    fn save_merges_per_contract() {
        let catalog = catalog();
        let store = store();

        let mut a = DatasetPatch::default();
        a.set_single(MANHOURS, "A", 500.0);
        store.save(&catalog, "chenda", "Mar-26", &a).unwrap();

        let mut b = DatasetPatch::default();
        b.set_single(MANHOURS, "B", 300.0);
        b.set_pair(
            "HSSE Audit",
            "B",
            PlannedActual {
                planned: None,
                actual: Some(1.0),
            },
        );
        let saved = store.save(&catalog, "chenda", "Mar-26", &b).unwrap();

        assert_eq!(saved.single(MANHOURS, "A"), Some(500.0));
        assert_eq!(saved.single(MANHOURS, "B"), Some(300.0));
        assert_eq!(saved.pair("HSSE Audit", "B").actual, Some(1.0));
        assert!(saved.last_updated.is_some());

        let reloaded = store.load(&catalog, "chenda", "Mar-26").unwrap();
        assert_eq!(reloaded, saved);
    }

    #[test]
    fn same_cell_is_last_write_wins() {
        let catalog = catalog();
        let store = store();
        for v in [10.0, 20.0] {
            let mut p = DatasetPatch::default();
            p.set_single("Fatality", "A", v);
            store.save(&catalog, "chenda", "Apr-26", &p).unwrap();
        }
        let ds = store.load(&catalog, "chenda", "Apr-26").unwrap();
        assert_eq!(ds.single("Fatality", "A"), Some(20.0));
    }

    #[test]
    fn load_all_keeps_month_order_and_fills_gaps() {
        let catalog = catalog();
        let store = store();
        let mut p = DatasetPatch::default();
        p.set_single(MANHOURS, "A", 42.0);
        store.save(&catalog, "chenda", "Apr-26", &p).unwrap();

        let all = store.load_all(&catalog, "chenda", &catalog.months).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].month_id, "Mar-26");
        assert!(all[0].cells().is_empty());
        assert_eq!(all[1].single(MANHOURS, "A"), Some(42.0));
    }

    #[test]
    fn unknown_project_or_month_is_not_found() {
        let catalog = catalog();
        let store = store();
        assert!(matches!(
            store.load(&catalog, "nowhere", "Mar-26"),
            Err(StoreError::UnknownProject(_))
        ));
        assert!(matches!(
            store.save(&catalog, "chenda", "Jan-99", &DatasetPatch::default()),
            Err(StoreError::UnknownMonth(_))
        ));
    }
}
