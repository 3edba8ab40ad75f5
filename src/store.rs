//! SQLite record store for assets, risks, treatments, and residuals.
//!
//! Thin persistence collaborator: lookup-by-key, filter-by-state, upsert
//! semantics, and the dashboard aggregation queries. Every multi-step
//! mutation runs inside a transaction so a failed validation never leaves
//! a partially updated record.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{CidScanError, CidScanResult};
use crate::lifecycle;
use crate::models::{Asset, Residual, Risk, RiskState, StateCounts, TopRisk, Treatment};

pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> CidScanResult<Self> {
        log::debug!("Opening record store at {:?}", path);
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> CidScanResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS assets (
                id INTEGER PRIMARY KEY,
                address TEXT NOT NULL UNIQUE,
                hostname TEXT NOT NULL,
                location TEXT NOT NULL,
                asset_type TEXT NOT NULL,
                description TEXT NOT NULL,
                sensitivity TEXT NOT NULL,
                criticality INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS risks (
                id INTEGER PRIMARY KEY,
                asset_id INTEGER NOT NULL REFERENCES assets(id),
                threat TEXT NOT NULL,
                vulnerability TEXT NOT NULL,
                existing_control TEXT NOT NULL,
                probability INTEGER NOT NULL,
                impact INTEGER NOT NULL,
                inherent_score INTEGER NOT NULL,
                state TEXT NOT NULL,
                observations TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS treatments (
                id INTEGER PRIMARY KEY,
                risk_id INTEGER NOT NULL REFERENCES risks(id),
                strategy TEXT NOT NULL,
                control_ref TEXT NOT NULL,
                proposed_control TEXT NOT NULL,
                responsible TEXT NOT NULL,
                target_date TEXT NOT NULL,
                control_status TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS residuals (
                risk_id INTEGER PRIMARY KEY REFERENCES risks(id),
                probability INTEGER NOT NULL,
                impact INTEGER NOT NULL,
                score INTEGER NOT NULL,
                evaluated_at TEXT NOT NULL
            );",
        )
    }

    // ---- assets ----

    /// Insert a new asset or update the existing row with the same
    /// address. Re-scans refresh classification in place; duplicate
    /// addresses are policy, not an error.
    pub fn upsert_asset(&mut self, asset: &Asset) -> CidScanResult<Asset> {
        let tx = self.conn.transaction()?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM assets WHERE address = ?1",
                params![asset.address],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE assets SET hostname = ?1, asset_type = ?2, description = ?3,
                            sensitivity = ?4, criticality = ?5
                     WHERE id = ?6",
                    params![
                        asset.hostname,
                        asset.asset_type.as_str(),
                        asset.description,
                        asset.sensitivity.as_str(),
                        asset.criticality,
                        id
                    ],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO assets (address, hostname, location, asset_type, description,
                                         sensitivity, criticality, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        asset.address,
                        asset.hostname,
                        asset.location,
                        asset.asset_type.as_str(),
                        asset.description,
                        asset.sensitivity.as_str(),
                        asset.criticality,
                        asset.created_at.to_rfc3339()
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };
        tx.commit()?;
        self.get_asset(id)
    }

    pub fn get_asset(&self, id: i64) -> CidScanResult<Asset> {
        self.conn
            .query_row("SELECT * FROM assets WHERE id = ?1", params![id], asset_from_row)
            .optional()?
            .ok_or_else(|| CidScanError::not_found("asset", id))
    }

    pub fn get_asset_by_address(&self, address: &str) -> CidScanResult<Option<Asset>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM assets WHERE address = ?1",
                params![address],
                asset_from_row,
            )
            .optional()?)
    }

    pub fn list_assets(&self) -> CidScanResult<Vec<Asset>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM assets ORDER BY created_at DESC, id DESC")?;
        let rows = stmt.query_map([], asset_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn asset_count(&self) -> CidScanResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM assets", [], |row| row.get(0))?)
    }

    /// Persist an administrative re-valuation of one asset, keeping the
    /// criticality column consistent with the supplied weights.
    pub fn set_asset_valuation(&mut self, asset_id: i64, criticality: i64) -> CidScanResult<()> {
        let changed = self.conn.execute(
            "UPDATE assets SET criticality = ?1 WHERE id = ?2",
            params![criticality, asset_id],
        )?;
        if changed == 0 {
            return Err(CidScanError::not_found("asset", asset_id));
        }
        Ok(())
    }

    // ---- risks ----

    /// Insert a risk after verifying its owning asset exists.
    pub fn insert_risk(&mut self, risk: &Risk) -> CidScanResult<Risk> {
        let tx = self.conn.transaction()?;
        let asset_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM assets WHERE id = ?1",
                params![risk.asset_id],
                |row| row.get(0),
            )
            .optional()?;
        if asset_exists.is_none() {
            return Err(CidScanError::not_found("asset", risk.asset_id));
        }

        tx.execute(
            "INSERT INTO risks (asset_id, threat, vulnerability, existing_control, probability,
                                impact, inherent_score, state, observations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                risk.asset_id,
                risk.threat,
                risk.vulnerability,
                risk.existing_control,
                risk.probability,
                risk.impact,
                risk.inherent_score,
                risk.state.as_str(),
                risk.observations,
                risk.created_at.to_rfc3339()
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        self.get_risk(id)
    }

    pub fn get_risk(&self, id: i64) -> CidScanResult<Risk> {
        self.conn
            .query_row("SELECT * FROM risks WHERE id = ?1", params![id], risk_from_row)
            .optional()?
            .ok_or_else(|| CidScanError::not_found("risk", id))
    }

    /// Risks ordered by inherent score, optionally filtered by state.
    pub fn risks_by_state(&self, state: Option<RiskState>) -> CidScanResult<Vec<Risk>> {
        match state {
            Some(state) => {
                let mut stmt = self.conn.prepare(
                    "SELECT * FROM risks WHERE state = ?1 ORDER BY inherent_score DESC, id",
                )?;
                let rows = stmt.query_map(params![state.as_str()], risk_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare("SELECT * FROM risks ORDER BY inherent_score DESC, id")?;
                let rows = stmt.query_map([], risk_from_row)?;
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            }
        }
    }

    /// Administrative state override; any of the four states is accepted.
    pub fn update_risk_state(&mut self, risk_id: i64, state: RiskState) -> CidScanResult<()> {
        let tx = self.conn.transaction()?;
        let mut risk = tx
            .query_row("SELECT * FROM risks WHERE id = ?1", params![risk_id], risk_from_row)
            .optional()?
            .ok_or_else(|| CidScanError::not_found("risk", risk_id))?;
        lifecycle::set_state(&mut risk, state);
        tx.execute(
            "UPDATE risks SET state = ?1 WHERE id = ?2",
            params![risk.state.as_str(), risk.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ---- treatments ----

    /// Record a treatment and advance the owning risk out of Open.
    ///
    /// One transaction covers both writes: the treatment row and the
    /// state transition computed by `lifecycle::advance_to_treatment`.
    /// Returns the stored treatment and whether the risk advanced.
    pub fn insert_treatment(&mut self, treatment: &Treatment) -> CidScanResult<(Treatment, bool)> {
        let tx = self.conn.transaction()?;
        let mut risk = tx
            .query_row(
                "SELECT * FROM risks WHERE id = ?1",
                params![treatment.risk_id],
                risk_from_row,
            )
            .optional()?
            .ok_or_else(|| CidScanError::not_found("risk", treatment.risk_id))?;

        tx.execute(
            "INSERT INTO treatments (risk_id, strategy, control_ref, proposed_control,
                                     responsible, target_date, control_status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                treatment.risk_id,
                treatment.strategy.as_str(),
                treatment.control_ref,
                treatment.proposed_control,
                treatment.responsible,
                treatment.target_date,
                treatment.control_status.as_str(),
                treatment.created_at.to_rfc3339()
            ],
        )?;
        let id = tx.last_insert_rowid();

        let advanced = lifecycle::advance_to_treatment(&mut risk);
        if advanced {
            tx.execute(
                "UPDATE risks SET state = ?1 WHERE id = ?2",
                params![risk.state.as_str(), risk.id],
            )?;
        }
        tx.commit()?;

        let mut stored = treatment.clone();
        stored.id = id;
        Ok((stored, advanced))
    }

    pub fn treatments_for(&self, risk_id: i64) -> CidScanResult<Vec<Treatment>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM treatments WHERE risk_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![risk_id], treatment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn list_treatments(&self) -> CidScanResult<Vec<Treatment>> {
        let mut stmt = self.conn.prepare("SELECT * FROM treatments ORDER BY id")?;
        let rows = stmt.query_map([], treatment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- residuals ----

    /// Insert or replace the residual assessment for a risk. At most one
    /// residual row exists per risk.
    pub fn upsert_residual(&mut self, residual: &Residual) -> CidScanResult<()> {
        let tx = self.conn.transaction()?;
        let risk_exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM risks WHERE id = ?1",
                params![residual.risk_id],
                |row| row.get(0),
            )
            .optional()?;
        if risk_exists.is_none() {
            return Err(CidScanError::not_found("risk", residual.risk_id));
        }

        tx.execute(
            "INSERT INTO residuals (risk_id, probability, impact, score, evaluated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(risk_id) DO UPDATE SET
                probability = excluded.probability,
                impact = excluded.impact,
                score = excluded.score,
                evaluated_at = excluded.evaluated_at",
            params![
                residual.risk_id,
                residual.probability,
                residual.impact,
                residual.score,
                residual.evaluated_at
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn residual_for(&self, risk_id: i64) -> CidScanResult<Option<Residual>> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM residuals WHERE risk_id = ?1",
                params![risk_id],
                residual_from_row,
            )
            .optional()?)
    }

    pub fn list_residuals(&self) -> CidScanResult<Vec<Residual>> {
        let mut stmt = self.conn.prepare("SELECT * FROM residuals ORDER BY risk_id")?;
        let rows = stmt.query_map([], residual_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ---- dashboard aggregation ----

    pub fn state_counts(&self) -> CidScanResult<StateCounts> {
        let mut counts = StateCounts::default();
        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM risks GROUP BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (state, count) = row?;
            match state.parse::<RiskState>()? {
                RiskState::Open => counts.open = count,
                RiskState::InTreatment => counts.in_treatment = count,
                RiskState::Verified => counts.verified = count,
                RiskState::Closed => counts.closed = count,
            }
        }
        Ok(counts)
    }

    /// Highest inherent risks with their residual score, if assessed.
    pub fn top_risks(&self, limit: usize) -> CidScanResult<Vec<TopRisk>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.asset_id, r.inherent_score, r.state, res.score
             FROM risks r LEFT JOIN residuals res ON res.risk_id = r.id
             ORDER BY r.inherent_score DESC, r.id
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;
        let mut top = Vec::new();
        for row in rows {
            let (risk_id, asset_id, inherent, state, residual) = row?;
            top.push(TopRisk {
                risk_id,
                asset_id,
                inherent,
                residual,
                state: state.parse()?,
            });
        }
        Ok(top)
    }
}

fn conversion_err(err: CidScanError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_timestamp(text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get("id")?,
        address: row.get("address")?,
        hostname: row.get("hostname")?,
        location: row.get("location")?,
        asset_type: row
            .get::<_, String>("asset_type")?
            .parse()
            .map_err(conversion_err)?,
        description: row.get("description")?,
        sensitivity: row
            .get::<_, String>("sensitivity")?
            .parse()
            .map_err(conversion_err)?,
        criticality: row.get("criticality")?,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
    })
}

fn risk_from_row(row: &Row<'_>) -> rusqlite::Result<Risk> {
    Ok(Risk {
        id: row.get("id")?,
        asset_id: row.get("asset_id")?,
        threat: row.get("threat")?,
        vulnerability: row.get("vulnerability")?,
        existing_control: row.get("existing_control")?,
        probability: row.get("probability")?,
        impact: row.get("impact")?,
        inherent_score: row.get("inherent_score")?,
        state: row
            .get::<_, String>("state")?
            .parse()
            .map_err(conversion_err)?,
        observations: row.get("observations")?,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
    })
}

fn treatment_from_row(row: &Row<'_>) -> rusqlite::Result<Treatment> {
    Ok(Treatment {
        id: row.get("id")?,
        risk_id: row.get("risk_id")?,
        strategy: row
            .get::<_, String>("strategy")?
            .parse()
            .map_err(conversion_err)?,
        control_ref: row.get("control_ref")?,
        proposed_control: row.get("proposed_control")?,
        responsible: row.get("responsible")?,
        target_date: row.get("target_date")?,
        control_status: row
            .get::<_, String>("control_status")?
            .parse()
            .map_err(conversion_err)?,
        created_at: parse_timestamp(&row.get::<_, String>("created_at")?)?,
    })
}

fn residual_from_row(row: &Row<'_>) -> rusqlite::Result<Residual> {
    Ok(Residual {
        risk_id: row.get("risk_id")?,
        probability: row.get("probability")?,
        impact: row.get("impact")?,
        score: row.get("score")?,
        evaluated_at: row.get("evaluated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, ControlStatus, Sensitivity, Strategy};

    fn sample_asset(address: &str, asset_type: AssetType) -> Asset {
        Asset {
            id: 0,
            address: address.to_string(),
            hostname: "host-a".to_string(),
            location: "Main office".to_string(),
            asset_type,
            description: "test asset".to_string(),
            sensitivity: Sensitivity::Internal,
            criticality: 7,
            created_at: Utc::now(),
        }
    }

    fn sample_risk(asset_id: i64) -> Risk {
        crate::lifecycle::new_risk(
            asset_id,
            "Credential theft",
            "Weak passwords",
            None,
            4,
            4,
            "",
            Utc::now(),
        )
        .unwrap()
    }

    fn sample_treatment(risk_id: i64) -> Treatment {
        Treatment {
            id: 0,
            risk_id,
            strategy: Strategy::Mitigate,
            control_ref: "5.17".to_string(),
            proposed_control: "Password policy + MFA".to_string(),
            responsible: "IT admin".to_string(),
            target_date: "2026-12-01".to_string(),
            control_status: ControlStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_rescan_updates_in_place() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let first = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Workstation))
            .unwrap();

        let mut rescanned = sample_asset("10.0.0.5", AssetType::Server);
        rescanned.criticality = 13;
        let second = store.upsert_asset(&rescanned).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.asset_type, AssetType::Server);
        assert_eq!(second.criticality, 13);
        assert_eq!(store.asset_count().unwrap(), 1);
    }

    #[test]
    fn test_risk_requires_existing_asset() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let err = store.insert_risk(&sample_risk(99)).unwrap_err();
        assert!(matches!(err, CidScanError::NotFound { entity: "asset", .. }));
    }

    #[test]
    fn test_treatment_advances_risk_once() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Server))
            .unwrap();
        let risk = store.insert_risk(&sample_risk(asset.id)).unwrap();
        assert_eq!(risk.state, RiskState::Open);

        let (_, advanced) = store.insert_treatment(&sample_treatment(risk.id)).unwrap();
        assert!(advanced);
        assert_eq!(store.get_risk(risk.id).unwrap().state, RiskState::InTreatment);

        let (_, advanced) = store.insert_treatment(&sample_treatment(risk.id)).unwrap();
        assert!(!advanced);
        assert_eq!(store.get_risk(risk.id).unwrap().state, RiskState::InTreatment);
        assert_eq!(store.treatments_for(risk.id).unwrap().len(), 2);
    }

    #[test]
    fn test_treatment_for_missing_risk_fails() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let err = store.insert_treatment(&sample_treatment(42)).unwrap_err();
        assert!(matches!(err, CidScanError::NotFound { entity: "risk", .. }));
    }

    #[test]
    fn test_residual_upsert_keeps_single_row() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Server))
            .unwrap();
        let risk = store.insert_risk(&sample_risk(asset.id)).unwrap();

        let first = crate::lifecycle::new_residual(risk.id, 3, 3, "2026-08-01").unwrap();
        store.upsert_residual(&first).unwrap();
        let second = crate::lifecycle::new_residual(risk.id, 2, 2, "2026-08-07").unwrap();
        store.upsert_residual(&second).unwrap();

        let all = store.list_residuals().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].score, 4);
        assert_eq!(all[0].evaluated_at, "2026-08-07");
    }

    #[test]
    fn test_residual_requires_existing_risk() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let residual = crate::lifecycle::new_residual(7, 2, 2, "2026-08-07").unwrap();
        let err = store.upsert_residual(&residual).unwrap_err();
        assert!(matches!(err, CidScanError::NotFound { entity: "risk", .. }));
    }

    #[test]
    fn test_state_override_accepts_all_states() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Server))
            .unwrap();
        let risk = store.insert_risk(&sample_risk(asset.id)).unwrap();

        for state in RiskState::all() {
            store.update_risk_state(risk.id, state).unwrap();
            assert_eq!(store.get_risk(risk.id).unwrap().state, state);
        }
    }

    #[test]
    fn test_state_counts_and_top_risks() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Server))
            .unwrap();

        let high = store.insert_risk(&sample_risk(asset.id)).unwrap();
        let mut low_risk = sample_risk(asset.id);
        low_risk.probability = 1;
        low_risk.impact = 2;
        low_risk.inherent_score = 2;
        let low = store.insert_risk(&low_risk).unwrap();
        store.update_risk_state(low.id, RiskState::Closed).unwrap();

        let residual = crate::lifecycle::new_residual(high.id, 2, 3, "2026-08-07").unwrap();
        store.upsert_residual(&residual).unwrap();

        let counts = store.state_counts().unwrap();
        assert_eq!(counts.open, 1);
        assert_eq!(counts.closed, 1);
        assert_eq!(counts.total(), 2);

        let top = store.top_risks(5).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].risk_id, high.id);
        assert_eq!(top[0].residual, Some(6));
        assert_eq!(top[1].residual, None);
    }

    #[test]
    fn test_set_asset_valuation() {
        let mut store = RecordStore::open_in_memory().unwrap();
        let asset = store
            .upsert_asset(&sample_asset("10.0.0.5", AssetType::Server))
            .unwrap();
        store.set_asset_valuation(asset.id, 12).unwrap();
        assert_eq!(store.get_asset(asset.id).unwrap().criticality, 12);

        let err = store.set_asset_valuation(99, 12).unwrap_err();
        assert!(matches!(err, CidScanError::NotFound { entity: "asset", .. }));
    }
}
