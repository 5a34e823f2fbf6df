use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::models::{BattleReport, ServerGroup, StoredLog, StoredLogInfo};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("log not found")]
    NotFound,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt log document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Filesystem-backed log storage: one pretty-printed JSON document per
/// saved siege log, listed by scanning the data directory.
#[derive(Debug, Clone)]
pub struct LogStore {
    data_dir: PathBuf,
}

impl LogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Persist a parsed report under a fresh id derived from the upload
    /// instant. Ids are bumped on collision so two saves in the same
    /// millisecond both land.
    pub fn save(
        &self,
        log_date: NaiveDate,
        server_name: &str,
        parsed_data: BattleReport,
    ) -> Result<StoredLog, StoreError> {
        let base = Utc::now().format("%Y%m%d%H%M%S%3f").to_string();
        let mut id = base.clone();
        let mut bump = 0u32;
        while self.path_for(&id).exists() {
            bump += 1;
            id = format!("{base}-{bump}");
        }

        let entry = StoredLog {
            id: id.clone(),
            log_date: log_date.format("%Y-%m-%d").to_string(),
            server_name: server_name.to_string(),
            parsed_data,
        };
        let json = serde_json::to_string_pretty(&entry)?;
        fs::write(self.path_for(&id), json)?;
        tracing::info!(id = %entry.id, server = %entry.server_name, date = %entry.log_date, "saved log");
        Ok(entry)
    }

    /// List every saved log, newest siege date first. Files that are not
    /// log documents are skipped quietly.
    pub fn list(&self) -> Result<Vec<StoredLogInfo>, StoreError> {
        let mut infos: Vec<StoredLogInfo> = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = match fs::read_to_string(&path) {
                Ok(t) => t,
                Err(_) => continue,
            };
            let log: StoredLog = match serde_json::from_str(&text) {
                Ok(l) => l,
                Err(_) => continue,
            };
            infos.push(StoredLogInfo {
                id: log.id,
                log_date: log.log_date,
                server_name: log.server_name,
            });
        }
        // Dates are ISO strings, so lexical order is chronological; id
        // breaks ties to keep the listing deterministic.
        infos.sort_by(|a, b| b.log_date.cmp(&a.log_date).then_with(|| b.id.cmp(&a.id)));
        Ok(infos)
    }

    pub fn list_for_server(&self, server_name: &str) -> Result<Vec<StoredLogInfo>, StoreError> {
        let mut infos = self.list()?;
        infos.retain(|i| i.server_name == server_name);
        Ok(infos)
    }

    /// Per-server log counts for the unfiltered listing.
    pub fn server_groups(&self) -> Result<Vec<ServerGroup>, StoreError> {
        let mut groups: Vec<ServerGroup> = Vec::new();
        for info in self.list()? {
            match groups.iter_mut().find(|g| g.name == info.server_name) {
                Some(group) => group.count += 1,
                None => groups.push(ServerGroup {
                    name: info.server_name,
                    count: 1,
                }),
            }
        }
        Ok(groups)
    }

    pub fn get(&self, id: &str) -> Result<StoredLog, StoreError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound);
        }
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// First log recorded for the given calendar date, newest save first.
    pub fn find_by_date(&self, date: NaiveDate) -> Result<StoredLog, StoreError> {
        let wanted = date.format("%Y-%m-%d").to_string();
        for info in self.list()? {
            if info.log_date == wanted {
                return self.get(&info.id);
            }
        }
        Err(StoreError::NotFound)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.data_dir.join(format!("{id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_siege_log;
    use tempfile::TempDir;

    fn sample_report() -> BattleReport {
        parse_siege_log("[10:00:00] [Alpha] Hero1(x) → Attack [Beta] Villain1\n+100")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn save_and_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();

        let saved = store
            .save(date("2024-03-09"), "Ezrael", sample_report())
            .unwrap();
        let loaded = store.get(&saved.id).unwrap();

        assert_eq!(loaded.id, saved.id);
        assert_eq!(loaded.log_date, "2024-03-09");
        assert_eq!(loaded.server_name, "Ezrael");
        assert_eq!(loaded.parsed_data, saved.parsed_data);
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        assert!(matches!(store.get("missing"), Err(StoreError::NotFound)));
    }

    #[test]
    fn list_is_newest_date_first_and_skips_foreign_files() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        store.save(date("2024-03-02"), "Ezrael", sample_report()).unwrap();
        store.save(date("2024-03-09"), "Ezrael", sample_report()).unwrap();
        store.save(date("2024-03-05"), "Teleria", sample_report()).unwrap();
        std::fs::write(dir.path().join("characters.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a log").unwrap();

        let infos = store.list().unwrap();
        let dates: Vec<&str> = infos.iter().map(|i| i.log_date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-09", "2024-03-05", "2024-03-02"]);
    }

    #[test]
    fn list_for_server_filters() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        store.save(date("2024-03-02"), "Ezrael", sample_report()).unwrap();
        store.save(date("2024-03-05"), "Teleria", sample_report()).unwrap();

        let infos = store.list_for_server("Teleria").unwrap();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].server_name, "Teleria");
    }

    #[test]
    fn server_groups_count_per_server() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        store.save(date("2024-03-02"), "Ezrael", sample_report()).unwrap();
        store.save(date("2024-03-09"), "Ezrael", sample_report()).unwrap();
        store.save(date("2024-03-05"), "Teleria", sample_report()).unwrap();

        let mut groups = store.server_groups().unwrap();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "Ezrael");
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].count, 1);
    }

    #[test]
    fn find_by_date_returns_matching_log() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        store.save(date("2024-03-02"), "Ezrael", sample_report()).unwrap();
        let saved = store.save(date("2024-03-09"), "Ezrael", sample_report()).unwrap();

        let found = store.find_by_date(date("2024-03-09")).unwrap();
        assert_eq!(found.id, saved.id);
        assert!(matches!(
            store.find_by_date(date("2020-01-01")),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn colliding_save_ids_are_bumped() {
        let dir = TempDir::new().unwrap();
        let store = LogStore::new(dir.path()).unwrap();
        // Two saves back to back may share a millisecond; both must land.
        let first = store.save(date("2024-03-09"), "Ezrael", sample_report()).unwrap();
        let second = store.save(date("2024-03-09"), "Ezrael", sample_report()).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
