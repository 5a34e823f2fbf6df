use std::collections::HashMap;
use std::path::Path;

use crate::models::BattleReport;

/// Character roster: a name → class lookup applied after parsing to
/// decorate player rows for display. Aggregation never depends on it.
#[derive(Debug, Default, Clone)]
pub struct ClassRoster {
    classes: HashMap<String, String>,
}

impl ClassRoster {
    /// Load `characters.json` (a flat `{"name": "class"}` object) from
    /// the data directory. A missing or unreadable file is an empty
    /// roster, not an error.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("characters.json");
        let classes = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        Self { classes }
    }

    pub fn from_map(classes: HashMap<String, String>) -> Self {
        Self { classes }
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Fill in `class` for every player present in the roster.
    pub fn decorate(&self, report: &mut BattleReport) {
        for player in &mut report.player_results {
            if let Some(class) = self.classes.get(&player.name) {
                player.class = Some(class.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_siege_log;
    use tempfile::TempDir;

    #[test]
    fn decorate_sets_known_classes_only() {
        let log = "[10:00:00] [Alpha] Hero1(x) → Attack [Beta] Villain1\n+100";
        let mut report = parse_siege_log(log);

        let mut classes = HashMap::new();
        classes.insert("Hero1".to_string(), "Templar".to_string());
        ClassRoster::from_map(classes).decorate(&mut report);

        let hero = report.player_results.iter().find(|p| p.name == "Hero1").unwrap();
        assert_eq!(hero.class.as_deref(), Some("Templar"));
        let villain = report.player_results.iter().find(|p| p.name == "Villain1").unwrap();
        assert_eq!(villain.class, None);
    }

    #[test]
    fn load_missing_file_is_empty_roster() {
        let dir = TempDir::new().unwrap();
        let roster = ClassRoster::load(dir.path());
        assert!(roster.is_empty());
    }

    #[test]
    fn load_reads_flat_json_object() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("characters.json"),
            r#"{"Hero1": "Templar", "Villain1": "Reaper"}"#,
        )
        .unwrap();
        let roster = ClassRoster::load(dir.path());
        assert_eq!(roster.len(), 2);
    }
}
