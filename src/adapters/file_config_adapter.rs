//! INI file configuration adapter.

use crate::domain::error::TickdeskError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TickdeskError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(content).map_err(|reason| TickdeskError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, TickdeskError> {
        Self::parse(content.to_string()).map_err(|reason| TickdeskError::ConfigParse {
            file: "<string>".into(),
            reason,
        })
    }

    fn parse(content: String) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content)?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[replay]
field = last
tickers = 1:BHP, 2:CBA

[index.fast]
type = EMA
periods = 5
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("replay", "tickers"),
            Some("1:BHP, 2:CBA".to_string())
        );
        assert_eq!(adapter.get_string("index.fast", "type"), Some("EMA".to_string()));
        let sections = adapter.sections();
        assert!(sections.contains(&"index.fast".to_string()));
        assert!(sections.contains(&"replay".to_string()));
    }

    #[test]
    fn keys_are_lowercased_and_sorted() {
        let adapter =
            FileConfigAdapter::from_string("[Index.Slow]\nType = SMA\nPeriods = 20\n").unwrap();
        assert_eq!(adapter.keys("index.slow"), vec!["periods", "type"]);
        assert_eq!(adapter.keys("Index.Slow"), vec!["periods", "type"]);
        assert!(adapter.keys("missing").is_empty());
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[replay]\nfield = bid\n").unwrap();
        assert_eq!(adapter.get_string("replay", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[replay]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert!(adapter.get_bool("replay", key, false));
        }
        for key in ["d", "e", "f"] {
            assert!(!adapter.get_bool("replay", key, true));
        }
        assert!(adapter.get_bool("replay", "missing", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[replay]\nfield = close\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("replay", "field"), Some("close".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(TickdeskError::Io(_))));
    }
}
