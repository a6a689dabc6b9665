#[cfg(test)]
pub mod test {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use crate::env::{EnvLookup, vars_env};

    pub const DEMO_JSON: &str = r#"{"database": {"password": "12345"}}"#;

    pub const DEMO_YAML: &str = "database:\n  password: \"12345\"\n";

    pub const DEMO_TOML: &str = "[database]\npassword = \"12345\"\n";

    /// Write `content` to `dir/name` and return the path.
    pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Synthetic environment from literal pairs.
    pub fn env_of(pairs: &[(&str, &str)]) -> EnvLookup {
        vars_env(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn demo_files_are_written() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "demo.json", DEMO_JSON);
        assert_eq!(std::fs::read_to_string(path).unwrap(), DEMO_JSON);
    }
}
