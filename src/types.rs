//! Payload types of the backend procedures

use serde::{Deserialize, Serialize};

/// One row of `list_password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
}

/// A decrypted entry from `get_password`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Password {
    pub name: String,
    pub password: String,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of `import_password`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Count {
    /// Entries skipped as exact duplicates
    pub ignore: usize,
    /// Entries added
    pub insert: usize,
}

/// Character classes and length for `make_password`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordOption {
    pub len: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl Default for PasswordOption {
    fn default() -> Self {
        Self {
            len: 16,
            uppercase: true,
            lowercase: true,
            digit: true,
            special: false,
        }
    }
}

/// Encrypted export rows: `[name, password]` pairs, base64, with the wrapped
/// key as the final row.
pub type ExportData = Vec<(String, String)>;

/// What `import_password` reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportSource {
    /// Path of an export file on the backend host
    File(String),
    /// Export rows sent inline
    Data(ExportData),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_source_wire_shape() {
        assert_eq!(
            serde_json::to_value(ImportSource::File("/tmp/export".into())).unwrap(),
            json!("/tmp/export")
        );
        assert_eq!(
            serde_json::to_value(ImportSource::Data(vec![("bmFtZQ==".into(), "cHc=".into())]))
                .unwrap(),
            json!([["bmFtZQ==", "cHc="]])
        );
    }

    #[test]
    fn test_password_debug_redacts() {
        let entry = Password {
            name: "mail".into(),
            password: "hunter2".into(),
        };
        let printed = format!("{:?}", entry);
        assert!(printed.contains("mail"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_count_decodes() {
        let count: Count = serde_json::from_value(json!({"ignore": 2, "insert": 5})).unwrap();
        assert_eq!(count, Count { ignore: 2, insert: 5 });
    }
}
