//! The read-only pharmacy catalog the capabilities query.
//!
//! A `Catalog` is a plain value: built once (from the built-in fixture or a
//! TOML file), wrapped in an `Arc`, and shared by every capability. Nothing
//! mutates it after construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A medication the pharmacy sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub name: String,
    pub active_ingredient: String,
    pub dosage_text: String,
    pub prescription_required: bool,
}

/// A registered customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
    pub age: u32,
    /// Names of the medications assigned to this user
    #[serde(default)]
    pub medications: Vec<String>,
}

/// Medications, stock counts, and users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub medications: Vec<Medication>,

    /// Units on hand, keyed by lowercase medication name
    #[serde(default)]
    pub stock: BTreeMap<String, u32>,

    #[serde(default)]
    pub users: Vec<User>,
}

impl Catalog {
    /// The built-in demo catalog: five medications and ten synthetic users.
    pub fn builtin() -> Self {
        let medications = vec![
            medication("amoxicillin", "Amoxicillin trihydrate", "Take 1 pill every 8h", true),
            medication("aspirin", "Acetylsalicylic acid", "Take 1 pill daily", false),
            medication("paracetamol", "Acetaminophen", "Take 1-2 pills every 6h", false),
            medication("ibuprofen", "Ibuprofen", "Take 1 pill every 8h", false),
            medication("metformin", "Metformin hydrochloride", "Take 1 pill with meals", true),
        ];

        let stock = [
            ("amoxicillin", 12),
            ("aspirin", 20),
            ("paracetamol", 15),
            ("ibuprofen", 8),
            ("metformin", 10),
        ]
        .into_iter()
        .map(|(name, quantity)| (name.to_string(), quantity))
        .collect();

        let users = vec![
            user("Alice Smith", "alice@example.com", 28, &["aspirin", "paracetamol"]),
            user("Bob Johnson", "bob@example.com", 35, &["amoxicillin"]),
            user("Charlie Lee", "charlie@example.com", 42, &["ibuprofen"]),
            user("David Schwartzman", "david@example.com", 30, &["metformin", "aspirin"]),
            user("Eli Cohen", "eli@example.com", 25, &["paracetamol"]),
            user("Fiona Davis", "fiona@example.com", 33, &["amoxicillin", "ibuprofen"]),
            user("Grace Kim", "grace@example.com", 29, &["aspirin"]),
            user("Hannah Wilson", "hannah@example.com", 31, &["metformin"]),
            user("Isaac Brown", "isaac@example.com", 40, &["paracetamol", "ibuprofen"]),
            user("Julia Martinez", "julia@example.com", 27, &["aspirin", "amoxicillin"]),
        ];

        Self {
            medications,
            stock,
            users,
        }
    }

    /// Load a catalog from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let catalog: Self = toml::from_str(&content).map_err(|e| CatalogError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!(
            path = %path.display(),
            medications = catalog.medications.len(),
            users = catalog.users.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Case-insensitive medication lookup.
    pub fn find_medication(&self, name: &str) -> Option<&Medication> {
        self.medications.iter().find(|m| same_name(&m.name, name))
    }

    /// Units on hand, if the pharmacy stocks this item at all.
    pub fn stock_of(&self, name: &str) -> Option<u32> {
        self.stock
            .iter()
            .find(|(item, _)| same_name(item, name))
            .map(|(_, quantity)| *quantity)
    }

    /// Case-insensitive user lookup by full name.
    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| same_name(&u.name, name))
    }
}

/// The one matching rule for every catalog lookup: Unicode lowercase equality.
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn medication(name: &str, ingredient: &str, dosage: &str, prescription: bool) -> Medication {
    Medication {
        name: name.into(),
        active_ingredient: ingredient.into(),
        dosage_text: dosage.into(),
        prescription_required: prescription,
    }
}

fn user(name: &str, email: &str, age: u32, medications: &[&str]) -> User {
    User {
        name: name.into(),
        email: email.into(),
        age,
        medications: medications.iter().map(|m| m.to_string()).collect(),
    }
}

/// Catalog loading errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse catalog file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_catalog_contents() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.medications.len(), 5);
        assert_eq!(catalog.users.len(), 10);
        assert_eq!(catalog.stock_of("aspirin"), Some(20));
    }

    #[test]
    fn lookups_ignore_case() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.find_medication("ASPIRIN").map(|m| m.name.as_str()),
            Some("aspirin")
        );
        assert_eq!(catalog.stock_of("Ibuprofen"), Some(8));
        assert_eq!(
            catalog.find_user("alice smith").map(|u| u.email.as_str()),
            Some("alice@example.com")
        );
        assert!(catalog.find_medication("unobtainium").is_none());
        assert!(catalog.stock_of("unobtainium").is_none());
    }

    #[test]
    fn lookups_fold_non_ascii_names_the_same_way() {
        let catalog: Catalog = toml::from_str(
            r#"
[[medications]]
name = "Émolliente"
active_ingredient = "Glycerol"
dosage_text = "Apply twice daily"
prescription_required = false

[stock]
"ÉMOLLIENTE" = 3

[[users]]
name = "Zoë Ångström"
email = "zoe@example.com"
age = 33
"#,
        )
        .unwrap();

        assert!(catalog.find_medication("émolliente").is_some());
        assert_eq!(catalog.stock_of("émolliente"), Some(3));
        assert!(catalog.find_user("ZOË ÅNGSTRÖM").is_some());
    }

    #[test]
    fn load_catalog_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[medications]]
name = "cetirizine"
active_ingredient = "Cetirizine hydrochloride"
dosage_text = "Take 1 pill daily"
prescription_required = false

[stock]
Cetirizine = 4

[[users]]
name = "Kim Park"
email = "kim@example.com"
age = 51
medications = ["cetirizine"]
"#
        )
        .unwrap();

        let catalog = Catalog::from_toml_file(file.path()).unwrap();
        assert_eq!(catalog.medications.len(), 1);
        assert_eq!(catalog.stock_of("cetirizine"), Some(4));
        assert_eq!(catalog.find_user("kim park").unwrap().age, 51);
    }

    #[test]
    fn missing_catalog_file_is_an_error() {
        let err = Catalog::from_toml_file(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::ReadError { .. }));
    }

    #[test]
    fn malformed_catalog_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "medications = 3").unwrap();
        let err = Catalog::from_toml_file(file.path()).unwrap_err();
        assert!(matches!(err, CatalogError::ParseError { .. }));
    }
}
