//! Core identity types
//!
//! This module defines the types that flow from discovery into the cache:
//! - TestIdentity: what the framework reports for a discovered node
//! - TestId: stable external identifier for a test case
//! - ExternalTestDescriptor: the runner-facing description of a test case
//! - NavigationResult: source location lookup result

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Kind of node the framework reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A leaf test case
    Case,
    /// A composite node (fixture, namespace, assembly suite)
    Suite,
}

/// A discovered test node as reported by the framework
///
/// Produced once per discovered node and never modified afterwards.
/// `unique_name` is unique within one assembly load and is the only key
/// the cache uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestIdentity {
    /// Framework-assigned unique name (cache key)
    pub unique_name: String,
    /// Fully qualified name, e.g. `Acme.Tests.MathFixture.Adds(1,2)`
    pub full_name: String,
    /// Name shown to the user
    pub display_name: String,
    /// Fully qualified name of the fixture class reporting the test
    pub class_name: String,
    /// Name of the test method
    pub method_name: String,
    /// Leaf case or composite suite
    pub kind: NodeKind,
    /// Categories attached to the test
    #[serde(default)]
    pub categories: Vec<String>,
    /// Name/value properties attached to the test
    #[serde(default)]
    pub properties: Vec<(String, String)>,
}

impl TestIdentity {
    /// Create a leaf test case identity
    pub fn case(
        unique_name: impl Into<String>,
        full_name: impl Into<String>,
        display_name: impl Into<String>,
        class_name: impl Into<String>,
        method_name: impl Into<String>,
    ) -> Self {
        Self {
            unique_name: unique_name.into(),
            full_name: full_name.into(),
            display_name: display_name.into(),
            class_name: class_name.into(),
            method_name: method_name.into(),
            kind: NodeKind::Case,
            categories: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Create a suite identity
    pub fn suite(unique_name: impl Into<String>, full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        Self {
            unique_name: unique_name.into(),
            display_name: full_name.clone(),
            class_name: full_name.clone(),
            full_name,
            method_name: String::new(),
            kind: NodeKind::Suite,
            categories: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Attach a category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Attach a name/value property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// True for leaf test cases
    pub fn is_case(&self) -> bool {
        self.kind == NodeKind::Case
    }
}

/// Stable external identifier for a test case
///
/// Derived from the executor reference, the source assembly path and the
/// fully qualified name, so the same test in the same assembly keeps its
/// id across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestId(Uuid);

impl TestId {
    /// Derive the id for a test case
    pub fn derive(executor_reference: &str, source: &str, fully_qualified_name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(executor_reference.as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        hasher.update([0u8]);
        hasher.update(fully_qualified_name.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        // RFC 4122 variant, version 8 (custom)
        bytes[6] = (bytes[6] & 0x0f) | 0x80;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A name/value trait attached to a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trait {
    /// Trait name (`Category` for categories)
    pub name: String,
    /// Trait value
    pub value: String,
}

impl Trait {
    /// Create a trait
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The runner-facing description of one test case
///
/// Owned by the identity cache once created and never mutated after
/// insertion. Location fields are filled from a single navigator lookup at
/// creation time and stay `None` when no source data was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTestDescriptor {
    /// Stable external identifier
    pub id: TestId,
    /// Name shown to the user
    pub display_name: String,
    /// Fully qualified name
    pub fully_qualified_name: String,
    /// Path of the assembly that contains the test
    pub source_assembly_path: String,
    /// URI of the executor that owns the test
    pub executor_reference: String,
    /// Source file of the test method, when known
    pub code_file_path: Option<String>,
    /// First executable line of the test method, when known
    pub line_number: Option<u32>,
    /// Categories and properties
    pub traits: Vec<Trait>,
}

impl ExternalTestDescriptor {
    /// True when navigation data was attached
    pub fn has_location(&self) -> bool {
        self.code_file_path.is_some()
    }
}

/// Result of a source location lookup
///
/// `is_valid == false` is the canonical "no data found" state, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavigationResult {
    /// Whether a location was found
    pub is_valid: bool,
    /// Source document path
    pub file_path: String,
    /// One-based start line
    pub line_number: u32,
}

impl NavigationResult {
    /// A found location
    pub fn valid(file_path: impl Into<String>, line_number: u32) -> Self {
        Self {
            is_valid: true,
            file_path: file_path.into(),
            line_number,
        }
    }

    /// The "no data found" value
    pub fn invalid() -> Self {
        Self {
            is_valid: false,
            file_path: String::new(),
            line_number: 0,
        }
    }

    /// Convert into `(file, line)` when valid
    pub fn location(&self) -> Option<(&str, u32)> {
        self.is_valid
            .then_some((self.file_path.as_str(), self.line_number))
    }
}

impl Default for NavigationResult {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXECUTOR: &str = "executor://NUnit3TestExecutor";

    #[test]
    fn test_id_is_stable() {
        let a = TestId::derive(EXECUTOR, "/bin/Tests.dll", "Acme.Fixture.Adds");
        let b = TestId::derive(EXECUTOR, "/bin/Tests.dll", "Acme.Fixture.Adds");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_id_depends_on_every_component() {
        let base = TestId::derive(EXECUTOR, "/bin/Tests.dll", "Acme.Fixture.Adds");
        assert_ne!(base, TestId::derive("executor://Other", "/bin/Tests.dll", "Acme.Fixture.Adds"));
        assert_ne!(base, TestId::derive(EXECUTOR, "/bin/Other.dll", "Acme.Fixture.Adds"));
        assert_ne!(base, TestId::derive(EXECUTOR, "/bin/Tests.dll", "Acme.Fixture.Subtracts"));
    }

    #[test]
    fn test_id_components_do_not_run_together() {
        let a = TestId::derive(EXECUTOR, "ab", "c");
        let b = TestId::derive(EXECUTOR, "a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_has_rfc4122_variant() {
        let id = TestId::derive(EXECUTOR, "x.dll", "X.Y");
        assert_eq!(id.as_uuid().get_variant(), uuid::Variant::RFC4122);
    }

    #[test]
    fn test_identity_builders() {
        let case = TestIdentity::case("0-1001", "A.B.C", "C", "A.B", "C")
            .with_category("Slow")
            .with_property("Owner", "qa");
        assert!(case.is_case());
        assert_eq!(case.categories, vec!["Slow".to_string()]);
        assert_eq!(case.properties, vec![("Owner".to_string(), "qa".to_string())]);

        let suite = TestIdentity::suite("0-1000", "A.B");
        assert!(!suite.is_case());
        assert_eq!(suite.kind, NodeKind::Suite);
    }

    #[test]
    fn test_navigation_result_states() {
        let invalid = NavigationResult::invalid();
        assert!(!invalid.is_valid);
        assert_eq!(invalid.location(), None);
        assert_eq!(NavigationResult::default(), invalid);

        let found = NavigationResult::valid("src/Fixture.cs", 42);
        assert_eq!(found.location(), Some(("src/Fixture.cs", 42)));
    }

    #[test]
    fn test_descriptor_serializes() {
        let descriptor = ExternalTestDescriptor {
            id: TestId::derive(EXECUTOR, "T.dll", "A.B"),
            display_name: "B".to_string(),
            fully_qualified_name: "A.B".to_string(),
            source_assembly_path: "T.dll".to_string(),
            executor_reference: EXECUTOR.to_string(),
            code_file_path: None,
            line_number: None,
            traits: vec![Trait::new("Category", "Fast")],
        };
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: ExternalTestDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
        assert!(!back.has_location());
    }
}
