//! Department ↔ group ↔ role ↔ backend routing table and role precedence.
//!
//! The table is read-only configuration: loaded once, shared behind an
//! `Arc`, safe for unsynchronized concurrent reads. A role that does not
//! appear here can never authorize access and can never be routed.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// One department with its required directory group, router role, dashboard
/// redirect path, and backend base URL.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteTarget {
    pub department: String,
    pub group: String,
    pub role: String,
    pub dashboard: String,
    pub backend: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoutingTable {
    /// Highest priority first. A subject with several roles is collapsed to
    /// the first entry here that matches.
    precedence: Vec<String>,
    targets: Vec<RouteTarget>,
}

impl RoutingTable {
    /// Reference deployment: four departments, admin first in precedence.
    #[must_use]
    pub fn builtin() -> Self {
        let targets = vec![
            RouteTarget {
                department: "Admin".to_string(),
                group: "admins".to_string(),
                role: "admin".to_string(),
                dashboard: "/admin/dashboard".to_string(),
                backend: "http://admin-dashboard:8504".to_string(),
            },
            RouteTarget {
                department: "HR".to_string(),
                group: "hr".to_string(),
                role: "hr".to_string(),
                dashboard: "/hr/dashboard".to_string(),
                backend: "http://hr-dashboard:8501".to_string(),
            },
            RouteTarget {
                department: "IT Support".to_string(),
                group: "it_support".to_string(),
                role: "it_support".to_string(),
                dashboard: "/it/dashboard".to_string(),
                backend: "http://it-dashboard:8502".to_string(),
            },
            RouteTarget {
                department: "Sales".to_string(),
                group: "sales".to_string(),
                role: "sales".to_string(),
                dashboard: "/sales/dashboard".to_string(),
                backend: "http://sales-dashboard:8503".to_string(),
            },
        ];
        Self {
            precedence: vec![
                "admin".to_string(),
                "hr".to_string(),
                "it_support".to_string(),
                "sales".to_string(),
            ],
            targets,
        }
    }

    /// Parse and validate a table from JSON.
    ///
    /// # Errors
    /// Returns an error on malformed JSON or an invalid table.
    pub fn from_json(raw: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(raw).context("invalid routing table JSON")?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read routing table: {}", path.display()))?;
        Self::from_json(&raw)
    }

    /// Every department has exactly one required group and one target;
    /// duplicates anywhere would make routing ambiguous.
    ///
    /// # Errors
    /// Returns an error describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.precedence.is_empty() {
            bail!("role precedence must not be empty");
        }
        if self.targets.is_empty() {
            bail!("routing table must contain at least one target");
        }
        let mut departments = HashSet::new();
        let mut roles = HashSet::new();
        for target in &self.targets {
            if !departments.insert(target.department.as_str()) {
                bail!("duplicate department in routing table: {}", target.department);
            }
            if !roles.insert(target.role.as_str()) {
                bail!("duplicate role in routing table: {}", target.role);
            }
            url::Url::parse(&target.backend)
                .with_context(|| format!("invalid backend URL for {}", target.department))?;
        }
        let mut seen = HashSet::new();
        for role in &self.precedence {
            if !seen.insert(role.as_str()) {
                bail!("duplicate role in precedence list: {role}");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn department(&self, name: &str) -> Option<&RouteTarget> {
        self.targets.iter().find(|t| t.department == name)
    }

    #[must_use]
    pub fn by_role(&self, role: &str) -> Option<&RouteTarget> {
        self.targets.iter().find(|t| t.role == role)
    }

    #[must_use]
    pub fn departments(&self) -> Vec<&str> {
        self.targets.iter().map(|t| t.department.as_str()).collect()
    }

    #[must_use]
    pub fn precedence(&self) -> &[String] {
        &self.precedence
    }

    /// The total primary-role function: first precedence entry present in
    /// the subject's role set, or `None` when nothing matches. The tie-break
    /// (precedence order) is part of the contract, not an accident of
    /// iteration.
    #[must_use]
    pub fn primary_role<'a>(&'a self, roles: &BTreeSet<String>) -> Option<&'a str> {
        self.precedence
            .iter()
            .map(String::as_str)
            .find(|role| roles.contains(*role))
    }

    /// Map directory groups to the router roles they grant.
    #[must_use]
    pub fn roles_for_groups(&self, groups: &[String]) -> BTreeSet<String> {
        self.targets
            .iter()
            .filter(|t| groups.iter().any(|g| g == &t.group))
            .map(|t| t.role.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn builtin_table_is_valid() {
        let table = RoutingTable::builtin();
        assert!(table.validate().is_ok());
        assert_eq!(table.departments().len(), 4);
    }

    #[test]
    fn department_lookup_maps_group_and_backend() {
        let table = RoutingTable::builtin();
        let hr = table.department("HR").expect("HR entry");
        assert_eq!(hr.group, "hr");
        assert_eq!(hr.backend, "http://hr-dashboard:8501");
        assert!(table.department("Engineering").is_none());
    }

    #[test]
    fn primary_role_follows_precedence_order() {
        let table = RoutingTable::builtin();
        // hr outranks sales regardless of set ordering.
        assert_eq!(table.primary_role(&roles(&["sales", "hr"])), Some("hr"));
        assert_eq!(
            table.primary_role(&roles(&["sales", "hr", "admin"])),
            Some("admin")
        );
        assert_eq!(table.primary_role(&roles(&["sales"])), Some("sales"));
    }

    #[test]
    fn primary_role_is_total() {
        let table = RoutingTable::builtin();
        assert_eq!(table.primary_role(&roles(&[])), None);
        assert_eq!(table.primary_role(&roles(&["contractor"])), None);
    }

    #[test]
    fn roles_for_groups_maps_through_the_table() {
        let table = RoutingTable::builtin();
        let granted = table.roles_for_groups(&[
            "admins".to_string(),
            "sales".to_string(),
            "unrelated".to_string(),
        ]);
        assert_eq!(granted, roles(&["admin", "sales"]));
    }

    #[test]
    fn from_json_round_trips_and_validates() -> Result<()> {
        let table = RoutingTable::builtin();
        let raw = serde_json::to_string(&table)?;
        let parsed = RoutingTable::from_json(&raw)?;
        assert_eq!(parsed.departments(), table.departments());
        Ok(())
    }

    #[test]
    fn validation_rejects_duplicates_and_bad_urls() {
        let raw = r#"{
            "precedence": ["hr", "hr"],
            "targets": [
                {"department": "HR", "group": "hr", "role": "hr",
                 "dashboard": "/hr/dashboard", "backend": "http://hr:8501"}
            ]
        }"#;
        assert!(RoutingTable::from_json(raw).is_err());

        let raw = r#"{
            "precedence": ["hr"],
            "targets": [
                {"department": "HR", "group": "hr", "role": "hr",
                 "dashboard": "/hr/dashboard", "backend": "not a url"}
            ]
        }"#;
        assert!(RoutingTable::from_json(raw).is_err());

        let raw = r#"{"precedence": [], "targets": []}"#;
        assert!(RoutingTable::from_json(raw).is_err());
    }
}
