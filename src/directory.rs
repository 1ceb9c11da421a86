use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

/// On-disk shape of the identity table. Group and department assignments
/// are keyed by user name; instructors see every cohort.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub instructors: Vec<String>,
    #[serde(default)]
    pub faculty_groups: BTreeMap<String, Vec<i64>>,
    #[serde(default)]
    pub faculty_departments: BTreeMap<String, String>,
    /// Users allowed to mutate the roster. Defaults to the instructors.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Instructor,
    Faculty,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub name: String,
    pub role: Role,
    pub groups: Vec<i64>,
    pub department: Option<String>,
}

impl UserProfile {
    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }
}

/// Static identity/role table, built once at startup and passed by
/// reference into the request handlers. Read-only at runtime.
#[derive(Debug, Clone)]
pub struct Directory {
    users: BTreeMap<String, UserProfile>,
    admins: BTreeSet<String>,
    all_groups: Vec<i64>,
}

impl Directory {
    pub fn from_config(cfg: DirectoryConfig) -> Directory {
        let mut users = BTreeMap::new();
        let mut all_groups = BTreeSet::new();

        for name in &cfg.instructors {
            users.insert(
                name.clone(),
                UserProfile {
                    name: name.clone(),
                    role: Role::Instructor,
                    groups: Vec::new(),
                    department: None,
                },
            );
        }
        for (name, groups) in &cfg.faculty_groups {
            all_groups.extend(groups.iter().copied());
            let entry = users.entry(name.clone()).or_insert_with(|| UserProfile {
                name: name.clone(),
                role: Role::Faculty,
                groups: Vec::new(),
                department: None,
            });
            entry.groups = {
                let mut g = groups.clone();
                g.sort_unstable();
                g.dedup();
                g
            };
        }
        for (name, dept) in &cfg.faculty_departments {
            let entry = users.entry(name.clone()).or_insert_with(|| UserProfile {
                name: name.clone(),
                role: Role::Faculty,
                groups: Vec::new(),
                department: None,
            });
            entry.department = Some(dept.clone());
        }

        let admins: BTreeSet<String> = if cfg.admins.is_empty() {
            cfg.instructors.iter().cloned().collect()
        } else {
            cfg.admins.iter().cloned().collect()
        };

        Directory {
            users,
            admins,
            all_groups: all_groups.into_iter().collect(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Directory> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read directory file {}", path.to_string_lossy()))?;
        let cfg: DirectoryConfig = serde_json::from_str(&text)
            .with_context(|| format!("directory file {} is invalid JSON", path.to_string_lossy()))?;
        Ok(Directory::from_config(cfg))
    }

    /// The default table shipped with the service, used when no directory
    /// file is configured.
    pub fn builtin() -> Directory {
        let cfg = DirectoryConfig {
            instructors: vec!["Ms. Khushali".to_string(), "Mr. Dhruv".to_string()],
            faculty_groups: [
                ("Ms. Yashvi Donga", vec![1, 2]),
                ("Ms. Khushi Jodhani", vec![4, 9]),
                ("Ms. Yashvi Kankotiya", vec![3]),
                ("Mr. Yug Shah", vec![5]),
                ("Ms. Darshana Nasit", vec![6]),
                ("Mr. Raj Vyas", vec![8, 10]),
                ("Mr. Mihir Rathod", vec![7]),
                ("Mr. Nihar Thakkar", vec![11, 12]),
                ("Mr. Chaitany Thakar", vec![13, 14]),
                ("Ms. Srushti Jasoliya", vec![15, 18]),
                ("Ms. Brinda Varsani", vec![16, 20]),
                ("Mr. Tirth Avaiya", vec![17, 19]),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            faculty_departments: BTreeMap::new(),
            admins: Vec::new(),
        };
        Directory::from_config(cfg)
    }

    pub fn lookup(&self, name: &str) -> Option<&UserProfile> {
        self.users.get(name)
    }

    pub fn is_admin(&self, name: &str) -> bool {
        self.admins.contains(name)
    }

    /// All known user names, sorted, for the login page.
    pub fn user_names(&self) -> Vec<String> {
        self.users.keys().cloned().collect()
    }

    /// Groups visible to a user: instructors see every configured group,
    /// faculty see only their assignments.
    pub fn groups_for(&self, name: &str) -> Vec<i64> {
        match self.users.get(name) {
            Some(u) if u.is_instructor() => self.all_groups.clone(),
            Some(u) => u.groups.clone(),
            None => Vec::new(),
        }
    }

    pub fn may_mark_group(&self, name: &str, group: i64) -> bool {
        match self.users.get(name) {
            Some(u) => u.is_instructor() || u.groups.contains(&group),
            None => false,
        }
    }

    pub fn may_mark_department(&self, name: &str, department: &str) -> bool {
        match self.users.get(name) {
            Some(u) => u.is_instructor() || u.department.as_deref() == Some(department),
            None => false,
        }
    }
}
