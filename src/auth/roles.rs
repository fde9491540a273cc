// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Marketplace roles and the capabilities they grant.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Account role.
///
/// Stored on the local account record; the identity provider's copy is only
/// consulted when an account is first created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Buys and consumes courses
    #[default]
    Student,
    /// Publishes and maintains own courses
    Teacher,
    /// Platform operator
    Admin,
}

/// A single permission checked by request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Browse the catalog and purchase courses
    ReadCourse,
    /// Create courses and modify the ones you own
    WriteOwnCourse,
    /// Modify or delete any course
    WriteAnyCourse,
    /// User management, platform statistics, audit log
    AdminManage,
}

impl Role {
    /// Capabilities granted by this role.
    pub fn capabilities(&self) -> &'static [Capability] {
        match self {
            Role::Student => &[Capability::ReadCourse],
            Role::Teacher => &[Capability::ReadCourse, Capability::WriteOwnCourse],
            Role::Admin => &[
                Capability::ReadCourse,
                Capability::WriteOwnCourse,
                Capability::WriteAnyCourse,
                Capability::AdminManage,
            ],
        }
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Parse a role name (case-insensitive).
    ///
    /// Accepts `educator` and `instructor` as aliases of `teacher`, which is
    /// what the identity provider metadata uses for some tenants.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" | "educator" | "instructor" => Some(Role::Teacher),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Teacher => write!(f, "teacher"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Capability::ReadCourse => "read-course",
            Capability::WriteOwnCourse => "write-own-course",
            Capability::WriteAnyCourse => "write-any-course",
            Capability::AdminManage => "admin-manage",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_can_only_read() {
        assert!(Role::Student.can(Capability::ReadCourse));
        assert!(!Role::Student.can(Capability::WriteOwnCourse));
        assert!(!Role::Student.can(Capability::WriteAnyCourse));
        assert!(!Role::Student.can(Capability::AdminManage));
    }

    #[test]
    fn teacher_writes_own_courses_only() {
        assert!(Role::Teacher.can(Capability::ReadCourse));
        assert!(Role::Teacher.can(Capability::WriteOwnCourse));
        assert!(!Role::Teacher.can(Capability::WriteAnyCourse));
        assert!(!Role::Teacher.can(Capability::AdminManage));
    }

    #[test]
    fn admin_has_every_capability() {
        for capability in [
            Capability::ReadCourse,
            Capability::WriteOwnCourse,
            Capability::WriteAnyCourse,
            Capability::AdminManage,
        ] {
            assert!(Role::Admin.can(capability), "admin lacks {capability}");
        }
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse(" educator "), Some(Role::Teacher));
        assert_eq!(Role::parse("student"), Some(Role::Student));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Teacher).unwrap(), "\"teacher\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!(
            serde_json::to_string(&Capability::WriteAnyCourse).unwrap(),
            "\"write-any-course\""
        );
    }

    #[test]
    fn default_role_is_student() {
        assert_eq!(Role::default(), Role::Student);
    }
}
