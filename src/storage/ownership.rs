// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for authored resources.
//!
//! A write is allowed when the actor holds `write-any-course`, or when the
//! actor owns the resource and holds `write-own-course`.

use crate::auth::Capability;

use super::{StoreError, StoreResult, StoredAccount, StoredCourse};

/// A resource with a single owning account.
pub trait OwnedResource {
    /// Local account id of the owner.
    fn owner_id(&self) -> &str;

    /// Human-readable name for error messages and audit records.
    fn resource_label(&self) -> String;
}

pub trait OwnershipEnforcer {
    /// # Errors
    /// Returns `StoreError::PermissionDenied` if `actor` may not modify this resource.
    fn authorize_write(&self, actor: &StoredAccount) -> StoreResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn authorize_write(&self, actor: &StoredAccount) -> StoreResult<()> {
        let role = actor.role;
        let allowed = role.can(Capability::WriteAnyCourse)
            || (self.owner_id() == actor.id && role.can(Capability::WriteOwnCourse));
        if allowed {
            Ok(())
        } else {
            Err(StoreError::PermissionDenied {
                actor_id: actor.id.clone(),
                resource: self.resource_label(),
            })
        }
    }
}

/// Full lecture and note content is visible to enrolled students, the
/// owning instructor, and admins.
pub fn can_view_content(course: &StoredCourse, viewer: &StoredAccount) -> bool {
    viewer.is_enrolled(&course.id)
        || course.students_enrolled.contains(&viewer.id)
        || course.instructor_id == viewer.id
        || viewer.role.can(Capability::WriteAnyCourse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn account(role: Role) -> StoredAccount {
        StoredAccount::new(format!("user_{role}"), format!("{role}@example.com"), "Someone", role)
    }

    #[test]
    fn owner_with_write_own_may_edit() {
        let teacher = account(Role::Teacher);
        let course = StoredCourse::new(&teacher, "Mine", "", 10, "x");
        assert!(course.authorize_write(&teacher).is_ok());
    }

    #[test]
    fn other_teacher_is_denied() {
        let owner = account(Role::Teacher);
        let rival = StoredAccount::new("user_rival", "rival@example.com", "Rival", Role::Teacher);
        let course = StoredCourse::new(&owner, "Mine", "", 10, "x");
        let result = course.authorize_write(&rival);
        assert!(matches!(result, Err(StoreError::PermissionDenied { .. })));
    }

    #[test]
    fn admin_may_edit_any_course() {
        let owner = account(Role::Teacher);
        let course = StoredCourse::new(&owner, "Mine", "", 10, "x");
        assert!(course.authorize_write(&account(Role::Admin)).is_ok());
    }

    #[test]
    fn demoted_owner_loses_write_access() {
        let mut owner = account(Role::Teacher);
        let course = StoredCourse::new(&owner, "Mine", "", 10, "x");
        owner.role = Role::Student;
        assert!(course.authorize_write(&owner).is_err());
    }

    #[test]
    fn content_visibility() {
        let owner = account(Role::Teacher);
        let course = StoredCourse::new(&owner, "Mine", "", 10, "x");
        let mut buyer = account(Role::Student);
        let stranger = StoredAccount::new("user_x", "x@example.com", "X", Role::Student);

        assert!(can_view_content(&course, &owner));
        assert!(can_view_content(&course, &account(Role::Admin)));
        assert!(!can_view_content(&course, &stranger));

        buyer.enrolled_courses.insert(course.id.clone());
        assert!(can_view_content(&course, &buyer));
    }
}
