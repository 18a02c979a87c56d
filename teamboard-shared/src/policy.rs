/// Access policy evaluator
///
/// This module centralizes every "can principal P do operation O on resource R"
/// decision in Teamboard, plus the equivalent list filters for "which resources
/// can P see". Route handlers load resources, call into this module, and map
/// the outcome to HTTP; no visibility rule lives anywhere else.
///
/// # Decision Model
///
/// Project visibility is evaluated in priority order:
///
/// 1. **Admin**: sees everything, no further checks
/// 2. **Owner**: always sees their own projects
/// 3. **Member**: always sees projects they belong to
/// 4. **Privacy**: private projects stop here; everyone else is denied
/// 5. **Department gate**: public projects tagged with a department are
///    visible to principals sharing that department
///
/// Task visibility inherits from the parent project, intersected with the
/// task's own privacy flag. Standalone tasks (no project) are visible only to
/// the creator, assignees, and admins.
///
/// The evaluator is pure: a deterministic function of (principal snapshot,
/// resource snapshot, operation) with no internal state. Principals must be
/// built from a just-fetched user record so department changes take effect on
/// the next request.
///
/// # Example
///
/// ```
/// use teamboard_shared::policy::{self, Principal, ProjectAccess, ProjectOp};
/// use teamboard_shared::models::user::Role;
/// use uuid::Uuid;
///
/// let user_id = Uuid::new_v4();
/// let principal = Principal::new(user_id, Role::Member, ["Sales"], true);
///
/// let project = ProjectAccess {
///     owner: Uuid::new_v4(),
///     members: vec![],
///     department: Some("Sales".to_string()),
///     is_private: false,
/// };
///
/// // Public Sales project, principal is in Sales: visible via the department gate
/// assert!(policy::check_project(&principal, &project, ProjectOp::View).is_ok());
///
/// // But not writable: update is owner-or-admin only
/// assert!(policy::check_project(&principal, &project, ProjectOp::Update).is_err());
/// ```

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::user::{Role, User};

/// Error taxonomy for policy decisions
///
/// Every denial is observable by the caller; the evaluator never swallows an
/// outcome. `NotFound` and `Forbidden` must never be conflated: an id that
/// does not resolve is `NotFound`, an existing resource the principal may not
/// touch is `Forbidden`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Resource id does not exist
    #[error("Resource not found")]
    NotFound,

    /// Resource exists but the principal lacks rights to it
    #[error("Access denied")]
    Forbidden,

    /// Request is structurally invalid (e.g., ambiguous department)
    #[error("{0}")]
    Validation(String),

    /// Principal exists but is deactivated; blocks all operations
    #[error("Account is deactivated")]
    InactiveAccount,
}

/// Operations on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOp {
    /// Read a single project or include it in a listing
    View,

    /// Modify project fields
    Update,

    /// Delete the project (cascades to its tasks)
    Delete,

    /// Add or remove project members
    ManageMembers,

    /// Toggle the favorite flag (read-level bar: a personal preference,
    /// not a shared mutation)
    Favorite,
}

/// Operations on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOp {
    /// Read a single task or include it in a listing
    View,

    /// Modify task fields (status, progress, assignment included)
    Update,

    /// Delete the task
    Delete,
}

/// Snapshot of the authenticated user, as the evaluator sees it
///
/// `departments` is the normalized union of the legacy single `department`
/// column and the newer `departments` array; policy logic never branches on
/// which field was present.
#[derive(Debug, Clone)]
pub struct Principal {
    /// User id
    pub id: Uuid,

    /// Baseline privilege
    pub role: Role,

    /// Normalized department set
    pub departments: HashSet<String>,

    /// Deactivated principals are blocked before any policy check
    pub is_active: bool,
}

impl Principal {
    /// Builds a principal directly from its parts
    pub fn new<I, S>(id: Uuid, role: Role, departments: I, is_active: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            role,
            departments: departments.into_iter().map(Into::into).collect(),
            is_active,
        }
    }

    /// Builds a principal from a freshly loaded user record
    ///
    /// Unions the legacy `department` field with the `departments` list so the
    /// rest of the evaluator sees a single set.
    pub fn from_user(user: &User) -> Self {
        let mut departments: HashSet<String> = user.departments.iter().cloned().collect();
        if let Some(ref dept) = user.department {
            departments.insert(dept.clone());
        }

        Self {
            id: user.id,
            role: user.role,
            departments,
            is_active: user.is_active,
        }
    }

    /// Checks membership in a department by name
    pub fn in_department(&self, name: &str) -> bool {
        self.departments.contains(name)
    }

    fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Snapshot of a project's policy-relevant fields
#[derive(Debug, Clone)]
pub struct ProjectAccess {
    /// Owning user id; always implicitly a member
    pub owner: Uuid,

    /// Member user ids
    pub members: Vec<Uuid>,

    /// Department the project is associated with, if any
    pub department: Option<String>,

    /// Private projects are visible to owner+members+admin only
    pub is_private: bool,
}

impl ProjectAccess {
    fn has_member(&self, user_id: Uuid) -> bool {
        self.owner == user_id || self.members.contains(&user_id)
    }
}

/// Snapshot of a task's policy-relevant fields
#[derive(Debug, Clone)]
pub struct TaskAccess {
    /// Parent project, if any; standalone tasks have none
    pub project_id: Option<Uuid>,

    /// Creator's user id
    pub assigned_by: Uuid,

    /// Assigned user ids
    pub assignees: Vec<Uuid>,

    /// Private tasks are visible to assignees+creator+admin only
    pub is_private: bool,
}

impl TaskAccess {
    fn has_direct_access(&self, user_id: Uuid) -> bool {
        self.assigned_by == user_id || self.assignees.contains(&user_id)
    }
}

/// Rejects deactivated principals
///
/// Checked before any policy evaluation; an inactive account can do nothing.
pub fn ensure_active(principal: &Principal) -> Result<(), PolicyError> {
    if !principal.is_active {
        return Err(PolicyError::InactiveAccount);
    }
    Ok(())
}

/// Project visibility: the ordered predicate
///
/// Admin, then owner, then member, then the privacy stop, then the department
/// gate. A public project with no department is visible only via the
/// owner/member rules.
pub fn can_view_project(principal: &Principal, project: &ProjectAccess) -> bool {
    if principal.is_admin() {
        return true;
    }
    if project.has_member(principal.id) {
        return true;
    }
    if project.is_private {
        return false;
    }
    match project.department {
        Some(ref dept) => principal.in_department(dept),
        None => false,
    }
}

/// Full project authorization check
///
/// - `View`: the ordered visibility predicate
/// - `Update` / `ManageMembers`: owner or admin
/// - `Delete`: owner, admin, or manager (the permissive variant of the
///   historical drift; a product decision, recorded in DESIGN.md)
/// - `Favorite`: owner or member (admin included)
///
/// # Errors
///
/// `InactiveAccount` for deactivated principals, `Forbidden` otherwise.
pub fn check_project(
    principal: &Principal,
    project: &ProjectAccess,
    op: ProjectOp,
) -> Result<(), PolicyError> {
    ensure_active(principal)?;

    let allowed = match op {
        ProjectOp::View => can_view_project(principal, project),
        ProjectOp::Update | ProjectOp::ManageMembers => {
            principal.is_admin() || project.owner == principal.id
        }
        ProjectOp::Delete => {
            principal.is_admin()
                || project.owner == principal.id
                || principal.role == Role::Manager
        }
        ProjectOp::Favorite => principal.is_admin() || project.has_member(principal.id),
    };

    if allowed {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

/// Guard for removing a member from a project
///
/// The owner can never be removed from its own members set, regardless of the
/// caller. Call after [`check_project`] with [`ProjectOp::ManageMembers`].
pub fn check_member_removal(project: &ProjectAccess, member: Uuid) -> Result<(), PolicyError> {
    if member == project.owner {
        return Err(PolicyError::Validation(
            "Cannot remove project owner from members".to_string(),
        ));
    }
    Ok(())
}

/// Resolves the department for a new project
///
/// - explicit department: must be one the creator belongs to, unless the
///   creator is an admin
/// - no department, creator in exactly one: auto-assigned
/// - no department, creator in none: the project stays personal (None)
/// - no department, creator in several: ambiguous, rejected
///
/// # Errors
///
/// `Validation` for an ambiguous or non-permitted department.
pub fn resolve_department(
    principal: &Principal,
    requested: Option<String>,
) -> Result<Option<String>, PolicyError> {
    match requested {
        Some(dept) => {
            if principal.is_admin() || principal.in_department(&dept) {
                Ok(Some(dept))
            } else {
                Err(PolicyError::Validation(format!(
                    "Not a member of department '{}'",
                    dept
                )))
            }
        }
        None => match principal.departments.len() {
            0 => Ok(None),
            1 => Ok(principal.departments.iter().next().cloned()),
            _ => Err(PolicyError::Validation(
                "Ambiguous department, must specify".to_string(),
            )),
        },
    }
}

/// Server-side filter selecting the projects a principal may see
///
/// Produced by [`project_filter`]. The SQL rendering lives in
/// `models::project::Project::list_visible`; [`ProjectFilter::matches`] is the
/// equivalent post-fetch predicate. Both must agree with
/// [`can_view_project`] for every (principal, project) pair. This is the evaluator's
/// central invariant, pinned by the tests below.
#[derive(Debug, Clone)]
pub enum ProjectFilter {
    /// Admins list everything
    Unrestricted,

    /// Everyone else: owner, member, or the public department gate
    Restricted {
        /// Principal's user id
        principal: Uuid,

        /// Principal's normalized department set, snapshotted at request time
        departments: Vec<String>,
    },
}

impl ProjectFilter {
    /// Post-fetch form of the filter
    pub fn matches(&self, project: &ProjectAccess) -> bool {
        match self {
            ProjectFilter::Unrestricted => true,
            ProjectFilter::Restricted {
                principal,
                departments,
            } => {
                project.has_member(*principal)
                    || (!project.is_private
                        && project
                            .department
                            .as_ref()
                            .is_some_and(|d| departments.iter().any(|pd| pd == d)))
            }
        }
    }
}

/// Builds the project list filter for a principal
pub fn project_filter(principal: &Principal) -> ProjectFilter {
    if principal.is_admin() {
        ProjectFilter::Unrestricted
    } else {
        ProjectFilter::Restricted {
            principal: principal.id,
            departments: principal.departments.iter().cloned().collect(),
        }
    }
}

/// Task visibility
///
/// A principal who cannot see the parent project cannot see its tasks. On top
/// of that, private tasks restrict to assignees, the creator, and admins.
/// Standalone tasks are direct-access only. A task pointing at a project that
/// could not be loaded is treated as invisible (fail closed).
pub fn can_view_task(
    principal: &Principal,
    task: &TaskAccess,
    parent: Option<&ProjectAccess>,
) -> bool {
    if principal.is_admin() {
        return true;
    }
    if task.has_direct_access(principal.id) {
        return true;
    }
    if task.is_private {
        return false;
    }
    match task.project_id {
        Some(_) => parent.is_some_and(|p| can_view_project(principal, p)),
        None => false,
    }
}

/// Full task authorization check
///
/// Visibility is a prerequisite for every operation. Beyond that, mutation is
/// open to admins, the creator, assignees, and the parent project's owner.
pub fn check_task(
    principal: &Principal,
    task: &TaskAccess,
    parent: Option<&ProjectAccess>,
    op: TaskOp,
) -> Result<(), PolicyError> {
    ensure_active(principal)?;

    if !can_view_task(principal, task, parent) {
        return Err(PolicyError::Forbidden);
    }

    let allowed = match op {
        TaskOp::View => true,
        TaskOp::Update | TaskOp::Delete => {
            principal.is_admin()
                || task.has_direct_access(principal.id)
                || parent.is_some_and(|p| p.owner == principal.id)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

/// Server-side filter selecting the tasks a principal may see
///
/// Mirrors [`ProjectFilter`]; the SQL rendering lives in
/// `models::task::Task::list_visible`.
#[derive(Debug, Clone)]
pub enum TaskFilter {
    /// Admins list everything
    Unrestricted,

    /// Everyone else: direct access, or a visible public task in a visible
    /// project
    Restricted {
        /// Principal's user id
        principal: Uuid,

        /// Principal's normalized department set, snapshotted at request time
        departments: Vec<String>,
    },
}

impl TaskFilter {
    /// Post-fetch form of the filter
    pub fn matches(&self, task: &TaskAccess, parent: Option<&ProjectAccess>) -> bool {
        match self {
            TaskFilter::Unrestricted => true,
            TaskFilter::Restricted {
                principal,
                departments,
            } => {
                if task.has_direct_access(*principal) {
                    return true;
                }
                if task.is_private || task.project_id.is_none() {
                    return false;
                }
                let project_filter = ProjectFilter::Restricted {
                    principal: *principal,
                    departments: departments.clone(),
                };
                parent.is_some_and(|p| project_filter.matches(p))
            }
        }
    }
}

/// Builds the task list filter for a principal
pub fn task_filter(principal: &Principal) -> TaskFilter {
    if principal.is_admin() {
        TaskFilter::Unrestricted
    } else {
        TaskFilter::Restricted {
            principal: principal.id,
            departments: principal.departments.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(departments: &[&str]) -> Principal {
        Principal::new(Uuid::new_v4(), Role::Member, departments.iter().copied(), true)
    }

    fn admin() -> Principal {
        Principal::new(Uuid::new_v4(), Role::Admin, Vec::<String>::new(), true)
    }

    fn project(owner: Uuid, department: Option<&str>, is_private: bool) -> ProjectAccess {
        ProjectAccess {
            owner,
            members: vec![owner],
            department: department.map(str::to_string),
            is_private,
        }
    }

    // P1: admins read and list every resource regardless of ownership,
    // membership, department, or privacy flag.
    #[test]
    fn test_admin_sees_everything() {
        let a = admin();
        let other = Uuid::new_v4();

        for is_private in [false, true] {
            for dept in [None, Some("Sales")] {
                let p = project(other, dept, is_private);
                assert!(can_view_project(&a, &p));
                assert!(check_project(&a, &p, ProjectOp::View).is_ok());
            }
        }

        let task = TaskAccess {
            project_id: None,
            assigned_by: other,
            assignees: vec![],
            is_private: true,
        };
        assert!(can_view_task(&a, &task, None));
    }

    // P2: owner and members bypass privacy and department checks.
    #[test]
    fn test_owner_and_member_bypass() {
        let owner = member(&[]);
        let teammate = member(&["Marketing"]);

        let mut p = project(owner.id, Some("Sales"), true);
        p.members.push(teammate.id);

        assert!(can_view_project(&owner, &p));
        assert!(can_view_project(&teammate, &p));
    }

    // P3: privacy excludes the department gate entirely.
    #[test]
    fn test_private_excludes_department_match() {
        let sales_user = member(&["Sales"]);
        let p = project(Uuid::new_v4(), Some("Sales"), true);

        assert!(!can_view_project(&sales_user, &p));
        assert_eq!(
            check_project(&sales_user, &p, ProjectOp::View),
            Err(PolicyError::Forbidden)
        );
    }

    // P4: the department gate on public projects.
    #[test]
    fn test_public_department_gate() {
        let sales_user = member(&["Sales"]);
        let marketing_user = member(&["Marketing"]);
        let p = project(Uuid::new_v4(), Some("Sales"), false);

        assert!(can_view_project(&sales_user, &p));
        assert!(!can_view_project(&marketing_user, &p));
    }

    // P5: a public project without a department never matches via departments.
    #[test]
    fn test_null_department_isolation() {
        let sales_user = member(&["Sales"]);
        let p = project(Uuid::new_v4(), None, false);

        assert!(!can_view_project(&sales_user, &p));
    }

    // P6: filter and single check agree for every (principal, project) pair.
    #[test]
    fn test_filter_single_check_equivalence() {
        let owner_id = Uuid::new_v4();
        let member_id = Uuid::new_v4();

        let principals = vec![
            admin(),
            member(&["Sales"]),
            member(&["Marketing"]),
            member(&["Sales", "Ops"]),
            member(&[]),
            Principal::new(owner_id, Role::Member, ["Ops"], true),
            Principal::new(member_id, Role::Guest, Vec::<String>::new(), true),
            Principal::new(Uuid::new_v4(), Role::Manager, ["Sales"], true),
        ];

        let mut projects = Vec::new();
        for is_private in [false, true] {
            for dept in [None, Some("Sales"), Some("Ops")] {
                let mut p = project(owner_id, dept, is_private);
                p.members.push(member_id);
                projects.push(p);
            }
        }

        for principal in &principals {
            let filter = project_filter(principal);
            for p in &projects {
                assert_eq!(
                    filter.matches(p),
                    can_view_project(principal, p),
                    "filter/check divergence for role={:?} departments={:?} project={:?}",
                    principal.role,
                    principal.departments,
                    p
                );
            }
        }
    }

    // P6, task form: task filter agrees with the single task check.
    #[test]
    fn test_task_filter_equivalence() {
        let owner_id = Uuid::new_v4();
        let assignee_id = Uuid::new_v4();
        let project_id = Uuid::new_v4();

        let principals = vec![
            admin(),
            member(&["Sales"]),
            member(&["Marketing"]),
            Principal::new(owner_id, Role::Member, Vec::<String>::new(), true),
            Principal::new(assignee_id, Role::Member, Vec::<String>::new(), true),
        ];

        let parent = project(owner_id, Some("Sales"), false);

        let mut tasks = Vec::new();
        for is_private in [false, true] {
            for pid in [None, Some(project_id)] {
                tasks.push(TaskAccess {
                    project_id: pid,
                    assigned_by: owner_id,
                    assignees: vec![assignee_id],
                    is_private,
                });
            }
        }

        for principal in &principals {
            let filter = task_filter(principal);
            for t in &tasks {
                let parent_ref = t.project_id.map(|_| &parent);
                assert_eq!(
                    filter.matches(t, parent_ref),
                    can_view_task(principal, t, parent_ref),
                    "task filter divergence for departments={:?} task={:?}",
                    principal.departments,
                    t
                );
            }
        }
    }

    // P7: the owner can never be removed from members, not even by an admin.
    #[test]
    fn test_owner_removal_always_rejected() {
        let owner_id = Uuid::new_v4();
        let p = project(owner_id, None, false);

        assert!(matches!(
            check_member_removal(&p, owner_id),
            Err(PolicyError::Validation(_))
        ));

        // Removing anyone else passes the guard
        assert!(check_member_removal(&p, Uuid::new_v4()).is_ok());
    }

    // P8 (evaluator half): denial on an existing resource is Forbidden, which
    // is distinguishable from NotFound.
    #[test]
    fn test_forbidden_distinct_from_not_found() {
        let outsider = member(&[]);
        let p = project(Uuid::new_v4(), None, true);

        let denial = check_project(&outsider, &p, ProjectOp::View).unwrap_err();
        assert_eq!(denial, PolicyError::Forbidden);
        assert_ne!(denial, PolicyError::NotFound);
    }

    #[test]
    fn test_inactive_account_blocks_everything() {
        let mut p = member(&["Sales"]);
        p.is_active = false;

        let own_project = project(p.id, None, false);
        assert_eq!(
            check_project(&p, &own_project, ProjectOp::View),
            Err(PolicyError::InactiveAccount)
        );
        assert_eq!(ensure_active(&p), Err(PolicyError::InactiveAccount));
    }

    #[test]
    fn test_project_update_is_owner_or_admin() {
        let owner = member(&[]);
        let manager = Principal::new(Uuid::new_v4(), Role::Manager, ["Sales"], true);
        let p = project(owner.id, Some("Sales"), false);

        assert!(check_project(&owner, &p, ProjectOp::Update).is_ok());
        assert!(check_project(&admin(), &p, ProjectOp::Update).is_ok());
        assert_eq!(
            check_project(&manager, &p, ProjectOp::Update),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_project_delete_includes_managers() {
        let owner = member(&[]);
        let manager = Principal::new(Uuid::new_v4(), Role::Manager, Vec::<String>::new(), true);
        let plain = member(&["Sales"]);
        let p = project(owner.id, Some("Sales"), false);

        assert!(check_project(&owner, &p, ProjectOp::Delete).is_ok());
        assert!(check_project(&admin(), &p, ProjectOp::Delete).is_ok());
        assert!(check_project(&manager, &p, ProjectOp::Delete).is_ok());
        assert_eq!(
            check_project(&plain, &p, ProjectOp::Delete),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_member_management_is_owner_or_admin() {
        let owner = member(&[]);
        let teammate = member(&[]);
        let mut p = project(owner.id, None, false);
        p.members.push(teammate.id);

        assert!(check_project(&owner, &p, ProjectOp::ManageMembers).is_ok());
        assert!(check_project(&admin(), &p, ProjectOp::ManageMembers).is_ok());
        // Plain members cannot manage the roster
        assert_eq!(
            check_project(&teammate, &p, ProjectOp::ManageMembers),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_favorite_is_read_level() {
        let owner = member(&[]);
        let teammate = member(&[]);
        let dept_viewer = member(&["Sales"]);
        let mut p = project(owner.id, Some("Sales"), false);
        p.members.push(teammate.id);

        assert!(check_project(&owner, &p, ProjectOp::Favorite).is_ok());
        assert!(check_project(&teammate, &p, ProjectOp::Favorite).is_ok());
        // Department-gate visibility alone does not grant the toggle
        assert_eq!(
            check_project(&dept_viewer, &p, ProjectOp::Favorite),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_private_task_restricts_within_visible_project() {
        let owner = member(&[]);
        let teammate = member(&[]);
        let assignee = member(&[]);
        let project_id = Uuid::new_v4();

        let mut parent = project(owner.id, None, false);
        parent.members.extend([teammate.id, assignee.id]);

        let task = TaskAccess {
            project_id: Some(project_id),
            assigned_by: owner.id,
            assignees: vec![assignee.id],
            is_private: true,
        };

        // Assignee and creator see it; a mere project member does not
        assert!(can_view_task(&assignee, &task, Some(&parent)));
        assert!(can_view_task(&owner, &task, Some(&parent)));
        assert!(!can_view_task(&teammate, &task, Some(&parent)));
        assert!(can_view_task(&admin(), &task, Some(&parent)));
    }

    #[test]
    fn test_task_invisible_when_project_is() {
        let outsider = member(&["Marketing"]);
        let parent = project(Uuid::new_v4(), Some("Sales"), false);

        let task = TaskAccess {
            project_id: Some(Uuid::new_v4()),
            assigned_by: parent.owner,
            assignees: vec![],
            is_private: false,
        };

        assert!(!can_view_task(&outsider, &task, Some(&parent)));
        assert_eq!(
            check_task(&outsider, &task, Some(&parent), TaskOp::View),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_standalone_task_is_direct_access_only() {
        let creator = member(&["Sales"]);
        let assignee = member(&[]);
        let bystander = member(&["Sales"]);

        let task = TaskAccess {
            project_id: None,
            assigned_by: creator.id,
            assignees: vec![assignee.id],
            is_private: false,
        };

        assert!(can_view_task(&creator, &task, None));
        assert!(can_view_task(&assignee, &task, None));
        assert!(!can_view_task(&bystander, &task, None));
    }

    #[test]
    fn test_task_with_unresolvable_project_fails_closed() {
        let bystander = member(&["Sales"]);
        let task = TaskAccess {
            project_id: Some(Uuid::new_v4()),
            assigned_by: Uuid::new_v4(),
            assignees: vec![],
            is_private: false,
        };

        assert!(!can_view_task(&bystander, &task, None));
    }

    #[test]
    fn test_task_mutation_rights() {
        let owner = member(&[]);
        let assignee = member(&[]);
        let teammate = member(&[]);
        let project_id = Uuid::new_v4();

        let mut parent = project(owner.id, None, false);
        parent.members.extend([assignee.id, teammate.id]);

        let task = TaskAccess {
            project_id: Some(project_id),
            assigned_by: owner.id,
            assignees: vec![assignee.id],
            is_private: false,
        };

        assert!(check_task(&assignee, &task, Some(&parent), TaskOp::Update).is_ok());
        assert!(check_task(&owner, &task, Some(&parent), TaskOp::Delete).is_ok());
        // Visible but not involved: read yes, write no
        assert!(check_task(&teammate, &task, Some(&parent), TaskOp::View).is_ok());
        assert_eq!(
            check_task(&teammate, &task, Some(&parent), TaskOp::Update),
            Err(PolicyError::Forbidden)
        );
    }

    #[test]
    fn test_resolve_department_auto_assign_single() {
        // Scenario: creator belongs to exactly one department, none specified
        let p = member(&["Ops"]);
        assert_eq!(
            resolve_department(&p, None),
            Ok(Some("Ops".to_string()))
        );
    }

    #[test]
    fn test_resolve_department_none_for_departmentless_creator() {
        let p = member(&[]);
        assert_eq!(resolve_department(&p, None), Ok(None));
    }

    #[test]
    fn test_resolve_department_ambiguous() {
        // Scenario: creator belongs to several departments, none specified
        let p = member(&["Sales", "Ops"]);
        assert!(matches!(
            resolve_department(&p, None),
            Err(PolicyError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_department_explicit_must_be_own() {
        let p = member(&["Sales"]);
        assert_eq!(
            resolve_department(&p, Some("Sales".to_string())),
            Ok(Some("Sales".to_string()))
        );
        assert!(matches!(
            resolve_department(&p, Some("Ops".to_string())),
            Err(PolicyError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_department_admin_unrestricted() {
        let a = admin();
        assert_eq!(
            resolve_department(&a, Some("Ops".to_string())),
            Ok(Some("Ops".to_string()))
        );
    }

    #[test]
    fn test_principal_from_user_normalizes_departments() {
        let user = User::sample_with_departments(Some("Sales"), &["Sales", "Ops"]);
        let principal = Principal::from_user(&user);

        // Legacy single field and the list are unioned, no duplicates
        assert_eq!(principal.departments.len(), 2);
        assert!(principal.in_department("Sales"));
        assert!(principal.in_department("Ops"));

        let legacy_only = User::sample_with_departments(Some("HR"), &[]);
        let principal = Principal::from_user(&legacy_only);
        assert!(principal.in_department("HR"));
    }

    // Concrete scenarios 1-4: the mixed-role walkthrough.
    #[test]
    fn test_scenario_walkthrough() {
        let u2 = Uuid::new_v4();
        let u9 = Uuid::new_v4();

        let a = admin();
        let m = Principal::new(Uuid::new_v4(), Role::Manager, ["Sales"], true);
        let x = member(&["Marketing"]);

        // P1: public Sales project owned by U2
        let p1 = ProjectAccess {
            owner: u2,
            members: vec![u2],
            department: Some("Sales".to_string()),
            is_private: false,
        };
        assert!(can_view_project(&a, &p1));

        // P2: public Sales project, M not a member -> department gate grants
        let p2 = ProjectAccess {
            owner: u9,
            members: vec![u9],
            department: Some("Sales".to_string()),
            is_private: false,
        };
        assert!(can_view_project(&m, &p2));

        // P3: same but private -> denied despite matching department
        let p3 = ProjectAccess {
            is_private: true,
            ..p2.clone()
        };
        assert_eq!(
            check_project(&m, &p3, ProjectOp::View),
            Err(PolicyError::Forbidden)
        );

        // Mismatched department on the public project -> denied
        assert!(!can_view_project(&x, &p2));
    }
}
