use zyra_auth::Role;
use zyra_core::SubjectId;

/// Admitted caller for a request.
///
/// Inserted by the admission middleware; present on every role-gated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext {
    subject_id: SubjectId,
    role: Role,
}

impl SubjectContext {
    pub fn new(subject_id: SubjectId, role: Role) -> Self {
        Self { subject_id, role }
    }

    pub fn subject_id(&self) -> &SubjectId {
        &self.subject_id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}
