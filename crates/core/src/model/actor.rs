use crate::model::ids::ActorId;

/// Role carried by the current actor. Used for attribution only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorRole {
    Student,
    Instructor,
    Admin,
}

impl ActorRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::Student => "student",
            ActorRole::Instructor => "instructor",
            ActorRole::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The person on whose behalf a service call runs.
///
/// Passed explicitly into every service that needs it; nothing reads it from
/// ambient process state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub display_name: String,
    pub role: ActorRole,
}

impl Actor {
    #[must_use]
    pub fn new(id: ActorId, display_name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
        }
    }

    #[must_use]
    pub fn student(id: ActorId, display_name: impl Into<String>) -> Self {
        Self::new(id, display_name, ActorRole::Student)
    }
}
