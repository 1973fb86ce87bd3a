use crate::error::AttendanceError;
use crate::model::ids::TeacherId;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller identity placed in the request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to a teacher record
    pub teacher_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Not authenticated")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_admin_or_teacher(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Teacher) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin/Teacher only"))
        }
    }

    /// Teacher filter a report runs with. Teachers are pinned to their own
    /// id; other roles may ask for any teacher or none.
    pub fn teacher_scope(
        &self,
        requested: Option<TeacherId>,
    ) -> actix_web::Result<Option<TeacherId>> {
        if self.role != Role::Teacher {
            return Ok(requested);
        }
        let own = self.teacher_id.map(TeacherId).ok_or_else(|| {
            AttendanceError::PolicyViolation("Token is not linked to a teacher".into())
        })?;
        match requested {
            Some(other) if other != own => Err(AttendanceError::PolicyViolation(format!(
                "Teachers can only report on their own sessions, not teacher {other}"
            ))
            .into()),
            _ => Ok(Some(own)),
        }
    }
}
