use serde::{Deserialize, Serialize};

use super::ids::{ClassId, StudentId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub class_id: ClassId,
    /// Barcode printed on the student card (the student number).
    pub scan_token: String,
}
