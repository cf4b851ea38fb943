// src/models/user.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instructor" => Ok(Role::Instructor),
            "student" => Ok(Role::Student),
            other => Err(AppError::AuthError(format!("Unknown role '{}'", other))),
        }
    }
}

/// The authenticated caller, passed explicitly into every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn student(id: i64) -> Self {
        Self { id, role: Role::Student }
    }

    pub fn instructor(id: i64) -> Self {
        Self { id, role: Role::Instructor }
    }

    pub fn is_instructor(&self) -> bool {
        self.role == Role::Instructor
    }
}

/// An enrolled student, as supplied by the class roster.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
}
