// src/models/gradebook.rs

use serde::Serialize;

/// Per-class grade table. `columns` is `[Student, assignment titles.., quiz titles.., Average]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradebook {
    pub columns: Vec<String>,
    pub rows: Vec<GradeRow>,
}

/// One student's row. `cells` lines up with the columns between `Student` and `Average`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeRow {
    pub student_id: i64,
    pub student: String,
    pub cells: Vec<f64>,
    pub average: f64,
}
