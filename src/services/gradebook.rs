// src/services/gradebook.rs

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        assignment::{
            Assignment, AssignmentSubmission, CreateAssignmentRequest, GradeAssignmentRequest,
        },
        gradebook::{GradeRow, Gradebook},
        quiz::QuizDetail,
        submission::Submission,
        user::{Actor, Student},
    },
    services::scoring,
    store::{NewAssignment, QuizStore},
    utils::html::clean_html,
};

pub const STUDENT_COLUMN: &str = "Student";
pub const AVERAGE_COLUMN: &str = "Average";

/// Rounds to 2 decimals, half away from zero, on the value's shortest decimal form.
///
/// The shift by 100 goes through that decimal text, so `1.005` rounds to
/// `1.01` instead of following its binary value `1.00499..` down to `1.0`.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let shifted = format!("{}e2", value)
        .parse::<f64>()
        .unwrap_or(value * 100.0);
    shifted.round() / 100.0
}

/// Quiz cell: `score / total * 100`, where `total` comes from the quiz's current questions.
pub fn quiz_percentage(score: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    round2(score as f64 / total as f64 * 100.0)
}

/// Builds the grade table for one class.
///
/// Assignment cells hold the raw stored grade (0 when ungraded); quiz cells
/// hold percentages (0 when not attempted). The average weighs every column
/// equally, so the two scales are mixed as-is.
pub fn aggregate(
    roster: &[Student],
    assignments: &[Assignment],
    assignment_submissions: &[AssignmentSubmission],
    quizzes: &[QuizDetail],
    submissions: &[Submission],
) -> Gradebook {
    let grades: HashMap<(i64, i64), f64> = assignment_submissions
        .iter()
        .map(|s| ((s.assignment_id, s.student_id), s.grade_value()))
        .collect();

    let scores: HashMap<(i64, i64), i64> = submissions
        .iter()
        .map(|s| ((s.quiz_id, s.student_id), s.score))
        .collect();

    let totals: Vec<(i64, i64)> = quizzes
        .iter()
        .map(|q| (q.quiz.id, scoring::total_possible(q.question_rows())))
        .collect();

    let mut columns = Vec::with_capacity(assignments.len() + quizzes.len() + 2);
    columns.push(STUDENT_COLUMN.to_string());
    columns.extend(assignments.iter().map(|a| a.title.clone()));
    columns.extend(quizzes.iter().map(|q| q.quiz.title.clone()));
    columns.push(AVERAGE_COLUMN.to_string());

    let rows = roster
        .iter()
        .map(|student| {
            let mut cells: Vec<f64> = assignments
                .iter()
                .map(|a| grades.get(&(a.id, student.id)).copied().unwrap_or(0.0))
                .collect();

            cells.extend(totals.iter().map(|(quiz_id, total)| {
                scores
                    .get(&(*quiz_id, student.id))
                    .map(|score| quiz_percentage(*score, *total))
                    .unwrap_or(0.0)
            }));

            let average = if cells.is_empty() {
                0.0
            } else {
                round2(cells.iter().sum::<f64>() / cells.len() as f64)
            };

            GradeRow {
                student_id: student.id,
                student: student.name.clone(),
                cells,
                average,
            }
        })
        .collect();

    Gradebook { columns, rows }
}

pub async fn gradebook_for_class(
    store: &dyn QuizStore,
    actor: Actor,
    class_id: i64,
) -> Result<Gradebook, AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can view the gradebook".to_string()));
    }
    if !store.class_exists(class_id).await? {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    let roster = store.class_roster(class_id).await?;
    let assignments = store.list_assignments(class_id).await?;
    let assignment_submissions = store.list_assignment_submissions(class_id).await?;
    let quizzes = store.list_quizzes(class_id).await?;
    let submissions = store.list_class_submissions(class_id).await?;

    Ok(aggregate(
        &roster,
        &assignments,
        &assignment_submissions,
        &quizzes,
        &submissions,
    ))
}

pub async fn create_assignment(
    store: &dyn QuizStore,
    actor: Actor,
    class_id: i64,
    req: CreateAssignmentRequest,
) -> Result<Assignment, AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can create assignments".to_string()));
    }
    if !store.class_exists(class_id).await? {
        return Err(AppError::NotFound("Class not found".to_string()));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::invalid("title", "blank", "title must not be blank"));
    }

    store
        .insert_assignment(NewAssignment {
            class_id,
            title: clean_html(req.title.trim()),
            description: req.description.as_deref().map(clean_html),
            due_date: req.due_date,
        })
        .await
}

pub async fn grade_assignment(
    store: &dyn QuizStore,
    actor: Actor,
    assignment_id: i64,
    student_id: i64,
    req: GradeAssignmentRequest,
) -> Result<AssignmentSubmission, AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can grade assignments".to_string()));
    }

    let assignment = store
        .get_assignment(assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    if !store.is_enrolled(assignment.class_id, student_id).await? {
        return Err(AppError::NotFound("Student is not enrolled in this class".to_string()));
    }

    let grade = req.grade.trim().to_string();
    let row = store
        .upsert_assignment_grade(assignment_id, student_id, grade, req.feedback)
        .await?;

    tracing::info!(assignment_id, student_id, grade = ?row.grade, "assignment graded");
    Ok(row)
}
