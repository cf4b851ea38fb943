// src/services/builder.rs

use validator::Validate;

use crate::{
    config::{DEFAULT_ESSAY_MAX_SCORE, DEFAULT_ESSAY_MIN_SCORE},
    error::{AppError, FieldError, field_errors},
    models::{
        question::{NewChoice, NewQuestion, QuestionSpec, QuestionType},
        quiz::{CreateQuizRequest, NewQuiz, QuizDetail, QuizType},
        user::Actor,
    },
    store::QuizStore,
    utils::html::clean_html,
};

/// Validates a create-quiz request and turns it into a persistable aggregate.
///
/// Every problem is collected before returning, so the caller sees all bad
/// fields at once. Choice rows with an empty label or text are dropped
/// silently; that is not an error.
pub fn build_quiz(req: &CreateQuizRequest) -> Result<NewQuiz, AppError> {
    let mut errors = match req.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors("", &e),
    };

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        errors.push(FieldError::new("title", "blank", "title must not be blank"));
    }

    let quiz_type = req.quiz_type.as_deref().and_then(|raw| {
        let parsed = raw.parse::<QuizType>().ok();
        if parsed.is_none() {
            errors.push(FieldError::new(
                "quiz_type",
                "invalid_choice",
                format!("quiz_type must be 'objective' or 'essay', got '{}'", raw),
            ));
        }
        parsed
    });

    if let (Some(start), Some(end)) = (req.start_time, req.end_time) {
        if end <= start {
            errors.push(FieldError::new(
                "end_time",
                "after_start",
                "end_time must be after start_time",
            ));
        }
    }

    if req.questions.as_ref().is_some_and(Vec::is_empty) {
        errors.push(FieldError::new(
            "questions",
            "length",
            "at least one question is required",
        ));
    }

    let questions: Vec<Option<NewQuestion>> = req
        .questions
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, draft)| build_question(&format!("questions[{}]", i), draft, &mut errors))
        .collect();

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let (
        Some(class_id),
        Some(title),
        Some(start_time),
        Some(end_time),
        Some(duration_minutes),
        Some(quiz_type),
    ) = (
        req.class_id,
        req.title.as_deref(),
        req.start_time,
        req.end_time,
        req.duration_minutes,
        quiz_type,
    )
    else {
        return Err(AppError::invalid("quiz", "required", "quiz fields are incomplete"));
    };

    let questions: Option<Vec<NewQuestion>> = questions.into_iter().collect();
    let questions = questions
        .filter(|qs| !qs.is_empty())
        .ok_or_else(|| {
            AppError::invalid("questions", "length", "at least one question is required")
        })?;

    Ok(NewQuiz {
        class_id,
        title: clean_html(title.trim()),
        description: req
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(clean_html),
        start_time,
        end_time,
        duration_minutes,
        quiz_type,
        questions,
    })
}

fn build_question(
    prefix: &str,
    draft: &QuestionSpec,
    errors: &mut Vec<FieldError>,
) -> Option<NewQuestion> {
    let before = errors.len();

    if let Err(e) = draft.validate() {
        errors.extend(field_errors(prefix, &e));
    }

    let text = draft.question_text.as_deref().map(str::trim);
    if text == Some("") {
        errors.push(FieldError::new(
            format!("{}.question_text", prefix),
            "blank",
            "question_text must not be blank",
        ));
    }

    let question_type = draft.question_type.as_deref().and_then(|raw| {
        let parsed = raw.parse::<QuestionType>().ok();
        if parsed.is_none() {
            errors.push(FieldError::new(
                format!("{}.type", prefix),
                "invalid_choice",
                format!(
                    "type must be one of multiple_choice, identification, essay; got '{}'",
                    raw
                ),
            ));
        }
        parsed
    });

    let correct_answer = non_blank(draft.correct_answer.as_deref());
    let reference_answer = non_blank(draft.reference_answer.as_deref());

    let (min_score, max_score) = match question_type {
        Some(QuestionType::MultipleChoice | QuestionType::Identification) => {
            if correct_answer.is_none() {
                errors.push(FieldError::new(
                    format!("{}.correct_answer", prefix),
                    "required",
                    "correct_answer is required for multiple_choice and identification",
                ));
            }
            (DEFAULT_ESSAY_MIN_SCORE, DEFAULT_ESSAY_MAX_SCORE)
        }
        Some(QuestionType::Essay) => {
            let min = draft.min_score.unwrap_or(DEFAULT_ESSAY_MIN_SCORE);
            let max = draft.max_score.unwrap_or(DEFAULT_ESSAY_MAX_SCORE);
            if max <= 0 {
                errors.push(FieldError::new(
                    format!("{}.max_score", prefix),
                    "range",
                    "max_score must be positive",
                ));
            }
            if min < 0 || min > max {
                errors.push(FieldError::new(
                    format!("{}.min_score", prefix),
                    "range",
                    "min_score must be between 0 and max_score",
                ));
            }
            (min, max)
        }
        None => (DEFAULT_ESSAY_MIN_SCORE, DEFAULT_ESSAY_MAX_SCORE),
    };

    if errors.len() > before {
        return None;
    }
    let question_type = question_type?;
    let question_text = clean_html(text?);

    let choices = match question_type {
        QuestionType::MultipleChoice => draft
            .choices
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|c| {
                let label = non_blank(c.label.as_deref())?;
                let text = non_blank(c.text.as_deref())?;
                Some(NewChoice { label, text })
            })
            .collect(),
        _ => Vec::new(),
    };

    Some(match question_type {
        QuestionType::Essay => NewQuestion {
            question_text,
            question_type,
            correct_answer: None,
            reference_answer,
            min_score,
            max_score,
            choices,
        },
        _ => NewQuestion {
            question_text,
            question_type,
            correct_answer,
            reference_answer: None,
            min_score,
            max_score,
            choices,
        },
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates, checks the class, and persists the quiz atomically.
pub async fn create_quiz(
    store: &dyn QuizStore,
    actor: Actor,
    req: &CreateQuizRequest,
) -> Result<QuizDetail, AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can create quizzes".to_string()));
    }

    let new_quiz = build_quiz(req)?;

    if !store.class_exists(new_quiz.class_id).await? {
        return Err(AppError::invalid(
            "class_id",
            "exists",
            format!("class {} does not exist", new_quiz.class_id),
        ));
    }

    let quiz = store.insert_quiz(new_quiz).await?;

    tracing::info!(
        quiz_id = quiz.quiz.id,
        class_id = quiz.quiz.class_id,
        questions = quiz.questions.len(),
        instructor_id = actor.id,
        "quiz created"
    );

    Ok(quiz)
}
