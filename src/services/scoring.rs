// src/services/scoring.rs

use serde::Serialize;

use crate::{
    models::{
        question::{Question, QuestionType},
        submission::AnswerSheet,
    },
    utils::similarity::similarity_percent,
};

/// Points earned on one question out of its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionScore {
    pub question_id: i64,
    pub earned: i64,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub score: i64,
    pub total: i64,
    pub breakdown: Vec<QuestionScore>,
}

/// Sum of question weights: 1 per objective question, `max_score` per essay.
pub fn total_possible<'a, I>(questions: I) -> i64
where
    I: IntoIterator<Item = &'a Question>,
{
    questions.into_iter().map(Question::weight).sum()
}

/// Scores an answer sheet against the quiz's questions.
///
/// Unanswered questions (absent, null or blank) earn nothing but still count
/// toward the total. Answers for unknown question ids are ignored here; the
/// ledger rejects them before scoring.
pub fn score_answers<'a, I>(questions: I, answers: &AnswerSheet) -> ScoreReport
where
    I: IntoIterator<Item = &'a Question>,
{
    let breakdown: Vec<QuestionScore> = questions
        .into_iter()
        .map(|question| {
            let answer = answers
                .get(&question.id)
                .and_then(|a| a.as_deref())
                .filter(|a| !a.trim().is_empty());

            QuestionScore {
                question_id: question.id,
                earned: answer.map(|a| score_question(question, a)).unwrap_or(0),
                weight: question.weight(),
            }
        })
        .collect();

    ScoreReport {
        score: breakdown.iter().map(|q| q.earned).sum(),
        total: breakdown.iter().map(|q| q.weight).sum(),
        breakdown,
    }
}

fn score_question(question: &Question, answer: &str) -> i64 {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let correct = question.correct_answer.as_deref().map(str::trim);
            i64::from(correct == Some(answer.trim()))
        }
        QuestionType::Identification => {
            let correct = question.correct_answer.as_deref().map(|c| c.trim().to_lowercase());
            i64::from(correct.as_deref() == Some(answer.trim().to_lowercase().as_str()))
        }
        QuestionType::Essay => match question.reference_answer.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => {
                let percent =
                    similarity_percent(&answer.trim().to_lowercase(), &reference.to_lowercase());
                essay_score(percent, question.min_score, question.max_score)
            }
            _ => 0,
        },
    }
}

/// Maps a similarity percentage linearly onto `[min_score, max_score]`, rounding half away from zero.
pub fn essay_score(percent: f64, min_score: i32, max_score: i32) -> i64 {
    let percent = percent.clamp(0.0, 100.0);
    let (min, max) = (f64::from(min_score), f64::from(max_score));
    (min + (percent / 100.0) * (max - min)).round() as i64
}
