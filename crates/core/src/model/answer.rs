use crate::model::ids::QuestionId;

/// One student's response to one question within an attempt.
///
/// Keyed by (attempt, question) in the store; a second write for the same
/// pair replaces the first, it never produces a duplicate row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub question_id: QuestionId,
    pub submitted_text: String,
    pub is_correct: bool,
    pub elapsed_seconds: Option<u32>,
}

/// Final outcome of a submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub score_percent: u8,
    pub total_questions: usize,
    pub correct_count: usize,
    pub answers: Vec<Answer>,
}

impl AttemptResult {
    /// Score a set of recorded answers.
    ///
    /// The percentage is computed over answered questions only; an attempt
    /// with nothing recorded scores 0, not NaN.
    #[must_use]
    pub fn from_answers(mut answers: Vec<Answer>) -> Self {
        answers.sort_by_key(|a| a.question_id);
        let correct_count = answers.iter().filter(|a| a.is_correct).count();
        Self {
            score_percent: score_percent(correct_count, answers.len()),
            total_questions: answers.len(),
            correct_count,
            answers,
        }
    }
}

/// `round(100 * correct / total)`, or 0 when nothing was answered.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (100.0 * correct as f64 / total as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(question: u64, correct: bool) -> Answer {
        Answer {
            question_id: QuestionId::new(question),
            submitted_text: "x".into(),
            is_correct: correct,
            elapsed_seconds: None,
        }
    }

    #[test]
    fn empty_result_scores_zero() {
        let result = AttemptResult::from_answers(Vec::new());
        assert_eq!(result.score_percent, 0);
        assert_eq!(result.total_questions, 0);
        assert_eq!(result.correct_count, 0);
    }

    #[test]
    fn two_of_three_rounds_to_sixty_seven() {
        let result =
            AttemptResult::from_answers(vec![answer(1, true), answer(2, true), answer(3, false)]);
        assert_eq!(result.score_percent, 67);
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_questions, 3);
    }

    #[test]
    fn one_of_three_rounds_to_thirty_three() {
        assert_eq!(score_percent(1, 3), 33);
    }

    #[test]
    fn all_correct_is_one_hundred() {
        assert_eq!(score_percent(5, 5), 100);
    }

    #[test]
    fn answers_are_ordered_by_question() {
        let result = AttemptResult::from_answers(vec![answer(3, true), answer(1, false)]);
        let ids: Vec<u64> = result.answers.iter().map(|a| a.question_id.value()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
