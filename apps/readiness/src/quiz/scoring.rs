use thiserror::Error;

use crate::models::Answer;

/// Minimum percentage for a passed attempt.
pub const PASS_THRESHOLD: u8 = 70;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoreError {
    #[error("cannot score a quiz with no questions")]
    Empty,

    #[error("{answers} answers given for {questions} questions")]
    LengthMismatch { answers: usize, questions: usize },
}

/// Positions where the user answered and the answer equals the key.
/// An unanswered position, or one with no known key, never matches.
pub fn count_matches(answers: &[Option<Answer>], correct: &[Option<Answer>]) -> usize {
    answers
        .iter()
        .zip(correct)
        .filter(|(given, key)| given.is_some() && given == key)
        .count()
}

/// Percentage score in `0..=100`: `round(100 * matches / N)`.
pub fn score(answers: &[Option<Answer>], correct: &[Option<Answer>]) -> Result<u8, ScoreError> {
    if correct.is_empty() {
        return Err(ScoreError::Empty);
    }
    if answers.len() != correct.len() {
        return Err(ScoreError::LengthMismatch {
            answers: answers.len(),
            questions: correct.len(),
        });
    }
    Ok(percentage(count_matches(answers, correct), correct.len()))
}

/// `round(100 * part / total)` with halves rounded up, in integer arithmetic.
/// `total` must be non-zero.
pub fn percentage(part: usize, total: usize) -> u8 {
    let part = part.min(total);
    ((200 * part + total) / (2 * total)) as u8
}

pub fn passed(score: u8) -> bool {
    score >= PASS_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(values: &[Option<usize>]) -> Vec<Option<Answer>> {
        values.iter().map(|v| v.map(Answer::Choice)).collect()
    }

    #[test]
    fn test_three_of_five_is_sixty_and_fails() {
        let key = choices(&[Some(0), Some(1), Some(2), Some(3), Some(0)]);
        let given = choices(&[Some(0), Some(1), Some(2), Some(0), Some(1)]);
        let s = score(&given, &key).unwrap();
        assert_eq!(s, 60);
        assert!(!passed(s));
    }

    #[test]
    fn test_all_correct_is_hundred_and_passes() {
        let key = vec![
            Some(Answer::Choice(2)),
            Some(Answer::Flag(false)),
            Some(Answer::Choice(0)),
            Some(Answer::Flag(true)),
        ];
        let s = score(&key, &key).unwrap();
        assert_eq!(s, 100);
        assert!(passed(s));
    }

    #[test]
    fn test_unanswered_never_matches() {
        let key = choices(&[Some(1), None]);
        let given = choices(&[None, None]);
        assert_eq!(score(&given, &key).unwrap(), 0);
    }

    #[test]
    fn test_kind_mismatch_is_not_a_match() {
        // 0 and false are different answers even though JS would coerce them.
        let key = vec![Some(Answer::Flag(false))];
        let given = vec![Some(Answer::Choice(0))];
        assert_eq!(score(&given, &key).unwrap(), 0);
    }

    #[test]
    fn test_rounding_halves_up() {
        assert_eq!(percentage(1, 8), 13); // 12.5
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
    }

    #[test]
    fn test_bounds_hold_for_every_match_pattern() {
        for n in 1..=6usize {
            let key: Vec<Option<Answer>> = (0..n).map(|_| Some(Answer::Choice(1))).collect();
            for mask in 0..(1u32 << n) {
                let given: Vec<Option<Answer>> = (0..n)
                    .map(|i| {
                        if mask & (1 << i) != 0 {
                            Some(Answer::Choice(1))
                        } else {
                            Some(Answer::Choice(0))
                        }
                    })
                    .collect();
                let s = score(&given, &key).unwrap();
                let hits = mask.count_ones() as usize;
                assert!(s <= 100);
                assert_eq!(s == 100, hits == n, "n={n} mask={mask:b}");
                assert_eq!(s == 0, hits == 0, "n={n} mask={mask:b}");
            }
        }
    }

    #[test]
    fn test_empty_and_mismatched_inputs_are_rejected() {
        assert_eq!(score(&[], &[]), Err(ScoreError::Empty));
        assert_eq!(
            score(&choices(&[Some(1)]), &choices(&[Some(1), Some(2)])),
            Err(ScoreError::LengthMismatch {
                answers: 1,
                questions: 2
            })
        );
    }

    #[test]
    fn test_pass_threshold_boundary() {
        assert!(passed(70));
        assert!(!passed(69));
    }
}
