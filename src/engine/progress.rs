// Per-question progress owned by a team profile.
//
// Attempt counts and correctness flags are indexed integer sequences, one
// slot per question, sized to the question count when the profile is
// created. They serialize to JSON arrays for storage in the team row.

use serde::{Deserialize, Serialize};

use super::rules::MAX_ATTEMPTS;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    attempted: Vec<u8>,
    correct: Vec<u8>,
}

impl Progress {
    /// Fresh progress for a profile, one zeroed slot per question.
    pub fn new(question_count: usize) -> Self {
        Self {
            attempted: vec![0; question_count],
            correct: vec![0; question_count],
        }
    }

    /// Rebuild progress from the two stored JSON columns. If questions were
    /// added after the profile was created, the sequences grow to match.
    pub fn from_columns(
        attempted: &str,
        correct: &str,
        question_count: usize,
    ) -> Result<Self, serde_json::Error> {
        let mut progress = Self {
            attempted: serde_json::from_str(attempted)?,
            correct: serde_json::from_str(correct)?,
        };
        if progress.attempted.len() < question_count {
            progress.attempted.resize(question_count, 0);
        }
        if progress.correct.len() < question_count {
            progress.correct.resize(question_count, 0);
        }
        Ok(progress)
    }

    /// Serialize back to the two storage columns (attempted, correct).
    pub fn to_columns(&self) -> (String, String) {
        (
            serde_json::to_string(&self.attempted).expect("serializing Vec<u8> cannot fail"),
            serde_json::to_string(&self.correct).expect("serializing Vec<u8> cannot fail"),
        )
    }

    /// Slot index for a 1-based question number, growing the sequences if
    /// the number is beyond their current length.
    fn slot(&mut self, number: i64) -> usize {
        let index = (number.max(1) - 1) as usize;
        if index >= self.attempted.len() {
            self.attempted.resize(index + 1, 0);
        }
        if index >= self.correct.len() {
            self.correct.resize(index + 1, 0);
        }
        index
    }

    pub fn attempts(&mut self, number: i64) -> u8 {
        let i = self.slot(number);
        self.attempted[i]
    }

    pub fn is_correct(&mut self, number: i64) -> bool {
        let i = self.slot(number);
        self.correct[i] == 1
    }

    /// Whether the question may still be played: fewer than three attempts
    /// and not already answered correctly.
    pub fn can_attempt(&mut self, number: i64) -> bool {
        self.attempts(number) < MAX_ATTEMPTS && !self.is_correct(number)
    }

    pub fn record_attempt(&mut self, number: i64) -> u8 {
        let i = self.slot(number);
        if self.attempted[i] < MAX_ATTEMPTS {
            self.attempted[i] += 1;
        }
        self.attempted[i]
    }

    pub fn mark_correct(&mut self, number: i64) {
        let i = self.slot(number);
        self.correct[i] = 1;
    }

    pub fn attempted_counts(&self) -> &[u8] {
        &self.attempted
    }

    pub fn correct_flags(&self) -> &[u8] {
        &self.correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let p = Progress::new(5);
        assert_eq!(p.attempted_counts(), &[0, 0, 0, 0, 0]);
        assert_eq!(p.correct_flags(), &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_attempts_capped_at_three() {
        let mut p = Progress::new(3);
        for _ in 0..10 {
            p.record_attempt(2);
        }
        assert_eq!(p.attempts(2), 3);
        assert!(!p.can_attempt(2));
    }

    #[test]
    fn test_correct_locks_question() {
        let mut p = Progress::new(3);
        p.record_attempt(1);
        assert!(p.can_attempt(1));
        p.mark_correct(1);
        assert!(p.is_correct(1));
        assert!(!p.can_attempt(1));
        // Other questions are unaffected
        assert!(p.can_attempt(2));
    }

    #[test]
    fn test_column_round_trip() {
        let mut p = Progress::new(4);
        p.record_attempt(1);
        p.record_attempt(1);
        p.mark_correct(1);
        p.record_attempt(3);

        let (attempted, correct) = p.to_columns();
        let restored = Progress::from_columns(&attempted, &correct, 4).unwrap();
        assert_eq!(restored, p);
    }

    #[test]
    fn test_from_columns_grows_to_question_count() {
        // Profile created when only 2 questions existed, now there are 5.
        let p = Progress::from_columns("[1,0]", "[1,0]", 5).unwrap();
        assert_eq!(p.attempted_counts().len(), 5);
        assert_eq!(p.correct_flags().len(), 5);
        assert_eq!(p.attempted_counts()[0], 1);
    }

    #[test]
    fn test_slot_grows_for_out_of_range_number() {
        let mut p = Progress::new(2);
        assert_eq!(p.attempts(7), 0);
        assert_eq!(p.attempted_counts().len(), 7);
    }

    #[test]
    fn test_from_columns_rejects_garbage() {
        assert!(Progress::from_columns("1 0 0", "[0]", 3).is_err());
    }
}
