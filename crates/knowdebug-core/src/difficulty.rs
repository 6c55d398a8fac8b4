//! Adaptive difficulty for a single domain.
//!
//! Every answer moves the domain's difficulty by a sum of four heuristic
//! components (base step, streak momentum, confidence, response time),
//! scaled by how volatile recent performance has been, and clamped to
//! [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`].

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;
use crate::model::{AnswerEvent, MAX_DIFFICULTY, MIN_DIFFICULTY};

/// Number of recent outcomes kept for the stability factor.
pub const HISTORY_CAPACITY: usize = 10;

const CORRECT_STEP: f64 = 5.0;
const INCORRECT_STEP: f64 = -7.0;
const STREAK_STEP: f64 = 1.5;
const STREAK_CAP: f64 = 10.0;
const CONFIDENCE_SCALE: f64 = 10.0;

const FAST_CORRECT_RATIO: f64 = 0.7;
const SLOW_CORRECT_RATIO: f64 = 1.5;
const FAST_INCORRECT_RATIO: f64 = 0.5;
const SLOW_INCORRECT_RATIO: f64 = 1.2;

const MIN_STABILITY_SAMPLES: usize = 5;
const EARLY_SCALE: f64 = 0.8;
const ERRATIC_CHANGE_RATE: f64 = 0.6;
const ERRATIC_SCALE: f64 = 0.7;
const STEADY_CHANGE_RATE: f64 = 0.2;
const STEADY_SCALE: f64 = 1.2;

/// Rolling performance state of one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyState {
    /// Always within [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`].
    pub current_difficulty: f64,
    /// Oldest first, at most [`HISTORY_CAPACITY`] entries.
    pub recent_outcomes: VecDeque<bool>,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

/// Breakdown of a single difficulty update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyUpdate {
    pub previous_difficulty: f64,
    pub base: f64,
    pub streak: f64,
    pub confidence: f64,
    pub time: f64,
    pub stability_scale: f64,
    pub new_difficulty: f64,
}

impl DifficultyUpdate {
    /// The scaled adjustment before clamping.
    pub fn raw_adjustment(&self) -> f64 {
        (self.base + self.streak + self.confidence + self.time) * self.stability_scale
    }
}

/// Owns the difficulty of one domain and adjusts it after every answer.
#[derive(Debug, Clone)]
pub struct DifficultyEngine {
    state: DifficultyState,
}

impl DifficultyEngine {
    /// Create an engine starting at `initial_difficulty`, clamped into range.
    pub fn new(initial_difficulty: f64) -> Result<Self, AssessmentError> {
        if !initial_difficulty.is_finite() {
            return Err(AssessmentError::invalid(
                "initial_difficulty",
                format!("must be a finite number, got {initial_difficulty}"),
            ));
        }
        Ok(Self {
            state: DifficultyState {
                current_difficulty: clamp_difficulty(initial_difficulty),
                recent_outcomes: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
                consecutive_correct: 0,
                consecutive_incorrect: 0,
            },
        })
    }

    /// Read-only view of the engine state.
    pub fn state(&self) -> &DifficultyState {
        &self.state
    }

    pub fn current_difficulty(&self) -> f64 {
        self.state.current_difficulty
    }

    /// Apply one answer and return the new difficulty.
    ///
    /// Each call mutates the history, so an event must be applied exactly once.
    pub fn update(&mut self, event: &AnswerEvent) -> Result<f64, AssessmentError> {
        self.update_detailed(event).map(|u| u.new_difficulty)
    }

    /// Apply one answer and return the full breakdown of the adjustment.
    pub fn update_detailed(
        &mut self,
        event: &AnswerEvent,
    ) -> Result<DifficultyUpdate, AssessmentError> {
        event.validate()?;

        self.record_outcome(event.is_correct);

        let base = if event.is_correct {
            CORRECT_STEP
        } else {
            INCORRECT_STEP
        };
        let streak = self.streak_bonus(event.is_correct);
        let confidence = confidence_adjustment(event.is_correct, event.confidence);
        let time = time_adjustment(event.is_correct, event.response_time, event.estimated_time);
        let stability_scale = self.stability_scale();

        let previous_difficulty = self.state.current_difficulty;
        let adjustment = (base + streak + confidence + time) * stability_scale;
        let new_difficulty = clamp_difficulty(previous_difficulty + adjustment);
        self.state.current_difficulty = new_difficulty;

        tracing::debug!(
            correct = event.is_correct,
            base,
            streak,
            confidence,
            time,
            stability_scale,
            "difficulty {previous_difficulty:.1} -> {new_difficulty:.1}"
        );

        Ok(DifficultyUpdate {
            previous_difficulty,
            base,
            streak,
            confidence,
            time,
            stability_scale,
            new_difficulty,
        })
    }

    fn record_outcome(&mut self, is_correct: bool) {
        self.state.recent_outcomes.push_back(is_correct);
        while self.state.recent_outcomes.len() > HISTORY_CAPACITY {
            self.state.recent_outcomes.pop_front();
        }

        if is_correct {
            self.state.consecutive_correct += 1;
            self.state.consecutive_incorrect = 0;
        } else {
            self.state.consecutive_incorrect += 1;
            self.state.consecutive_correct = 0;
        }
    }

    /// Momentum bonus, signed like the base step and capped at ±10.
    fn streak_bonus(&self, is_correct: bool) -> f64 {
        if is_correct {
            (self.state.consecutive_correct as f64 * STREAK_STEP).min(STREAK_CAP)
        } else {
            -(self.state.consecutive_incorrect as f64 * STREAK_STEP).min(STREAK_CAP)
        }
    }

    /// Fraction of outcome flips in the history, or `None` with too few samples.
    ///
    /// The flip count is divided by the number of samples, not the number of
    /// adjacent pairs.
    pub fn change_rate(&self) -> Option<f64> {
        let outcomes = &self.state.recent_outcomes;
        if outcomes.len() < MIN_STABILITY_SAMPLES {
            return None;
        }
        let flips = outcomes
            .iter()
            .zip(outcomes.iter().skip(1))
            .filter(|(a, b)| a != b)
            .count();
        Some(flips as f64 / outcomes.len() as f64)
    }

    /// Multiplier applied to the summed adjustment.
    pub fn stability_scale(&self) -> f64 {
        match self.change_rate() {
            None => EARLY_SCALE,
            Some(rate) if rate > ERRATIC_CHANGE_RATE => ERRATIC_SCALE,
            Some(rate) if rate < STEADY_CHANGE_RATE => STEADY_SCALE,
            Some(_) => 1.0,
        }
    }
}

/// Confident answers move difficulty further in the direction of the outcome.
fn confidence_adjustment(is_correct: bool, confidence: f64) -> f64 {
    let impact = (confidence - 0.5) * CONFIDENCE_SCALE;
    if is_correct {
        impact
    } else {
        -impact
    }
}

fn time_adjustment(is_correct: bool, response_time: f64, estimated_time: f64) -> f64 {
    // +1 keeps a zero estimate from dividing by zero
    let ratio = response_time / (estimated_time + 1.0);
    if is_correct {
        if ratio < FAST_CORRECT_RATIO {
            3.0
        } else if ratio > SLOW_CORRECT_RATIO {
            -2.0
        } else {
            0.0
        }
    } else if ratio < FAST_INCORRECT_RATIO {
        -4.0
    } else if ratio > SLOW_INCORRECT_RATIO {
        -1.0
    } else {
        0.0
    }
}

fn clamp_difficulty(value: f64) -> f64 {
    value.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn correct(confidence: f64) -> AnswerEvent {
        AnswerEvent::new(true, 10.0, confidence, 30.0, "tag")
    }

    fn incorrect(confidence: f64) -> AnswerEvent {
        AnswerEvent::new(false, 20.0, confidence, 30.0, "tag")
    }

    #[test]
    fn first_confident_fast_correct_answer() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        let update = engine.update_detailed(&correct(0.9)).unwrap();

        assert_eq!(update.base, 5.0);
        assert_eq!(update.streak, 1.5);
        assert!((update.confidence - 4.0).abs() < 1e-9);
        assert_eq!(update.time, 3.0);
        assert_eq!(update.stability_scale, 0.8);
        assert!((update.new_difficulty - 60.8).abs() < 1e-9);

        let state = engine.state();
        assert_eq!(state.recent_outcomes, VecDeque::from(vec![true]));
        assert_eq!(state.consecutive_correct, 1);
        assert_eq!(state.consecutive_incorrect, 0);
    }

    #[test]
    fn history_is_bounded_fifo() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        let pattern = [
            true, false, false, true, true, true, false, true, false, false, true, false,
        ];
        for &outcome in &pattern {
            let event = if outcome { correct(0.5) } else { incorrect(0.5) };
            engine.update(&event).unwrap();
        }

        let history: Vec<bool> = engine.state().recent_outcomes.iter().copied().collect();
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history, pattern[2..].to_vec());
    }

    #[test]
    fn counters_are_mutually_exclusive() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        engine.update(&correct(0.5)).unwrap();
        engine.update(&correct(0.5)).unwrap();
        assert_eq!(engine.state().consecutive_correct, 2);
        assert_eq!(engine.state().consecutive_incorrect, 0);

        engine.update(&incorrect(0.5)).unwrap();
        assert_eq!(engine.state().consecutive_correct, 0);
        assert_eq!(engine.state().consecutive_incorrect, 1);
    }

    #[test]
    fn applying_an_event_twice_double_counts() {
        let event = correct(0.7);
        let mut once = DifficultyEngine::new(50.0).unwrap();
        once.update(&event).unwrap();

        let mut twice = DifficultyEngine::new(50.0).unwrap();
        twice.update(&event).unwrap();
        twice.update(&event).unwrap();

        assert_eq!(twice.state().consecutive_correct, 2);
        assert_eq!(twice.state().recent_outcomes.len(), 2);
        assert_ne!(once.state(), twice.state());
        assert!(twice.current_difficulty() > once.current_difficulty());
    }

    #[test]
    fn more_confidence_on_correct_answer_raises_more() {
        let mut low = DifficultyEngine::new(50.0).unwrap();
        let mut high = DifficultyEngine::new(50.0).unwrap();
        let low_value = low.update(&correct(0.2)).unwrap();
        let high_value = high.update(&correct(0.8)).unwrap();
        assert!(high_value > low_value);
    }

    #[test]
    fn low_confidence_wrong_answer_is_penalized_less() {
        let mut guess = DifficultyEngine::new(50.0).unwrap();
        let mut sure = DifficultyEngine::new(50.0).unwrap();
        let guess_value = guess.update(&incorrect(0.1)).unwrap();
        let sure_value = sure.update(&incorrect(0.9)).unwrap();
        assert!(guess_value > sure_value);
    }

    #[test]
    fn fast_wrong_guesses_drive_difficulty_to_minimum() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        let guess = AnswerEvent::new(false, 5.0, 0.5, 30.0, "tag");
        let expected = [40.0, 28.8, 16.4, 2.8, 1.0];

        let mut previous = engine.current_difficulty();
        for want in expected {
            let value = engine.update(&guess).unwrap();
            assert!((value - want).abs() < 1e-9, "expected {want}, got {value}");
            assert!(value <= previous);
            assert!(value >= MIN_DIFFICULTY);
            previous = value;
        }
    }

    #[test]
    fn streak_bonus_is_capped() {
        let mut engine = DifficultyEngine::new(1.0).unwrap();
        let mut last = None;
        for _ in 0..8 {
            last = Some(engine.update_detailed(&correct(0.5)).unwrap());
        }
        assert_eq!(last.unwrap().streak, STREAK_CAP);
        assert_eq!(engine.current_difficulty(), MAX_DIFFICULTY);
    }

    #[test]
    fn time_ratio_thresholds() {
        // ratio = response / (estimated + 1)
        assert_eq!(time_adjustment(true, 6.0, 9.0), 3.0);
        assert_eq!(time_adjustment(true, 7.0, 9.0), 0.0);
        assert_eq!(time_adjustment(true, 16.0, 9.0), -2.0);
        assert_eq!(time_adjustment(false, 4.0, 9.0), -4.0);
        assert_eq!(time_adjustment(false, 10.0, 9.0), 0.0);
        assert_eq!(time_adjustment(false, 13.0, 9.0), -1.0);
    }

    #[test]
    fn zero_estimated_time_is_tolerated() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        let update = engine
            .update_detailed(&AnswerEvent::new(true, 0.5, 0.5, 0.0, "tag"))
            .unwrap();
        assert_eq!(update.time, 3.0);
        assert!(update.new_difficulty.is_finite());
    }

    #[test]
    fn stability_scale_tracks_volatility() {
        let mut steady = DifficultyEngine::new(50.0).unwrap();
        for _ in 0..5 {
            steady.update(&correct(0.5)).unwrap();
        }
        assert_eq!(steady.change_rate(), Some(0.0));
        assert_eq!(steady.stability_scale(), STEADY_SCALE);

        let mut erratic = DifficultyEngine::new(50.0).unwrap();
        for i in 0..10 {
            let event = if i % 2 == 0 { correct(0.5) } else { incorrect(0.5) };
            erratic.update(&event).unwrap();
        }
        assert!((erratic.change_rate().unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(erratic.stability_scale(), ERRATIC_SCALE);

        let mut mixed = DifficultyEngine::new(50.0).unwrap();
        for outcome in [true, true, false, false, true] {
            let event = if outcome { correct(0.5) } else { incorrect(0.5) };
            mixed.update(&event).unwrap();
        }
        assert!((mixed.change_rate().unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(mixed.stability_scale(), 1.0);
    }

    #[test]
    fn early_answers_use_cautious_scale() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        for _ in 0..4 {
            let update = engine.update_detailed(&correct(0.5)).unwrap();
            assert_eq!(update.stability_scale, EARLY_SCALE);
        }
    }

    #[test]
    fn initial_difficulty_is_clamped() {
        assert_eq!(DifficultyEngine::new(150.0).unwrap().current_difficulty(), 100.0);
        assert_eq!(DifficultyEngine::new(-3.0).unwrap().current_difficulty(), 1.0);
        assert!(DifficultyEngine::new(f64::NAN).is_err());
        let fresh = DifficultyEngine::new(42.0).unwrap();
        assert_eq!(fresh.state().consecutive_correct, 0);
        assert_eq!(fresh.state().consecutive_incorrect, 0);
    }

    #[test]
    fn invalid_event_leaves_state_untouched() {
        let mut engine = DifficultyEngine::new(50.0).unwrap();
        let before = engine.state().clone();
        let err = engine
            .update(&AnswerEvent::new(true, 10.0, 2.0, 30.0, "tag"))
            .unwrap_err();
        assert!(matches!(
            err,
            AssessmentError::InvalidInput {
                field: "confidence",
                ..
            }
        ));
        assert_eq!(engine.state(), &before);
    }

    fn arb_event() -> impl Strategy<Value = AnswerEvent> {
        (any::<bool>(), 0.1f64..300.0, 0.0f64..=1.0, 0.0f64..120.0).prop_map(
            |(is_correct, response_time, confidence, estimated_time)| {
                AnswerEvent::new(is_correct, response_time, confidence, estimated_time, "tag")
            },
        )
    }

    proptest! {
        #[test]
        fn invariants_hold_for_any_sequence(
            initial in 1.0f64..=100.0,
            events in prop::collection::vec(arb_event(), 1..40),
        ) {
            let mut engine = DifficultyEngine::new(initial).unwrap();
            for event in &events {
                let value = engine.update(event).unwrap();
                let state = engine.state();
                prop_assert!((MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value));
                prop_assert_eq!(value, state.current_difficulty);
                prop_assert!(state.recent_outcomes.len() <= HISTORY_CAPACITY);
                prop_assert_eq!(state.recent_outcomes.back().copied(), Some(event.is_correct));
                prop_assert!(
                    (state.consecutive_correct == 0) != (state.consecutive_incorrect == 0)
                );
            }
        }

        #[test]
        fn confidence_is_monotone_for_correct_answers(
            history in prop::collection::vec(arb_event(), 0..12),
            low in 0.0f64..=1.0,
            delta in 0.0f64..=1.0,
        ) {
            let high = (low + delta).min(1.0);
            let mut a = DifficultyEngine::new(50.0).unwrap();
            for event in &history {
                a.update(event).unwrap();
            }
            let mut b = a.clone();
            let low_value = a.update(&AnswerEvent::new(true, 10.0, low, 30.0, "t")).unwrap();
            let high_value = b.update(&AnswerEvent::new(true, 10.0, high, 30.0, "t")).unwrap();
            prop_assert!(high_value >= low_value);
        }
    }
}
