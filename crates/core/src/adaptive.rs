use serde::{Deserialize, Serialize};

use crate::model::Difficulty;

//
// ─── CONSTANTS ─────────────────────────────────────────────────────────────────
//

pub const DEFAULT_UPGRADE_THRESHOLD: u32 = 3;
pub const DEFAULT_DOWNGRADE_THRESHOLD: u32 = 2;

/// Answers needed in a learner's history before thresholds are personalised.
pub const MIN_HISTORY_FOR_PERSONALIZATION: u32 = 10;
pub const HIGH_ACCURACY: f64 = 0.75;
pub const LOW_ACCURACY: f64 = 0.50;
/// Personalisation never lowers the upgrade threshold below this.
pub const MIN_UPGRADE_THRESHOLD: u32 = 2;

pub const FAST_RESPONSE_SECS: f64 = 15.0;
pub const SLOW_RESPONSE_SECS: f64 = 45.0;
pub const MIN_CONFIDENCE_WEIGHT: f64 = 0.5;
pub const MAX_CONFIDENCE_WEIGHT: f64 = 1.5;

//
// ─── CONFIG & STATE ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    pub upgrade_threshold: u32,
    pub downgrade_threshold: u32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            upgrade_threshold: DEFAULT_UPGRADE_THRESHOLD,
            downgrade_threshold: DEFAULT_DOWNGRADE_THRESHOLD,
        }
    }
}

/// Streak tracker driving per-question difficulty.
///
/// At most one of the two counters is non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveState {
    pub current_difficulty: Difficulty,
    pub consecutive_correct: u32,
    pub consecutive_incorrect: u32,
}

impl AdaptiveState {
    /// A fresh tracker at `difficulty` with both streaks at zero.
    #[must_use]
    pub fn at(difficulty: Difficulty) -> Self {
        Self {
            current_difficulty: difficulty,
            consecutive_correct: 0,
            consecutive_incorrect: 0,
        }
    }

    /// Fold one answer into the streak counters.
    #[must_use]
    pub fn record(self, is_correct: bool) -> Self {
        let (consecutive_correct, consecutive_incorrect) = update_consecutive_counts(
            is_correct,
            self.consecutive_correct,
            self.consecutive_incorrect,
        );
        Self {
            consecutive_correct,
            consecutive_incorrect,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyChange {
    Upgraded,
    Downgraded,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdaptiveDecision {
    pub state: AdaptiveState,
    pub change: DifficultyChange,
}

//
// ─── BASIC ENGINE ──────────────────────────────────────────────────────────────
//

/// Correct extends the correct streak and clears the other; incorrect does the reverse.
#[must_use]
pub fn update_consecutive_counts(is_correct: bool, correct: u32, incorrect: u32) -> (u32, u32) {
    if is_correct {
        (correct.saturating_add(1), 0)
    } else {
        (0, incorrect.saturating_add(1))
    }
}

/// Step difficulty up or down one tier from the current streaks.
///
/// The upgrade check runs first. Any change clears both streaks; no change
/// returns the state as it was.
#[must_use]
pub fn calculate_adaptive_difficulty(
    state: &AdaptiveState,
    config: &AdaptiveConfig,
) -> AdaptiveDecision {
    decide(
        state,
        state.consecutive_correct >= config.upgrade_threshold,
        state.consecutive_incorrect >= config.downgrade_threshold,
    )
}

fn decide(state: &AdaptiveState, upgrade_due: bool, downgrade_due: bool) -> AdaptiveDecision {
    let current = state.current_difficulty;
    if upgrade_due {
        if let Some(harder) = current.harder() {
            return AdaptiveDecision {
                state: AdaptiveState::at(harder),
                change: DifficultyChange::Upgraded,
            };
        }
    }
    if downgrade_due {
        if let Some(easier) = current.easier() {
            return AdaptiveDecision {
                state: AdaptiveState::at(easier),
                change: DifficultyChange::Downgraded,
            };
        }
    }
    AdaptiveDecision {
        state: *state,
        change: DifficultyChange::Unchanged,
    }
}

//
// ─── PERSONALISATION ───────────────────────────────────────────────────────────
//

/// A learner's lifetime answer record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    pub total_questions: u32,
    pub total_correct: u32,
    /// Precomputed accuracy supplied by a collaborator; preferred when present.
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl StudentHistory {
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        match self.accuracy {
            Some(accuracy) => accuracy,
            None if self.total_questions == 0 => 0.0,
            None => f64::from(self.total_correct) / f64::from(self.total_questions),
        }
    }

    /// Count one more answer. A precomputed accuracy is dropped since it no longer matches.
    #[must_use]
    pub fn record(self, is_correct: bool) -> Self {
        Self {
            total_questions: self.total_questions.saturating_add(1),
            total_correct: self.total_correct.saturating_add(u32::from(is_correct)),
            accuracy: None,
        }
    }
}

/// Adjust thresholds to the learner's track record.
///
/// Needs at least ten recorded answers. Accuracy ≥ 0.75 lowers the upgrade
/// threshold by one (not below two); accuracy < 0.50 raises both by one.
#[must_use]
pub fn calculate_personalized_thresholds(
    history: Option<&StudentHistory>,
    base: &AdaptiveConfig,
) -> AdaptiveConfig {
    let Some(history) = history else {
        return *base;
    };
    if history.total_questions < MIN_HISTORY_FOR_PERSONALIZATION {
        return *base;
    }

    let accuracy = history.accuracy();
    if accuracy >= HIGH_ACCURACY {
        AdaptiveConfig {
            upgrade_threshold: if base.upgrade_threshold > MIN_UPGRADE_THRESHOLD {
                base.upgrade_threshold - 1
            } else {
                base.upgrade_threshold
            },
            ..*base
        }
    } else if accuracy < LOW_ACCURACY {
        AdaptiveConfig {
            upgrade_threshold: base.upgrade_threshold.saturating_add(1),
            downgrade_threshold: base.downgrade_threshold.saturating_add(1),
        }
    } else {
        *base
    }
}

//
// ─── CONFIDENCE WEIGHTING ──────────────────────────────────────────────────────
//

/// Behavioural signals captured alongside an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerSignals {
    pub response_time_secs: f64,
    pub hints_used: u32,
}

impl AnswerSignals {
    #[must_use]
    pub fn new(response_time_secs: f64, hints_used: u32) -> Self {
        Self {
            response_time_secs,
            hints_used,
        }
    }
}

/// How much a correct answer counts toward an upgrade, in `[0.5, 1.5]`.
///
/// Starts at 1.0: +0.5 for a quick unaided answer (< 15s), −0.5 for a slow
/// one (> 45s), −0.5 if any hint was used.
#[must_use]
pub fn calculate_confidence_weight(signals: &AnswerSignals) -> f64 {
    let hinted = signals.hints_used > 0;
    let mut weight: f64 = 1.0;
    if signals.response_time_secs < FAST_RESPONSE_SECS && !hinted {
        weight += 0.5;
    }
    if signals.response_time_secs > SLOW_RESPONSE_SECS {
        weight -= 0.5;
    }
    if hinted {
        weight -= 0.5;
    }
    weight.clamp(MIN_CONFIDENCE_WEIGHT, MAX_CONFIDENCE_WEIGHT)
}

/// Running confidence: correct answers add their weight, an incorrect answer resets to zero.
#[must_use]
pub fn update_confidence_score(score: f64, is_correct: bool, weight: f64) -> f64 {
    if is_correct { score + weight } else { 0.0 }
}

/// Adaptive state extended with confidence scoring and learner history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedAdaptiveState {
    #[serde(flatten)]
    pub base: AdaptiveState,
    pub confidence_score: f64,
    #[serde(default)]
    pub student_history: Option<StudentHistory>,
}

impl EnhancedAdaptiveState {
    #[must_use]
    pub fn new(difficulty: Difficulty, student_history: Option<StudentHistory>) -> Self {
        Self {
            base: AdaptiveState::at(difficulty),
            confidence_score: 0.0,
            student_history,
        }
    }

    #[must_use]
    pub fn current_difficulty(&self) -> Difficulty {
        self.base.current_difficulty
    }

    /// Fold one answer into streaks, confidence and history.
    #[must_use]
    pub fn record(self, is_correct: bool, signals: &AnswerSignals) -> Self {
        let weight = calculate_confidence_weight(signals);
        Self {
            base: self.base.record(is_correct),
            confidence_score: update_confidence_score(self.confidence_score, is_correct, weight),
            student_history: self.student_history.map(|h| h.record(is_correct)),
        }
    }

    /// Restart at `difficulty` with cleared streaks and confidence, keeping history.
    #[must_use]
    pub fn reset_to(self, difficulty: Difficulty) -> Self {
        Self {
            base: AdaptiveState::at(difficulty),
            confidence_score: 0.0,
            student_history: self.student_history,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnhancedAdaptiveDecision {
    pub state: EnhancedAdaptiveState,
    pub change: DifficultyChange,
    /// Thresholds after personalisation.
    pub effective_config: AdaptiveConfig,
}

/// Confidence-weighted variant of `calculate_adaptive_difficulty`.
///
/// Upgrades when `confidence_score` reaches the (possibly personalised)
/// upgrade threshold; downgrades on consecutive incorrect answers exactly like
/// the basic engine. A change clears streaks and confidence.
#[must_use]
pub fn calculate_enhanced_adaptive_difficulty(
    state: &EnhancedAdaptiveState,
    config: &AdaptiveConfig,
) -> EnhancedAdaptiveDecision {
    let effective_config = calculate_personalized_thresholds(state.student_history.as_ref(), config);
    let decision = decide(
        &state.base,
        state.confidence_score >= f64::from(effective_config.upgrade_threshold),
        state.base.consecutive_incorrect >= effective_config.downgrade_threshold,
    );

    let state = match decision.change {
        DifficultyChange::Unchanged => *state,
        DifficultyChange::Upgraded | DifficultyChange::Downgraded => {
            state.reset_to(decision.state.current_difficulty)
        }
    };

    EnhancedAdaptiveDecision {
        state,
        change: decision.change,
        effective_config,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn state(difficulty: Difficulty, correct: u32, incorrect: u32) -> AdaptiveState {
        AdaptiveState {
            current_difficulty: difficulty,
            consecutive_correct: correct,
            consecutive_incorrect: incorrect,
        }
    }

    fn history(total: u32, correct: u32) -> StudentHistory {
        StudentHistory {
            total_questions: total,
            total_correct: correct,
            accuracy: None,
        }
    }

    #[test]
    fn consecutive_counts_are_mutually_exclusive() {
        assert_eq!(update_consecutive_counts(true, 2, 0), (3, 0));
        assert_eq!(update_consecutive_counts(false, 2, 0), (0, 1));
        assert_eq!(update_consecutive_counts(false, 0, 1), (0, 2));
        assert_eq!(update_consecutive_counts(true, 0, 4), (1, 0));
    }

    #[test]
    fn upgrades_after_three_correct() {
        let decision =
            calculate_adaptive_difficulty(&state(Difficulty::Easy, 3, 0), &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Upgraded);
        assert_eq!(decision.state, AdaptiveState::at(Difficulty::Medium));
    }

    #[test]
    fn downgrades_after_two_incorrect() {
        let decision =
            calculate_adaptive_difficulty(&state(Difficulty::Hard, 0, 2), &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Downgraded);
        assert_eq!(decision.state, AdaptiveState::at(Difficulty::Medium));
    }

    #[test]
    fn no_change_preserves_counters() {
        let before = state(Difficulty::Medium, 2, 0);
        let decision = calculate_adaptive_difficulty(&before, &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Unchanged);
        assert_eq!(decision.state, before);
    }

    #[test]
    fn hard_and_easy_are_ceilings() {
        let config = AdaptiveConfig::default();
        let at_hard = state(Difficulty::Hard, 5, 0);
        assert_eq!(calculate_adaptive_difficulty(&at_hard, &config).state, at_hard);
        let at_easy = state(Difficulty::Easy, 0, 5);
        assert_eq!(calculate_adaptive_difficulty(&at_easy, &config).state, at_easy);
    }

    #[test]
    fn upgrade_takes_precedence_when_both_due() {
        let decision =
            calculate_adaptive_difficulty(&state(Difficulty::Medium, 3, 2), &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Upgraded);
        assert_eq!(decision.state.current_difficulty, Difficulty::Hard);
    }

    #[test]
    fn personalisation_needs_ten_answers() {
        let base = AdaptiveConfig::default();
        assert_eq!(calculate_personalized_thresholds(Some(&history(9, 9)), &base), base);
        assert_eq!(calculate_personalized_thresholds(None, &base), base);
    }

    #[test]
    fn high_accuracy_lowers_upgrade_threshold_with_floor() {
        let base = AdaptiveConfig::default();
        let tuned = calculate_personalized_thresholds(Some(&history(20, 16)), &base);
        assert_eq!(tuned.upgrade_threshold, 2);
        assert_eq!(tuned.downgrade_threshold, 2);

        let floor = AdaptiveConfig {
            upgrade_threshold: 2,
            downgrade_threshold: 2,
        };
        let tuned = calculate_personalized_thresholds(Some(&history(20, 20)), &floor);
        assert_eq!(tuned.upgrade_threshold, 2);
    }

    #[test]
    fn low_accuracy_raises_both_thresholds() {
        let tuned =
            calculate_personalized_thresholds(Some(&history(10, 4)), &AdaptiveConfig::default());
        assert_eq!(tuned, AdaptiveConfig {
            upgrade_threshold: 4,
            downgrade_threshold: 3,
        });
    }

    #[test]
    fn precomputed_accuracy_wins() {
        let h = StudentHistory {
            total_questions: 10,
            total_correct: 2,
            accuracy: Some(0.9),
        };
        let tuned = calculate_personalized_thresholds(Some(&h), &AdaptiveConfig::default());
        assert_eq!(tuned.upgrade_threshold, 2);
    }

    #[test]
    fn confidence_weight_rules() {
        assert_eq!(calculate_confidence_weight(&AnswerSignals::new(10.0, 0)), 1.5);
        assert_eq!(calculate_confidence_weight(&AnswerSignals::new(10.0, 1)), 0.5);
        assert_eq!(calculate_confidence_weight(&AnswerSignals::new(30.0, 0)), 1.0);
        assert_eq!(calculate_confidence_weight(&AnswerSignals::new(60.0, 0)), 0.5);
        assert_eq!(calculate_confidence_weight(&AnswerSignals::new(60.0, 2)), 0.5);
    }

    #[test]
    fn confidence_score_resets_on_incorrect() {
        let score = update_confidence_score(0.0, true, 1.5);
        let score = update_confidence_score(score, true, 1.0);
        assert_eq!(score, 2.5);
        assert_eq!(update_confidence_score(score, false, 1.5), 0.0);
    }

    #[test]
    fn enhanced_upgrades_on_confidence_not_count() {
        let fast = AnswerSignals::new(5.0, 0);
        let mut state = EnhancedAdaptiveState::new(Difficulty::Easy, None);
        state = state.record(true, &fast);
        let decision = calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Unchanged);

        // 1.5 + 1.5 = 3.0 reaches the threshold after only two answers.
        state = decision.state.record(true, &fast);
        let decision = calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Upgraded);
        assert_eq!(decision.state.current_difficulty(), Difficulty::Medium);
        assert_eq!(decision.state.confidence_score, 0.0);
        assert_eq!(decision.state.base.consecutive_correct, 0);
    }

    #[test]
    fn enhanced_slow_answers_need_more_streak() {
        let slow = AnswerSignals::new(50.0, 0);
        let mut state = EnhancedAdaptiveState::new(Difficulty::Easy, None);
        for _ in 0..5 {
            state = state.record(true, &slow);
            let decision =
                calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
            assert_eq!(decision.change, DifficultyChange::Unchanged);
            state = decision.state;
        }
        state = state.record(true, &slow);
        let decision = calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Upgraded);
    }

    #[test]
    fn enhanced_downgrade_ignores_confidence() {
        let signals = AnswerSignals::new(20.0, 0);
        let state = EnhancedAdaptiveState::new(Difficulty::Hard, None)
            .record(false, &signals)
            .record(false, &signals);
        let decision = calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
        assert_eq!(decision.change, DifficultyChange::Downgraded);
        assert_eq!(decision.state.current_difficulty(), Difficulty::Medium);
    }

    #[test]
    fn enhanced_uses_personalised_threshold() {
        let signals = AnswerSignals::new(20.0, 0);
        let state = EnhancedAdaptiveState::new(Difficulty::Easy, Some(history(30, 27)))
            .record(true, &signals)
            .record(true, &signals);
        let decision = calculate_enhanced_adaptive_difficulty(&state, &AdaptiveConfig::default());
        assert_eq!(decision.effective_config.upgrade_threshold, 2);
        assert_eq!(decision.change, DifficultyChange::Upgraded);
        assert_eq!(decision.state.student_history.unwrap().total_questions, 32);
    }

    #[test]
    fn enhanced_state_serializes_flat() {
        let state = EnhancedAdaptiveState::new(Difficulty::Medium, None);
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["currentDifficulty"], "medium");
        assert_eq!(json["consecutiveCorrect"], 0);
        assert_eq!(json["confidenceScore"], 0.0);
    }
}
