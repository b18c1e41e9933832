//! Alert classification and suggested routes.
//!
//! A [`RoutePolicy`] is an ordered list of tiers. Each tier has an upper
//! bound that is either the configured threshold, a fixed constant, or open.
//! The first tier whose bound lies strictly above the smoothed score wins.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Fixed boundary between the medium and high tiers of the default policy.
pub const HIGH_BOUNDARY: f64 = 0.70;

/// Route label used when no region was detected.
pub const NO_REGION_LABEL: &str = "no region detected — pause and breathe";

/// Default alert cooldown.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(8);

/// Discrete alert level, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertLevel {
    #[serde(rename = "neutro")]
    Neutral,
    #[serde(rename = "leve")]
    Low,
    #[serde(rename = "medio")]
    Medium,
    #[serde(rename = "alto")]
    High,
}

impl AlertLevel {
    /// Wire tag for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Neutral => "neutro",
            AlertLevel::Low => "leve",
            AlertLevel::Medium => "medio",
            AlertLevel::High => "alto",
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "neutro" => Some(AlertLevel::Neutral),
            "leve" => Some(AlertLevel::Low),
            "medio" => Some(AlertLevel::Medium),
            "alto" => Some(AlertLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification result for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertState {
    pub level: AlertLevel,
    pub route_label: String,
}

/// Upper bound of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum TierBound {
    /// The threshold passed to [`RouteClassifier::classify`]
    Threshold,
    /// A constant boundary
    Fixed(f64),
    /// No upper bound; must terminate the policy
    Open,
}

impl TierBound {
    fn admits(&self, smoothed: f64, threshold: f64) -> bool {
        match self {
            TierBound::Threshold => smoothed < threshold,
            TierBound::Fixed(bound) => smoothed < *bound,
            TierBound::Open => true,
        }
    }
}

/// One `(upper bound, level, label)` entry of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTier {
    pub upper_bound: TierBound,
    pub level: AlertLevel,
    pub label: String,
}

impl RouteTier {
    pub fn new(upper_bound: TierBound, level: AlertLevel, label: impl Into<String>) -> Self {
        Self {
            upper_bound,
            level,
            label: label.into(),
        }
    }
}

/// Errors in a route policy definition.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    Empty,
    MissingOpenTier,
    OpenTierNotLast(usize),
    NeutralTier(usize),
    DecreasingLevel(usize),
    NonFiniteBound(usize),
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::Empty => write!(f, "Route policy has no tiers"),
            PolicyError::MissingOpenTier => write!(f, "Last route tier must be open-ended"),
            PolicyError::OpenTierNotLast(i) => write!(f, "Open-ended tier {i} is not the last tier"),
            PolicyError::NeutralTier(i) => write!(f, "Tier {i} uses the reserved neutral level"),
            PolicyError::DecreasingLevel(i) => write!(f, "Tier {i} is less severe than the tier before it"),
            PolicyError::NonFiniteBound(i) => write!(f, "Tier {i} has a non-finite bound"),
        }
    }
}

impl std::error::Error for PolicyError {}

/// Ordered tier table mapping smoothed scores to levels and routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RouteTier>", into = "Vec<RouteTier>")]
pub struct RoutePolicy {
    tiers: Vec<RouteTier>,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::three_tier()
    }
}

impl RoutePolicy {
    /// Validate and build a policy.
    pub fn new(tiers: Vec<RouteTier>) -> Result<Self, PolicyError> {
        if tiers.is_empty() {
            return Err(PolicyError::Empty);
        }

        let last = tiers.len() - 1;
        for (i, tier) in tiers.iter().enumerate() {
            match tier.upper_bound {
                TierBound::Open if i != last => return Err(PolicyError::OpenTierNotLast(i)),
                TierBound::Fixed(b) if !b.is_finite() => return Err(PolicyError::NonFiniteBound(i)),
                _ => {}
            }
            if tier.level == AlertLevel::Neutral {
                return Err(PolicyError::NeutralTier(i));
            }
            if i > 0 && tier.level < tiers[i - 1].level {
                return Err(PolicyError::DecreasingLevel(i));
            }
        }
        if tiers[last].upper_bound != TierBound::Open {
            return Err(PolicyError::MissingOpenTier);
        }

        Ok(Self { tiers })
    }

    /// `leve` below the threshold, `medio` below 0.70, `alto` above.
    pub fn three_tier() -> Self {
        Self {
            tiers: vec![
                RouteTier::new(TierBound::Threshold, AlertLevel::Low, "carry on calmly"),
                RouteTier::new(
                    TierBound::Fixed(HIGH_BOUNDARY),
                    AlertLevel::Medium,
                    "guided pause: breathe slowly for 60s",
                ),
                RouteTier::new(TierBound::Open, AlertLevel::High, "stop now: take a 5 minute break"),
            ],
        }
    }

    /// `leve` below the threshold, `alto` otherwise.
    pub fn two_tier() -> Self {
        Self {
            tiers: vec![
                RouteTier::new(TierBound::Threshold, AlertLevel::Low, "carry on calmly"),
                RouteTier::new(TierBound::Open, AlertLevel::High, "stop now: take a 5 minute break"),
            ],
        }
    }

    pub fn tiers(&self) -> &[RouteTier] {
        &self.tiers
    }
}

impl TryFrom<Vec<RouteTier>> for RoutePolicy {
    type Error = PolicyError;

    fn try_from(tiers: Vec<RouteTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<RoutePolicy> for Vec<RouteTier> {
    fn from(policy: RoutePolicy) -> Self {
        policy.tiers
    }
}

/// Maps smoothed scores to alert states using a [`RoutePolicy`].
#[derive(Debug, Clone, Default)]
pub struct RouteClassifier {
    policy: RoutePolicy,
}

impl RouteClassifier {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    /// Classify a smoothed score against `threshold`.
    pub fn classify(&self, smoothed: f64, threshold: f64) -> AlertState {
        // A validated policy always ends with an open tier, so `find` only
        // falls through for NaN scores; treat those as the top tier.
        let tier = self
            .policy
            .tiers
            .iter()
            .find(|t| t.upper_bound.admits(smoothed, threshold))
            .unwrap_or_else(|| &self.policy.tiers[self.policy.tiers.len() - 1]);

        AlertState {
            level: tier.level,
            route_label: tier.label.clone(),
        }
    }

    /// State for a frame where no region was detected.
    pub fn classify_absent(&self) -> AlertState {
        AlertState {
            level: AlertLevel::Neutral,
            route_label: NO_REGION_LABEL.to_string(),
        }
    }
}

/// One-shot alert gate, independent of classification and emission.
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    cooldown: Duration,
    last_alert: Option<Instant>,
}

impl Default for AlertCooldown {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl AlertCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alert: None,
        }
    }

    /// Returns `true` and restarts the clock when an alert should fire.
    pub fn check(&mut self, now: Instant, smoothed: f64, threshold: f64) -> bool {
        if smoothed < threshold {
            return false;
        }
        let elapsed_ok = match self.last_alert {
            Some(last) => now.saturating_duration_since(last) > self.cooldown,
            None => true,
        };
        if elapsed_ok {
            self.last_alert = Some(now);
        }
        elapsed_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_tier_boundaries() {
        let classifier = RouteClassifier::default();
        assert_eq!(classifier.classify(0.2, 0.35).level, AlertLevel::Low);
        assert_eq!(classifier.classify(0.35, 0.35).level, AlertLevel::Medium);
        assert_eq!(classifier.classify(0.69, 0.35).level, AlertLevel::Medium);
        assert_eq!(classifier.classify(0.70, 0.35).level, AlertLevel::High);
        assert_eq!(classifier.classify(1.0, 0.35).level, AlertLevel::High);
    }

    #[test]
    fn test_two_tier() {
        let classifier = RouteClassifier::new(RoutePolicy::two_tier());
        let low = classifier.classify(0.64, 0.65);
        let high = classifier.classify(0.65, 0.65);
        assert_eq!(low.level, AlertLevel::Low);
        assert_eq!(high.level, AlertLevel::High);
        assert_eq!(high.route_label, "stop now: take a 5 minute break");
    }

    #[test]
    fn test_classification_is_monotonic() {
        for policy in [RoutePolicy::three_tier(), RoutePolicy::two_tier()] {
            let classifier = RouteClassifier::new(policy);
            for threshold in [0.0, 0.35, 0.65, 0.9] {
                let mut previous = AlertLevel::Low;
                for step in 0..=100 {
                    let level = classifier.classify(step as f64 / 100.0, threshold).level;
                    assert!(level >= previous, "level dropped at {step} (thr {threshold})");
                    previous = level;
                }
            }
        }
    }

    #[test]
    fn test_absent_region() {
        let state = RouteClassifier::default().classify_absent();
        assert_eq!(state.level, AlertLevel::Neutral);
        assert_eq!(state.route_label, "no region detected — pause and breathe");
    }

    #[test]
    fn test_policy_validation() {
        assert_eq!(RoutePolicy::new(Vec::new()), Err(PolicyError::Empty));
        assert_eq!(
            RoutePolicy::new(vec![RouteTier::new(TierBound::Threshold, AlertLevel::Low, "x")]),
            Err(PolicyError::MissingOpenTier)
        );
        assert_eq!(
            RoutePolicy::new(vec![
                RouteTier::new(TierBound::Threshold, AlertLevel::High, "x"),
                RouteTier::new(TierBound::Open, AlertLevel::Low, "y"),
            ]),
            Err(PolicyError::DecreasingLevel(1))
        );
        assert!(RoutePolicy::new(RoutePolicy::three_tier().tiers().to_vec()).is_ok());
    }

    #[test]
    fn test_policy_from_json() {
        let json = r#"[
            {"upper_bound": {"kind": "threshold"}, "level": "leve", "label": "ok"},
            {"upper_bound": {"kind": "fixed", "value": 0.8}, "level": "medio", "label": "slow down"},
            {"upper_bound": {"kind": "open"}, "level": "alto", "label": "stop"}
        ]"#;
        let policy: RoutePolicy = serde_json::from_str(json).unwrap();
        let classifier = RouteClassifier::new(policy);
        assert_eq!(classifier.classify(0.75, 0.5).route_label, "slow down");

        let bad = r#"[{"upper_bound": {"kind": "threshold"}, "level": "leve", "label": "ok"}]"#;
        assert!(serde_json::from_str::<RoutePolicy>(bad).is_err());
    }

    #[test]
    fn test_level_tags() {
        for level in [AlertLevel::Neutral, AlertLevel::Low, AlertLevel::Medium, AlertLevel::High] {
            assert_eq!(AlertLevel::from_tag(level.as_str()), Some(level));
        }
        assert_eq!(AlertLevel::from_tag("extreme"), None);
        assert_eq!(serde_json::to_string(&AlertLevel::Medium).unwrap(), "\"medio\"");
    }

    #[test]
    fn test_cooldown_gates_alerts() {
        let mut cooldown = AlertCooldown::new(Duration::from_secs(8));
        let t0 = Instant::now();

        assert!(!cooldown.check(t0, 0.3, 0.65));
        assert!(cooldown.check(t0, 0.7, 0.65));
        assert!(!cooldown.check(t0 + Duration::from_secs(5), 0.9, 0.65));
        assert!(!cooldown.check(t0 + Duration::from_secs(8), 0.9, 0.65));
        assert!(cooldown.check(t0 + Duration::from_millis(8001), 0.9, 0.65));
    }
}
