use arq_lab_abstract::{DropSpec, Frame};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;

/// Decides, per received frame, whether the receiver discards the
/// acknowledgement instead of sending it. Every arrival gets a fresh,
/// independent decision; retransmissions are not special.
pub trait DropPolicy: Send {
    fn should_drop(&mut self, frame: &Frame) -> bool;
}

/// Acknowledge everything.
pub struct NeverDrop;

impl DropPolicy for NeverDrop {
    fn should_drop(&mut self, _frame: &Frame) -> bool {
        false
    }
}

/// Discard everything.
pub struct AlwaysDrop;

impl DropPolicy for AlwaysDrop {
    fn should_drop(&mut self, _frame: &Frame) -> bool {
        true
    }
}

/// Seeded independent draw per frame.
pub struct RandomDrop {
    probability: f64,
    rng: StdRng,
}

impl RandomDrop {
    pub fn new(probability: f64, seed: u64) -> Self {
        Self {
            probability,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DropPolicy for RandomDrop {
    fn should_drop(&mut self, _frame: &Frame) -> bool {
        self.rng.random::<f64>() < self.probability
    }
}

/// Plays back a fixed decision sequence (`true` discards), then stops
/// dropping.
pub struct ScriptedDrop {
    decisions: VecDeque<bool>,
}

impl ScriptedDrop {
    pub fn new(decisions: impl IntoIterator<Item = bool>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
        }
    }
}

impl DropPolicy for ScriptedDrop {
    fn should_drop(&mut self, _frame: &Frame) -> bool {
        self.decisions.pop_front().unwrap_or(false)
    }
}

/// Build the policy a `DropSpec` describes.
pub fn from_spec(spec: &DropSpec) -> Box<dyn DropPolicy> {
    match spec {
        DropSpec::Never => Box::new(NeverDrop),
        DropSpec::Always => Box::new(AlwaysDrop),
        DropSpec::Random { probability, seed } => {
            Box::new(RandomDrop::new(*probability, *seed))
        }
        DropSpec::Script { decisions } => {
            Box::new(ScriptedDrop::new(decisions.iter().copied()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(policy: &mut dyn DropPolicy, n: usize) -> Vec<bool> {
        let frame = Frame::new(1);
        (0..n).map(|_| policy.should_drop(&frame)).collect()
    }

    #[test]
    fn script_plays_back_then_passes_everything() {
        let mut policy = ScriptedDrop::new([true, false, true]);
        assert_eq!(draws(&mut policy, 5), vec![true, false, true, false, false]);
    }

    #[test]
    fn same_seed_same_decisions() {
        let mut a = RandomDrop::new(0.25, 42);
        let mut b = RandomDrop::new(0.25, 42);
        assert_eq!(draws(&mut a, 100), draws(&mut b, 100));
    }

    #[test]
    fn degenerate_probabilities() {
        let mut never = RandomDrop::new(0.0, 7);
        assert!(draws(&mut never, 50).iter().all(|&d| !d));
        let mut always = RandomDrop::new(1.0, 7);
        assert!(draws(&mut always, 50).iter().all(|&d| d));
    }

    #[test]
    fn drop_spec_builds_matching_policy() {
        let mut policy = from_spec(&DropSpec::Script {
            decisions: vec![true, true],
        });
        assert_eq!(draws(policy.as_mut(), 3), vec![true, true, false]);
        let mut policy = from_spec(&DropSpec::Never);
        assert_eq!(draws(policy.as_mut(), 2), vec![false, false]);
        let mut policy = from_spec(&DropSpec::Always);
        assert_eq!(draws(policy.as_mut(), 2), vec![true, true]);
    }
}
