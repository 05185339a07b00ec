//! Hit/stand decision strategies

use crate::config::{StrategyConfig, StrategyKind};
use protocol::{Card, DEALER_STAND_THRESHOLD, Decision, Hand};

/// What the player can see when deciding
#[derive(Debug, Clone, Copy)]
pub struct TableView<'a> {
    pub player: &'a Hand,
    /// The dealer's cards that have been sent so far
    pub dealer: &'a [Card],
}

pub trait Strategy: Send + Sync {
    fn decide(&self, view: &TableView<'_>) -> Decision;

    fn name(&self) -> String;
}

/// Plays the dealer's rule: hit below 17.
#[derive(Debug, Clone, Copy, Default)]
pub struct DealerMirror;

impl Strategy for DealerMirror {
    fn decide(&self, view: &TableView<'_>) -> Decision {
        Threshold(DEALER_STAND_THRESHOLD).decide(view)
    }

    fn name(&self) -> String {
        "dealer-mirror".to_string()
    }
}

/// Hit while the hand is below the given total.
#[derive(Debug, Clone, Copy)]
pub struct Threshold(pub u32);

impl Strategy for Threshold {
    fn decide(&self, view: &TableView<'_>) -> Decision {
        if view.player.total() < self.0 {
            Decision::Hit
        } else {
            Decision::Stand
        }
    }

    fn name(&self) -> String {
        format!("threshold({})", self.0)
    }
}

pub fn from_config(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config.kind {
        StrategyKind::DealerMirror => Box::new(DealerMirror),
        StrategyKind::Threshold => Box::new(Threshold(config.stand_on)),
    }
}
