//! Console output and win/loss statistics

use crate::discovery::ServerOffer;
use protocol::game::Outcome;
use protocol::{Card, Decision, Hand};

fn now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub fn offer(offer: &ServerOffer) {
    println!(
        "[{}] Received offer from {} ({}), connecting...",
        now(),
        offer.name,
        offer.addr
    );
}

pub fn round_start(round: u8, total: u8) {
    println!("[{}] --- Round {}/{} ---", now(), round, total);
}

pub fn player_card(card: Card, hand: &Hand) {
    println!("[{}] You got {} (total {})", now(), card, hand.total());
}

pub fn dealer_card(card: Card, dealer: &Hand) {
    println!("[{}] Dealer shows {} (total {})", now(), card, dealer.total());
}

pub fn decision(decision: Decision, hand: &Hand) {
    println!("[{}] {} on {}", now(), decision, hand.total());
}

pub fn round_result(outcome: Outcome, player: &Hand, dealer: &Hand) {
    let verdict = match outcome {
        Outcome::Win => "You win",
        Outcome::Loss => "You lose",
        Outcome::Tie => "Tie",
    };
    println!("[{}] {}! You: {} | Dealer: {}", now(), verdict, player, dealer);
}

pub fn statistics(label: &str, stats: &Statistics) {
    println!("[{}] {}: {}", now(), label, stats);
}

/// Win/loss/tie counts from the player's side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Statistics {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Tie => self.ties += 1,
        }
    }

    pub fn merge(&mut self, other: &Statistics) {
        self.wins += other.wins;
        self.losses += other.losses;
        self.ties += other.ties;
    }

    pub fn rounds(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Percentage of rounds won, 0 when nothing was played
    pub fn win_rate(&self) -> f64 {
        match self.rounds() {
            0 => 0.0,
            rounds => f64::from(self.wins) * 100.0 / f64::from(rounds),
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Finished playing {} rounds, win rate: {:.1}% ({}W-{}L-{}T)",
            self.rounds(),
            self.win_rate(),
            self.wins,
            self.losses,
            self.ties
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_rate() {
        let mut stats = Statistics::default();
        assert_eq!(stats.win_rate(), 0.0);

        for outcome in [Outcome::Win, Outcome::Loss, Outcome::Win, Outcome::Tie] {
            stats.record(outcome);
        }
        assert_eq!(stats.rounds(), 4);
        assert_eq!(stats.win_rate(), 50.0);
        assert_eq!(
            stats.to_string(),
            "Finished playing 4 rounds, win rate: 50.0% (2W-1L-1T)"
        );
    }

    #[test]
    fn test_merge() {
        let mut overall = Statistics { wins: 1, losses: 2, ties: 0 };
        overall.merge(&Statistics { wins: 3, losses: 0, ties: 1 });
        assert_eq!(overall, Statistics { wins: 4, losses: 2, ties: 1 });
    }
}
