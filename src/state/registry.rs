use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::state::game::{Game, GameState};

/// How long an ended game stays visible so clients can render end screens.
pub const ENDED_GAME_TTL: Duration = Duration::from_secs(120);

/// Live games keyed by PIN. All access is serialized by the server mutex.
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: HashMap<String, Game>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a 6-digit PIN not currently keyed in the registry.
    pub fn allocate_pin(&self) -> String {
        let mut rng = rand::rng();
        loop {
            let pin: String = (0..6)
                .map(|_| char::from(b'0' + rng.random_range(0..10)))
                .collect();
            if !self.games.contains_key(&pin) {
                return pin;
            }
        }
    }

    pub fn get(&self, pin: &str) -> Option<&Game> {
        self.games.get(pin)
    }

    pub fn get_mut(&mut self, pin: &str) -> Option<&mut Game> {
        self.games.get_mut(pin)
    }

    pub fn insert(&mut self, game: Game) {
        self.games.insert(game.pin.clone(), game);
    }

    pub fn remove(&mut self, pin: &str) -> Option<Game> {
        self.games.remove(pin)
    }

    /// Public lobby games, the only ones surfaced by LIST_GAMES.
    pub fn listable(&self) -> impl Iterator<Item = &Game> {
        self.games
            .values()
            .filter(|game| game.state == GameState::Lobby && game.is_public)
    }

    /// Drop every ended game whose TTL has elapsed.
    pub fn sweep_ended(&mut self, now: Instant) {
        self.games.retain(|pin, game| {
            let expired = game
                .ended_at
                .is_some_and(|ended_at| now.duration_since(ended_at) >= ENDED_GAME_TTL);
            if expired {
                debug!(%pin, "sweeping ended game");
            }
            !expired
        });
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::DEFAULT_MAX_PLAYERS;

    fn game(pin: &str) -> Game {
        Game::new(
            pin.into(),
            "Alice".into(),
            String::new(),
            true,
            DEFAULT_MAX_PLAYERS,
        )
    }

    #[test]
    fn allocated_pins_are_six_digits_and_fresh() {
        let mut registry = GameRegistry::new();
        for _ in 0..32 {
            let pin = registry.allocate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
            assert!(registry.get(&pin).is_none());
            registry.insert(game(&pin));
        }
        assert_eq!(registry.len(), 32);
    }

    #[test]
    fn sweep_removes_only_expired_ended_games() {
        let mut registry = GameRegistry::new();
        let now = Instant::now();

        registry.insert(game("111111"));

        let mut finished = game("222222");
        finished.end(now - ENDED_GAME_TTL);
        registry.insert(finished);

        let mut recent = game("333333");
        recent.end(now);
        registry.insert(recent);

        registry.sweep_ended(now);

        assert!(registry.get("111111").is_some());
        assert!(registry.get("222222").is_none());
        assert!(registry.get("333333").is_some());
    }

    #[test]
    fn listable_excludes_private_and_started_games() {
        let mut registry = GameRegistry::new();
        registry.insert(game("111111"));

        let mut hidden = game("222222");
        hidden.is_public = false;
        registry.insert(hidden);

        let mut started = game("333333");
        started.add_question("Alice".into(), "q".into(), true);
        started.start();
        registry.insert(started);

        let pins: Vec<&str> = registry.listable().map(|game| game.pin.as_str()).collect();
        assert_eq!(pins, vec!["111111"]);
    }
}
