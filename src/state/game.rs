use std::collections::{HashMap, HashSet};
use std::time::{Instant, SystemTime};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Players allowed in a game when the creator does not say otherwise.
pub const DEFAULT_MAX_PLAYERS: usize = 20;
/// Points awarded for a correct answer.
pub const CORRECT_ANSWER_POINTS: u64 = 100;

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GameState {
    #[serde(rename = "lobby")]
    Lobby,
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "ended")]
    Ended,
}

/// A true/false question authored while the game sits in the lobby.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Username of the submitting player.
    pub author: String,
    /// Question text shown to every player.
    pub text: String,
    /// Whether "true" is the correct answer.
    pub answer_true: bool,
}

/// Outcome of recording an answer for the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// First answer from this player for this question index.
    Scored { correct: bool },
    /// The player already answered this index; nothing was changed.
    Duplicate,
}

/// What advancing past the current question did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the question at the contained index.
    Next(usize),
    /// There was no further question; the game is now ended.
    Ended,
}

/// Authoritative record of a single game, owned by the registry.
///
/// Players and scores keep insertion order: host succession and the
/// serialized roster both depend on it.
#[derive(Debug, Clone)]
pub struct Game {
    pub pin: String,
    pub host: String,
    pub state: GameState,
    pub theme: String,
    pub is_public: bool,
    pub max_players: usize,
    pub players: IndexSet<String>,
    pub scores: IndexMap<String, u64>,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
    /// Usernames that already answered, per question index.
    pub answered_by_index: HashMap<usize, HashSet<String>>,
    pub created_at: SystemTime,
    pub ended_at: Option<Instant>,
}

impl Game {
    /// Create a lobby game hosted by `host`, who joins immediately.
    pub fn new(
        pin: String,
        host: String,
        theme: String,
        is_public: bool,
        max_players: usize,
    ) -> Self {
        let mut game = Self {
            pin,
            host: host.clone(),
            state: GameState::Lobby,
            theme,
            is_public,
            max_players,
            players: IndexSet::new(),
            scores: IndexMap::new(),
            questions: Vec::new(),
            current_question_index: 0,
            answered_by_index: HashMap::new(),
            created_at: SystemTime::now(),
            ended_at: None,
        };
        game.add_player(host);
        game
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    /// Add a player to the roster, keeping the score map a superset of it.
    pub fn add_player(&mut self, username: String) {
        self.scores.entry(username.clone()).or_insert(0);
        self.players.insert(username);
    }

    /// Remove a player. Lobby exits also drop the score entry; in-progress
    /// and ended exits keep it so end screens retain the full roster.
    /// Promotes the first remaining player when the host leaves.
    pub fn remove_player(&mut self, username: &str) {
        self.players.shift_remove(username);
        if self.state == GameState::Lobby {
            self.scores.shift_remove(username);
        }
        for answered in self.answered_by_index.values_mut() {
            answered.remove(username);
        }
        if self.host == username {
            if let Some(next_host) = self.players.first() {
                self.host = next_host.clone();
            }
        }
    }

    /// Append a lobby question.
    pub fn add_question(&mut self, author: String, text: String, answer_true: bool) {
        self.questions.push(Question {
            author,
            text,
            answer_true,
        });
    }

    /// Transition lobby → inProgress, resetting per-round bookkeeping.
    pub fn start(&mut self) {
        self.state = GameState::InProgress;
        self.current_question_index = 0;
        self.answered_by_index.clear();
    }

    /// Record an answer for the current question, scoring at most once per
    /// player and index.
    pub fn record_answer(&mut self, username: &str, correct: bool) -> AnswerOutcome {
        let answered = self
            .answered_by_index
            .entry(self.current_question_index)
            .or_default();
        if !answered.insert(username.to_string()) {
            return AnswerOutcome::Duplicate;
        }
        if correct {
            *self.scores.entry(username.to_string()).or_insert(0) += CORRECT_ANSWER_POINTS;
        }
        AnswerOutcome::Scored { correct }
    }

    /// Move past the current question, ending the game when none remain.
    pub fn advance(&mut self, now: Instant) -> Advance {
        let next = self.current_question_index + 1;
        if next >= self.questions.len() {
            self.end(now);
            Advance::Ended
        } else {
            self.current_question_index = next;
            Advance::Next(next)
        }
    }

    /// Mark the game ended. Idempotent: `ended_at` is set exactly once.
    /// Returns whether this call performed the transition.
    pub fn end(&mut self, now: Instant) -> bool {
        if self.state == GameState::Ended {
            return false;
        }
        self.state = GameState::Ended;
        self.ended_at = Some(now);
        true
    }

    /// Build the serialized shape broadcast to clients.
    pub fn wire(&self) -> GameWire {
        GameWire {
            pin: self.pin.clone(),
            host: self.host.clone(),
            state: self.state,
            theme: self.theme.clone(),
            is_public: self.is_public,
            max_players: self.max_players,
            players: self.players.iter().cloned().collect(),
            scores: self.scores.clone(),
            questions: self.questions.clone(),
            current_question_index: self.current_question_index,
        }
    }
}

/// Outbound projection of a [`Game`], embedded in most server frames.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameWire {
    pub pin: String,
    pub host: String,
    pub state: GameState,
    pub theme: String,
    pub is_public: bool,
    pub max_players: usize,
    pub players: Vec<String>,
    pub scores: IndexMap<String, u64>,
    pub questions: Vec<Question>,
    pub current_question_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lobby_game() -> Game {
        Game::new(
            "123456".into(),
            "Alice".into(),
            "Math".into(),
            true,
            DEFAULT_MAX_PLAYERS,
        )
    }

    #[test]
    fn host_joins_its_own_game() {
        let game = lobby_game();
        assert!(game.players.contains("Alice"));
        assert_eq!(game.scores.get("Alice"), Some(&0));
        assert_eq!(game.state, GameState::Lobby);
    }

    #[test]
    fn scores_stay_a_superset_of_players() {
        let mut game = lobby_game();
        game.add_player("Bob".into());
        game.add_player("Carol".into());
        for player in &game.players {
            assert!(game.scores.contains_key(player));
        }
    }

    #[test]
    fn host_exit_promotes_first_remaining_player() {
        let mut game = lobby_game();
        game.add_player("Bob".into());
        game.add_player("Carol".into());

        game.remove_player("Alice");

        assert_eq!(game.host, "Bob");
        assert_eq!(game.players.len(), 2);
        assert!(!game.scores.contains_key("Alice"));
    }

    #[test]
    fn in_progress_exit_keeps_score_entry() {
        let mut game = lobby_game();
        game.add_player("Bob".into());
        game.add_question("Alice".into(), "2+2=4".into(), true);
        game.start();

        game.remove_player("Bob");

        assert!(!game.players.contains("Bob"));
        assert!(game.scores.contains_key("Bob"));
    }

    #[test]
    fn duplicate_answers_score_once() {
        let mut game = lobby_game();
        game.add_player("Bob".into());
        game.add_question("Alice".into(), "2+2=4".into(), true);
        game.start();

        assert_eq!(
            game.record_answer("Bob", true),
            AnswerOutcome::Scored { correct: true }
        );
        assert_eq!(game.record_answer("Bob", true), AnswerOutcome::Duplicate);
        assert_eq!(game.scores.get("Bob"), Some(&CORRECT_ANSWER_POINTS));
    }

    #[test]
    fn advancing_past_the_last_question_ends_the_game() {
        let mut game = lobby_game();
        game.add_question("Alice".into(), "2+2=4".into(), true);
        game.start();

        assert_eq!(game.advance(Instant::now()), Advance::Ended);
        assert_eq!(game.state, GameState::Ended);
        assert!(game.ended_at.is_some());
    }

    #[test]
    fn end_sets_ended_at_exactly_once() {
        let mut game = lobby_game();
        let first = Instant::now();
        assert!(game.end(first));
        let stamp = game.ended_at;

        assert!(!game.end(Instant::now()));
        assert_eq!(game.ended_at, stamp);
    }

    #[test]
    fn wire_shape_matches_the_protocol() {
        let mut game = lobby_game();
        game.add_question("Alice".into(), "2+2=4".into(), true);
        let value = serde_json::to_value(game.wire()).unwrap();

        assert_eq!(value["pin"], "123456");
        assert_eq!(value["state"], "lobby");
        assert_eq!(value["isPublic"], true);
        assert_eq!(value["maxPlayers"], 20);
        assert_eq!(value["players"][0], "Alice");
        assert_eq!(value["scores"]["Alice"], 0);
        assert_eq!(value["questions"][0]["answerTrue"], true);
        assert_eq!(value["currentQuestionIndex"], 0);
    }
}
