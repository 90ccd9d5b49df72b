//! Message dispatch for the game server.
//!
//! Runs entirely under the server mutex: one decoded frame in, state
//! mutations plus per-sender replies and PIN broadcasts out. Bad input earns
//! the sender an ERROR frame and never tears the connection down.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::dto::wire::{self, ServerFrame};
use crate::server::{ConnId, ServerInner};
use crate::state::game::{Advance, AnswerOutcome, DEFAULT_MAX_PLAYERS, Game, GameState};

/// Route one decoded frame to its handler.
pub fn dispatch(inner: &mut ServerInner, conn_id: ConnId, frame: Value) {
    let kind = frame
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match kind.as_str() {
        "REGISTER" => with_payload(inner, conn_id, frame, handle_register),
        "LIST_GAMES" => handle_list_games(inner, conn_id),
        "CREATE_GAME" => with_payload(inner, conn_id, frame, handle_create_game),
        "JOIN_GAME" => with_payload(inner, conn_id, frame, handle_join_game),
        "EXIT_GAME" => with_payload(inner, conn_id, frame, handle_exit_game),
        "SUBMIT_QUESTION" => with_payload(inner, conn_id, frame, handle_submit_question),
        "START_GAME" => with_payload(inner, conn_id, frame, handle_start_game),
        "ANSWER" => with_payload(inner, conn_id, frame, handle_answer),
        "NEXT_QUESTION" => with_payload(inner, conn_id, frame, handle_next_question),
        "END_GAME" => with_payload(inner, conn_id, frame, handle_end_game),
        "CHAT" => with_payload(inner, conn_id, frame, handle_chat),
        _ => error(inner, conn_id, format!("Unknown type: {kind}")),
    }
}

/// Decode the payload for a known type. Structurally broken payloads are
/// dropped like any other malformed frame.
fn with_payload<T: DeserializeOwned>(
    inner: &mut ServerInner,
    conn_id: ConnId,
    frame: Value,
    handle: fn(&mut ServerInner, ConnId, T),
) {
    match serde_json::from_value::<T>(frame) {
        Ok(payload) => handle(inner, conn_id, payload),
        Err(err) => debug!(conn_id, error = %err, "dropping malformed payload"),
    }
}

fn handle_register(inner: &mut ServerInner, conn_id: ConnId, msg: wire::Register) {
    let Some(username) = msg.username else {
        return error(inner, conn_id, "Username required");
    };
    if let Some(connection) = inner.connections.get_mut(&conn_id) {
        connection.username = Some(username.clone());
    }
    inner.reply(conn_id, &ServerFrame::RegisterOk { username });
}

fn handle_list_games(inner: &mut ServerInner, conn_id: ConnId) {
    inner.registry.sweep_ended(Instant::now());
    let games = inner.registry.listable().map(Game::wire).collect();
    inner.reply(conn_id, &ServerFrame::GamesList { games });
}

fn handle_create_game(inner: &mut ServerInner, conn_id: ConnId, msg: wire::CreateGame) {
    let Some(host) = msg.username.or_else(|| conn_username(inner, conn_id)) else {
        return error(inner, conn_id, "Register first");
    };

    let max_players = match msg.max_players {
        Some(limit) if limit > 0 => limit,
        _ => DEFAULT_MAX_PLAYERS,
    };

    let pin = inner.registry.allocate_pin();
    let game = Game::new(
        pin.clone(),
        host,
        msg.theme.unwrap_or_default(),
        msg.is_public.unwrap_or(true),
        max_players,
    );
    let wire = game.wire();
    inner.registry.insert(game);

    if let Some(connection) = inner.connections.get_mut(&conn_id) {
        connection.current_pin = Some(pin);
    }
    inner.reply(conn_id, &ServerFrame::GameCreated { game: wire });
}

fn handle_join_game(inner: &mut ServerInner, conn_id: ConnId, msg: wire::JoinGame) {
    let Some(username) = msg.username.or_else(|| conn_username(inner, conn_id)) else {
        return error(inner, conn_id, "Username required");
    };
    let Some(pin) = msg.pin else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.state != GameState::Lobby {
        return error(inner, conn_id, "Game already started");
    }
    if game.is_full() {
        return error(inner, conn_id, "Game is full");
    }

    game.add_player(username);
    let wire = game.wire();

    if let Some(connection) = inner.connections.get_mut(&conn_id) {
        connection.current_pin = Some(pin.clone());
    }
    inner.reply(conn_id, &ServerFrame::JoinedGame { game: wire.clone() });
    inner.broadcast(
        &pin,
        &ServerFrame::PlayerJoined { pin: pin.clone(), game: wire },
    );
}

fn handle_exit_game(inner: &mut ServerInner, conn_id: ConnId, msg: wire::ExitGame) {
    let Some(username) = msg.username.or_else(|| conn_username(inner, conn_id)) else {
        return error(inner, conn_id, "Username required");
    };
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };

    game.remove_player(&username);
    let deserted = game.players.is_empty();
    let wire = game.wire();

    if let Some(connection) = inner.connections.get_mut(&conn_id) {
        connection.current_pin = None;
    }

    if deserted {
        inner.registry.remove(&pin);
        debug!(%pin, "last player left; game deleted");
    } else {
        inner.broadcast(
            &pin,
            &ServerFrame::PlayerLeft { pin: pin.clone(), game: wire },
        );
    }
}

fn handle_submit_question(inner: &mut ServerInner, conn_id: ConnId, msg: wire::SubmitQuestion) {
    let Some(author) = msg.username.or_else(|| conn_username(inner, conn_id)) else {
        return error(inner, conn_id, "Register first");
    };
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(question) = msg.question else {
        return error(inner, conn_id, "Question text required");
    };
    let answer_true = wire::truthy(&msg.answer_true);

    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.state != GameState::Lobby {
        return error(inner, conn_id, "Game already started");
    }

    game.add_question(author.clone(), question.clone(), answer_true);
    inner.broadcast(
        &pin,
        &ServerFrame::QuestionSubmitted {
            pin: pin.clone(),
            username: author,
            question,
            answer_true,
        },
    );
}

fn handle_start_game(inner: &mut ServerInner, conn_id: ConnId, msg: wire::StartGame) {
    let actor = actor_or_unknown(msg.username, inner, conn_id);
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.state != GameState::Lobby {
        return error(inner, conn_id, "Game already started");
    }
    if game.host != actor {
        return error(inner, conn_id, "Only host can start");
    }
    if game.questions.is_empty() {
        return error(inner, conn_id, "Add at least 1 question before starting");
    }

    game.start();
    let wire = game.wire();
    inner.broadcast(
        &pin,
        &ServerFrame::GameStarted { pin: pin.clone(), game: wire },
    );
}

fn handle_answer(inner: &mut ServerInner, conn_id: ConnId, msg: wire::Answer) {
    let Some(username) = msg.username.or_else(|| conn_username(inner, conn_id)) else {
        return error(inner, conn_id, "Username required");
    };
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.state != GameState::InProgress {
        return error(inner, conn_id, "Game not in progress");
    }

    // Late arrivals may answer; they become players on the spot.
    if !game.players.contains(&username) {
        game.add_player(username.clone());
    }

    let correct = wire::loose_bool(&msg.correct);
    let outcome = game.record_answer(&username, correct);
    let wire = game.wire();

    inner.broadcast(
        &pin,
        &ServerFrame::ScoreUpdate {
            pin: pin.clone(),
            game: wire,
            answered_by: username,
            correct,
            duplicate: outcome == AnswerOutcome::Duplicate,
        },
    );
}

fn handle_next_question(inner: &mut ServerInner, conn_id: ConnId, msg: wire::NextQuestion) {
    let actor = actor_or_unknown(msg.username, inner, conn_id);
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.state != GameState::InProgress {
        return error(inner, conn_id, "Game not in progress");
    }
    if game.host != actor {
        return error(inner, conn_id, "Only host can advance");
    }

    let advanced = game.advance(Instant::now());
    let wire = game.wire();
    let frame = match advanced {
        Advance::Ended => ServerFrame::GameEnded { pin: pin.clone(), game: wire },
        Advance::Next(_) => ServerFrame::NextQuestion { pin: pin.clone(), game: wire },
    };
    inner.broadcast(&pin, &frame);
}

fn handle_end_game(inner: &mut ServerInner, conn_id: ConnId, msg: wire::EndGame) {
    let actor = actor_or_unknown(msg.username, inner, conn_id);
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    let Some(game) = inner.registry.get_mut(&pin) else {
        return error(inner, conn_id, "Game not found");
    };
    if game.host != actor {
        return error(inner, conn_id, "Only host can end");
    }

    // Second END_GAME is a no-op: no broadcast, ended_at untouched.
    if game.end(Instant::now()) {
        let wire = game.wire();
        inner.broadcast(
            &pin,
            &ServerFrame::GameEnded { pin: pin.clone(), game: wire },
        );
    }
}

fn handle_chat(inner: &mut ServerInner, conn_id: ConnId, msg: wire::Chat) {
    let from = actor_or_unknown(msg.username, inner, conn_id);
    let Some(pin) = msg.pin.or_else(|| conn_pin(inner, conn_id)) else {
        return error(inner, conn_id, "Game not found");
    };
    if inner.registry.get(&pin).is_none() {
        return error(inner, conn_id, "Game not found");
    }
    let message = msg.message.unwrap_or_default();

    inner.broadcast(
        &pin,
        &ServerFrame::Chat {
            pin: pin.clone(),
            from,
            message,
        },
    );
}

fn error(inner: &ServerInner, conn_id: ConnId, message: impl Into<String>) {
    inner.reply(
        conn_id,
        &ServerFrame::Error {
            message: message.into(),
        },
    );
}

/// `msg.username || conn.username || "Unknown"`.
fn actor_or_unknown(
    msg_username: Option<String>,
    inner: &ServerInner,
    conn_id: ConnId,
) -> String {
    msg_username
        .or_else(|| conn_username(inner, conn_id))
        .unwrap_or_else(|| "Unknown".into())
}

fn conn_username(inner: &ServerInner, conn_id: ConnId) -> Option<String> {
    inner
        .connections
        .get(&conn_id)
        .and_then(|connection| connection.username.clone())
}

fn conn_pin(inner: &ServerInner, conn_id: ConnId) -> Option<String> {
    inner
        .connections
        .get(&conn_id)
        .and_then(|connection| connection.current_pin.clone())
}
