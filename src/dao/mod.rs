/// Persistent user accounts and the scoreboard counter.
pub mod users;
