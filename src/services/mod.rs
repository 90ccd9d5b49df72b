/// Account management: hashing, tokens, identity resolution.
pub mod auth_service;
/// OpenAPI document assembly.
pub mod documentation;
/// Bridge-side orchestration of game operations.
pub mod game_service;
/// Health reporting.
pub mod health_service;
/// Broadcast-to-SSE plumbing.
pub mod sse_service;
