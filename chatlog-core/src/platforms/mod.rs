// File: chatlog-core/src/platforms/mod.rs
//
// Boundaries to the outside world: the chat event source and the Twitch
// token endpoint.

pub mod source;
pub mod twitch_helix;
