//! Thin wrappers over the Spotify Web API and accounts service.
//! Docs: https://developer.spotify.com/documentation/web-api

pub mod auth;
pub mod client;
pub mod types;
