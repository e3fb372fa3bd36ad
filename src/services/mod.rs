pub mod orchestrator;
pub mod playlist_retention;
pub mod spotify;
pub mod track_resolver;
