//! Typed bindings for the ResumeAI backend endpoints. Thin glue: models
//! plus one function per endpoint, all going through the `ApiGateway`.

pub mod analysis;
pub mod cover_letter;
pub mod health;
pub mod profile;
pub mod upload;
