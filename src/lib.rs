//! Opener - a conversational assistant that turns requests into device actions
//!
//! Messages are classified into intents (route lookup, app install, KakaoTalk
//! share, image analysis, plain chat). Structured intents become a
//! [`response::ChatResponse`] the front-end acts on; everything else is
//! answered by the hosted LLM.

pub mod ai;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod intent;
pub mod maps;
pub mod media;
pub mod platform;
pub mod repository;
pub mod response;
pub mod session;
pub mod types;
