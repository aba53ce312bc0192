//! # FETRAF Gateway
//!
//! Session and credential gateway sitting between the FETRAF admin dashboard
//! and the backend API. It owns three concerns:
//!
//! - **Login negotiation**: the backend's login endpoint has drifted between
//!   field namings and body encodings over the years, so login tries an
//!   ordered list of candidate encodings and extracts the bearer token from
//!   whichever response shape comes back.
//! - **Password reset**: single-use, time-boxed reset tokens held in an
//!   in-process store; applying the new secret is delegated to the
//!   credential-owning service.
//! - **Forwarding**: every protected resource request is re-issued to the
//!   backend with the server-held bearer credential attached, and the
//!   response (including binary downloads) is streamed back verbatim.
//!
//! The browser only ever holds an opaque `HttpOnly` session cookie; the
//! bearer token never reaches page scripts, and upstream redirects are not
//! followed so the injected `Authorization` header cannot leak to third
//! parties.

pub mod cli;
pub mod gateway;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
