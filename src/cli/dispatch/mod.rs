use crate::cli::actions::Action;
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        backend_url: matches
            .get_one("backend-url")
            .map(|s: &String| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --backend-url"))?,
        login_path: matches
            .get_one("login-path")
            .map_or_else(|| "/auth/login".to_string(), |s: &String| s.to_string()),
        frontend_url: matches.get_one("frontend-url").map_or_else(
            || "http://localhost:3000".to_string(),
            |s: &String| s.to_string(),
        ),
    })
}
