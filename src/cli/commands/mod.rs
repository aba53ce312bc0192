use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("fetraf-gateway")
        .about("Session and credential gateway for the FETRAF dashboard")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("FETRAF_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("backend-url")
                .short('b')
                .long("backend-url")
                .help("Backend API base URL, example: http://localhost:3333")
                .env("FETRAF_BACKEND_URL")
                .required(true),
        )
        .arg(
            Arg::new("login-path")
                .long("login-path")
                .help("Login path on the backend API")
                .default_value("/auth/login")
                .env("FETRAF_LOGIN_PATH"),
        )
        .arg(
            Arg::new("frontend-url")
                .long("frontend-url")
                .help("Public base URL of the dashboard, used for reset links, the CORS origin and the cookie Secure flag")
                .default_value("http://localhost:3000")
                .env("FETRAF_FRONTEND_URL"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("FETRAF_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
