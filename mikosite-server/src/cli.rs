use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use getopts::Options;

const ADDR_VAR: &str = "MIKOSITE_ADDR";
const DATA_VAR: &str = "MIKOSITE_DATA";
const ADMIN_TOKENS_VAR: &str = "MIKOSITE_ADMIN_TOKENS";
const RATE_LIMIT_VAR: &str = "MIKOSITE_RATE_LIMIT";
const LOG_VAR: &str = "RUST_LOG";

const DEFAULT_RATE_LIMIT: u32 = 120;

const DEFAULT_LOG_FILTER: &str = "mikosite_server=info,tower_http=info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub address: SocketAddr,
    pub data: Option<PathBuf>,
    pub admin_tokens: Vec<String>,
    pub enable_cache: bool,
    pub rate_limit: u32,
    pub log_filter: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Parsed {
    Help(String),
    Run(Args),
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080, env: MIKOSITE_ADDR]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "d",
        "data",
        "JSON snapshot to load at startup and rewrite after every change [env: MIKOSITE_DATA]",
        "FILE",
    );
    opts.optmulti(
        "k",
        "admin-token",
        "Token granting write access to the API, repeatable [env: MIKOSITE_ADMIN_TOKENS, comma separated]",
        "TOKEN",
    );
    opts.optflag(
        "c",
        "disable-cache",
        "Disable caching of page data [Default: cache enabled]",
    );
    opts.optopt(
        "r",
        "rate-limit",
        "Requests per minute allowed from one client without an admin token, 0 disables [Default: 120, env: MIKOSITE_RATE_LIMIT]",
        "COUNT",
    );
    opts.optopt(
        "l",
        "log",
        "Log filter directives [Default: mikosite_server=info, env: RUST_LOG]",
        "FILTER",
    );
    opts
}

/// Command-line options win over environment variables.
pub fn try_parse<F>(args: Vec<String>, env: F) -> Result<Parsed, String>
where
    F: Fn(&str) -> Option<String>,
{
    let opts = opts();
    let matches = opts.parse(args.iter().skip(1)).map_err(|fail| fail.to_string())?;

    if matches.opt_present("help") {
        let usage = opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME")));
        return Ok(Parsed::Help(usage));
    }

    let address = match matches.opt_str("address").or_else(|| env(ADDR_VAR)) {
        Some(raw) => raw
            .parse()
            .map_err(|err| format!("Provided value for option 'address' is invalid: {err}"))?,
        None => SocketAddr::from(([127, 0, 0, 1], 8080)),
    };

    let data = matches
        .opt_str("data")
        .or_else(|| env(DATA_VAR))
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    let mut admin_tokens = matches.opt_strs("admin-token");
    if admin_tokens.is_empty() {
        admin_tokens = env(ADMIN_TOKENS_VAR)
            .map(|raw| raw.split(',').map(|token| token.trim().to_string()).collect())
            .unwrap_or_default();
    }
    admin_tokens.retain(|token| !token.is_empty());

    let rate_limit = match matches.opt_str("rate-limit").or_else(|| env(RATE_LIMIT_VAR)) {
        Some(raw) => raw
            .parse()
            .map_err(|err| format!("Provided value for option 'rate-limit' is invalid: {err}"))?,
        None => DEFAULT_RATE_LIMIT,
    };

    let log_filter = matches
        .opt_str("log")
        .or_else(|| env(LOG_VAR))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    Ok(Parsed::Run(Args {
        address,
        data,
        admin_tokens,
        enable_cache: !matches.opt_present("disable-cache"),
        rate_limit,
        log_filter,
    }))
}

pub fn parse(args: Vec<String>) -> Args {
    match try_parse(args, |key| env::var(key).ok()) {
        Ok(Parsed::Run(args)) => args,
        Ok(Parsed::Help(usage)) => {
            println!("{usage}");
            process::exit(0);
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn run(args: &[&str], env: &[(&str, &str)]) -> Result<Parsed, String> {
        let env = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        let args = std::iter::once("mikosite-server")
            .chain(args.iter().copied())
            .map(String::from)
            .collect();

        try_parse(args, |key| env.get(key).cloned())
    }

    fn args(parsed: Result<Parsed, String>) -> Args {
        match parsed {
            Ok(Parsed::Run(args)) => args,
            other => panic!("expected runnable args, got {other:?}"),
        }
    }

    #[test]
    fn defaults() {
        let args = args(run(&[], &[]));
        assert_eq!(args.address, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(args.data, None);
        assert!(args.admin_tokens.is_empty());
        assert!(args.enable_cache);
        assert_eq!(args.rate_limit, DEFAULT_RATE_LIMIT);
        assert_eq!(args.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn flags_override_environment() {
        let args = args(run(
            &["-a", "0.0.0.0:9000", "-k", "first", "--admin-token", "second", "-c", "-r", "0"],
            &[(ADDR_VAR, "127.0.0.1:1"), (ADMIN_TOKENS_VAR, "env"), (RATE_LIMIT_VAR, "30")],
        ));

        assert_eq!(args.address, SocketAddr::from(([0, 0, 0, 0], 9000)));
        assert_eq!(args.admin_tokens, ["first", "second"]);
        assert!(!args.enable_cache);
        assert_eq!(args.rate_limit, 0);
    }

    #[test]
    fn environment_fills_the_gaps() {
        let args = args(run(
            &[],
            &[
                (DATA_VAR, "/var/lib/mikosite.json"),
                (ADMIN_TOKENS_VAR, "a, b,,"),
                (LOG_VAR, "debug"),
                (RATE_LIMIT_VAR, "30"),
            ],
        ));

        assert_eq!(args.data, Some(PathBuf::from("/var/lib/mikosite.json")));
        assert_eq!(args.admin_tokens, ["a", "b"]);
        assert_eq!(args.log_filter, "debug");
        assert_eq!(args.rate_limit, 30);
    }

    #[test]
    fn invalid_address_is_reported() {
        let err = run(&["--address", "nowhere"], &[]).unwrap_err();
        assert!(err.contains("'address'"));

        let err = run(&["--rate-limit=lots"], &[]).unwrap_err();
        assert!(err.contains("'rate-limit'"));
    }

    #[test]
    fn help_is_not_an_error() {
        assert!(matches!(run(&["-h"], &[]), Ok(Parsed::Help(_))));
    }
}
