use std::{env, process};

use getopts::Options;
use mikosite_server::probe::{Probe, DEFAULT_SITE_URL};
use tracing::error;

const WEBHOOK_VAR: &str = "WEBHOOK_URL";
const ROLE_VAR: &str = "PROBE_ROLE_ID";
const DEFAULT_ROLE_ID: &str = "1273275208610086983";

fn parse(args: Vec<String>) -> Probe {
    let mut opts = Options::new();
    opts.optflag("h", "help", "Print this help output");
    opts.optopt(
        "u",
        "url",
        &format!("Site to check [Default: {DEFAULT_SITE_URL}]"),
        "URL",
    );
    opts.optopt(
        "w",
        "webhook-url",
        "Discord webhook receiving alerts [env: WEBHOOK_URL]",
        "URL",
    );
    opts.optopt(
        "r",
        "role-id",
        "Discord role mentioned in alerts [env: PROBE_ROLE_ID]",
        "ID",
    );

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage("mikosite-probe")));
        process::exit(0);
    }

    let Some(webhook_url) = matches
        .opt_str("webhook-url")
        .or_else(|| env::var(WEBHOOK_VAR).ok())
    else {
        eprintln!("Missing webhook url, pass --webhook-url or set {WEBHOOK_VAR}");
        process::exit(1);
    };

    Probe {
        site_url: matches
            .opt_str("url")
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
        webhook_url,
        role_id: matches
            .opt_str("role-id")
            .or_else(|| env::var(ROLE_VAR).ok())
            .unwrap_or_else(|| DEFAULT_ROLE_ID.to_string()),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mikosite_server=info,mikosite_probe=info".into()),
        )
        .init();

    let probe = parse(env::args().collect());

    if let Err(err) = probe.run().await {
        error!(%err, "probe failed");
        process::exit(1);
    }
}
