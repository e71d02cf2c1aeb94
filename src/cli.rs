use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use github_rest::{Client, Context, Response, Scope};
use log::info;
use serde::Serialize;
use std::time::Duration;

pub fn build_cli() -> Command {
    Command::new("github-rest")
        .about("Command-line client for the GitHub REST API v3")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .global(true)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .num_args(1)
                .global(true)
                .value_parser(value_parser!(u64))
                .help("Abandon the call after this many seconds"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("user")
                .about("Show a user, or the authenticated user without a login")
                .arg(Arg::new("login").num_args(1)),
        )
        .subcommand(
            Command::new("commits")
                .about("List commits of a repository")
                .arg(Arg::new("owner").required(true))
                .arg(Arg::new("repo").required(true))
                .arg(
                    Arg::new("per-page")
                        .long("per-page")
                        .num_args(1)
                        .value_parser(value_parser!(u32))
                        .default_value("0"),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .num_args(1)
                        .value_parser(value_parser!(u32))
                        .default_value("0"),
                ),
        )
        .subcommand(
            Command::new("latest-release")
                .about("Show the latest release of a repository")
                .arg(Arg::new("owner").required(true))
                .arg(Arg::new("repo").required(true)),
        )
        .subcommand(
            Command::new("download")
                .about("Download a release asset into a local file")
                .arg(Arg::new("owner").required(true))
                .arg(Arg::new("repo").required(true))
                .arg(Arg::new("tag").required(true))
                .arg(Arg::new("asset").required(true))
                .arg(Arg::new("out").required(true)),
        )
        .subcommand(
            Command::new("scopes")
                .about("Fail unless the access token grants every given OAuth scope")
                .arg(Arg::new("scope").required(true).num_args(1..)),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Respect explicit level, else default to info, allow env override via RUST_LOG
    if let Some(lvl) = level {
        std::env::set_var("RUST_LOG", lvl);
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

pub fn context(matches: &ArgMatches) -> Context {
    match matches.get_one::<u64>("timeout") {
        Some(secs) => Context::with_timeout(Duration::from_secs(*secs)),
        None => Context::background(),
    }
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

fn report(resp: &Response) {
    info!(
        "{} pages first={} prev={} next={} last={}; rate {}/{} used, resets at {}",
        resp.status,
        resp.pages.first,
        resp.pages.prev,
        resp.pages.next,
        resp.pages.last,
        resp.rate.used,
        resp.rate.limit,
        resp.rate.reset
    );
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs the selected subcommand.
pub async fn dispatch(client: &Client, ctx: &Context, matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("user", sub)) => {
            let (user, resp) = match sub.get_one::<String>("login") {
                Some(login) => client.users().get(ctx, login).await?,
                None => client.users().authenticated(ctx).await?,
            };
            report(&resp);
            print_json(&user)
        }
        Some(("commits", sub)) => {
            let per_page = sub.get_one::<u32>("per-page").copied().unwrap_or_default();
            let page = sub.get_one::<u32>("page").copied().unwrap_or_default();
            let (commits, resp) = client
                .repo(arg(sub, "owner"), arg(sub, "repo"))
                .commits(ctx, per_page, page)
                .await?;
            report(&resp);
            print_json(&commits)
        }
        Some(("latest-release", sub)) => {
            let (release, resp) = client
                .repo(arg(sub, "owner"), arg(sub, "repo"))
                .latest_release(ctx)
                .await?;
            report(&resp);
            print_json(&release)
        }
        Some(("download", sub)) => {
            let out = arg(sub, "out");
            let resp = client
                .repo(arg(sub, "owner"), arg(sub, "repo"))
                .download_release_asset(ctx, arg(sub, "tag"), arg(sub, "asset"), out)
                .await?;
            report(&resp);
            info!("saved {}", out);
            Ok(())
        }
        Some(("scopes", sub)) => {
            let scopes = sub
                .get_many::<String>("scope")
                .into_iter()
                .flatten()
                .map(|s| Scope::parse(s).ok_or_else(|| anyhow::anyhow!("unknown scope: {}", s)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            client.ensure_scopes(ctx, &scopes).await?;
            println!("ok");
            Ok(())
        }
        _ => anyhow::bail!("no command given, see --help"),
    }
}
