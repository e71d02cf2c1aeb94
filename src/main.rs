mod cli;

use github_rest::{Client, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-rest {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let client = Client::from_config(&Config::from_env())?;
    let ctx = cli::context(&matches);
    cli::dispatch(&client, &ctx, &matches).await
}
