use github_rest::{Client, Config, Context, IssuesParams};

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn should_run_live() -> bool {
    matches!(env_var("LIVE_API_TESTS").as_deref(), Some("1"))
        && (env_var("GITHUB_TOKEN").is_some() || env_var("GH_TOKEN").is_some())
}

fn target() -> Option<(String, String)> {
    match (env_var("E2E_OWNER"), env_var("E2E_REPO")) {
        (Some(owner), Some(repo)) => Some((owner, repo)),
        _ => {
            eprintln!("skipping: E2E_OWNER/E2E_REPO not set");
            None
        }
    }
}

#[ignore]
#[tokio::test]
async fn live_list_issues_basic() -> anyhow::Result<()> {
    if !should_run_live() {
        eprintln!("skipping live test: LIVE_API_TESTS!=1 or token missing");
        return Ok(());
    }
    let Some((owner, repo)) = target() else {
        return Ok(());
    };

    let client = Client::from_config(&Config::from_env())?;
    let ctx = Context::background();
    let (issues, resp) = client
        .repo(&owner, &repo)
        .issues(&ctx, 5, 1, &IssuesParams::default())
        .await?;
    assert!(issues.len() <= 5);
    assert!(resp.rate.limit > 0);
    Ok(())
}

#[ignore]
#[tokio::test]
async fn live_commits_and_authenticated_user() -> anyhow::Result<()> {
    if !should_run_live() {
        eprintln!("skipping live test: LIVE_API_TESTS!=1 or token missing");
        return Ok(());
    }
    let Some((owner, repo)) = target() else {
        return Ok(());
    };

    let client = Client::from_config(&Config::from_env())?;
    let ctx = Context::background();
    let (user, _) = client.users().authenticated(&ctx).await?;
    assert!(!user.login.is_empty());

    let (commits, resp) = client.repo(&owner, &repo).commits(&ctx, 2, 1).await?;
    assert!(!commits.is_empty());
    assert!(resp.pages.next == 0 || resp.pages.next == 2);
    Ok(())
}
