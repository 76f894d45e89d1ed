//! Integration tests driving the administrative subcommands end to end
//! against a file-backed database.
#![cfg(feature = "sqlite")]

use clap::Parser;
use gazette::{
    app::{Cli, run_with_cli},
    db::{self, establish_pool},
};
use rstest::{fixture, rstest};
use tempfile::TempDir;
use test_util::AnyError;

struct Site {
    dir: TempDir,
}

impl Site {
    fn database(&self) -> String { self.dir.path().join("gazette.db").display().to_string() }

    fn cli(&self, command: &[&str]) -> Result<Cli, AnyError> {
        let database = self.database();
        let media = self.dir.path().join("media").display().to_string();
        let mut args = vec![
            "gazette",
            "--database",
            &database,
            "--media-dir",
            &media,
            "--secret-key",
            "cli-secret",
            "--argon2-m-cost",
            "1024",
            "--argon2-t-cost",
            "1",
        ];
        args.extend_from_slice(command);
        Ok(Cli::try_parse_from(args)?)
    }

    async fn run(&self, command: &[&str]) -> Result<(), AnyError> { run_with_cli(self.cli(command)?).await }
}

#[fixture]
fn site() -> Site {
    Site {
        dir: TempDir::new().expect("tempdir"),
    }
}

#[rstest]
#[tokio::test]
async fn bare_invocation_migrates_the_database(site: Site) -> Result<(), AnyError> {
    site.run(&[]).await?;
    let pool = establish_pool(&site.database()).await?;
    let mut conn = pool.get().await?;
    assert!(db::list_super_rubrics(&mut conn).await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn create_user_and_rubrics_then_clean_up(site: Site) -> Result<(), AnyError> {
    site.run(&["create-user", "admin", "--password", "s3cret-pass", "--superuser"])
        .await?;
    site.run(&["add-rubric", "News", "--order", "1"]).await?;
    site.run(&["add-rubric", "World", "--parent", "1"]).await?;

    {
        let pool = establish_pool(&site.database()).await?;
        let mut conn = pool.get().await?;
        let admin = db::get_account_by_username(&mut conn, "admin")
            .await?
            .expect("admin created");
        assert!(admin.is_activated && admin.is_staff && admin.is_superuser);
        let subs = db::list_sub_rubrics(&mut conn, None).await?;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs.first().map(ToString::to_string).as_deref(), Some("News - World"));
    }

    let err = site
        .run(&["remove-rubric", "1"])
        .await
        .expect_err("news still has a sub rubric");
    assert!(format!("{err:#}").contains("sub rubric"), "{err:#}");
    site.run(&["remove-rubric", "2"]).await?;
    site.run(&["remove-rubric", "1"]).await?;

    site.run(&["delete-user", "admin"]).await?;
    let err = site
        .run(&["delete-user", "admin"])
        .await
        .expect_err("already deleted");
    assert!(format!("{err:#}").contains("admin"), "{err:#}");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn pending_accounts_can_be_listed_and_reminded(site: Site) -> Result<(), AnyError> {
    site.run(&["list-pending"]).await?;
    site.run(&["list-pending", "--older-than-days", "3"]).await?;
    // Unknown ids are skipped rather than reported.
    site.run(&["resend-activation", "41", "42"]).await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn commands_needing_a_secret_refuse_without_one(site: Site) -> Result<(), AnyError> {
    let database = site.database();
    let media = site.dir.path().join("media").display().to_string();
    let cli = Cli::try_parse_from([
        "gazette",
        "--database",
        &database,
        "--media-dir",
        &media,
        "create-user",
        "admin",
        "--password",
        "s3cret-pass",
    ])?;
    let err = run_with_cli(cli).await.expect_err("secret is required");
    assert!(format!("{err:#}").contains("secret_key"), "{err:#}");
    Ok(())
}
