use accounts::{config::AppConfig, state::AppState, telemetry, users::UserFields};
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let email = std::env::var("SUPERUSER_EMAIL").context("SUPERUSER_EMAIL must be set")?;
    let password =
        std::env::var("SUPERUSER_PASSWORD").context("SUPERUSER_PASSWORD must be set")?;

    let state = AppState::init(AppConfig::from_env()?).await?;
    let user = state
        .users
        .create_superuser(&email, &password, UserFields::default())
        .await
        .with_context(|| format!("create superuser {email}"))?;

    tracing::info!(user_id = ?user.id, "superuser {} ready", user);
    Ok(())
}
