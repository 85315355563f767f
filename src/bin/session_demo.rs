//! Walks one session through its life on a hand-driven clock:
//! login, pass-through, rotation, logout, refused refresh.
//!
//! $ cargo run --bin session_demo -- --settings=settings/dev.toml

use chrono::{DateTime, Duration, Utc};
use countersign::application_impl::*;
use countersign::application_port::*;
use countersign::domain_model::*;
use countersign::domain_port::*;
use countersign::logger::*;
use countersign::settings::*;
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload_from_config(&LogConfig {
        filter: project_settings.log.filter.clone(),
        debug_sessions: true,
    })?;

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let gate = Arc::new(MemoryRevocationGate::new(clock.clone()));
    let config = SessionConfig::from_settings(&project_settings.auth)?;
    let auth_ttl = Duration::from_std(config.auth_token_ttl)?;
    let sessions = SessionManager::new(
        config,
        Arc::new(JwtCodec::new(KeyMaterial::from_settings(&project_settings.auth)?)),
        Arc::new(OsRngSecretGenerator::default()),
        gate.clone(),
        clock.clone(),
    )?;

    let mut custom_claims = CustomClaims::new();
    custom_claims.insert("role".to_string(), json!("user"));
    let login = sessions
        .issue(NewSession {
            subject: "testUser".to_string(),
            custom_claims,
        })
        .await?;
    describe("login", &login);

    let SessionTokens {
        auth_token,
        refresh_token,
        csrf_secret,
        ..
    } = login.tokens.clone();

    clock.advance(Duration::minutes(1));
    let outcome = sessions
        .refresh(&auth_token, &refresh_token, csrf_secret.as_str())
        .await?;
    describe(&format!("{:?}", outcome.transition), &outcome.session);
    println!(
        "    auth token unchanged: {}",
        outcome.session.tokens.auth_token == auth_token
    );

    let forged = sessions
        .refresh(&auth_token, &refresh_token, "not-the-secret")
        .await;
    println!("forged secret -> {}", verdict(forged));

    clock.advance(auth_ttl + Duration::seconds(1));
    let rotated = sessions
        .refresh(&auth_token, &refresh_token, csrf_secret.as_str())
        .await?;
    describe(&format!("{:?}", rotated.transition), &rotated.session);
    println!(
        "    secret rotated: {}",
        rotated.session.tokens.csrf_secret != csrf_secret
    );

    let termination = sessions
        .terminate(Some(&rotated.session.tokens.refresh_token))
        .await;
    println!(
        "logout -> revocation attempted: {}, revoked ids: {}",
        termination.revocation_attempted,
        gate.len()
    );

    clock.advance(auth_ttl + Duration::seconds(1));
    let after_logout = sessions
        .refresh(
            &rotated.session.tokens.auth_token,
            &rotated.session.tokens.refresh_token,
            rotated.session.tokens.csrf_secret.as_str(),
        )
        .await;
    println!("refresh after logout -> {}", verdict(after_logout));

    Ok(())
}

fn describe(step: &str, session: &Session) {
    println!(
        "{} -> session {} secret {}",
        step, session.claims.id, session.tokens.csrf_secret.0
    );
    println!(
        "    auth expires {}, refresh expires {}",
        timestamp(session.tokens.auth_token_expires_at),
        timestamp(session.tokens.refresh_token_expires_at)
    );
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

fn verdict(result: Result<RefreshOutcome, SessionError>) -> String {
    match result {
        Ok(outcome) => format!("{:?}", outcome.transition),
        Err(e) => e.to_string(),
    }
}
