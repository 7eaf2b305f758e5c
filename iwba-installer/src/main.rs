use futures_util::StreamExt;
use std::sync::Arc;

mod deploy;
mod email;
mod services;
mod settings;

use email::EmailService;
use iwba_common::CHANNEL_INSTALLER_EVENTS;
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let settings = Arc::new(Settings::from_env()?);
    let email = Arc::new(EmailService::new(settings.smtp.clone()));

    let redis_client = redis::Client::open(settings.redis_url.clone())?;
    let mut pubsub = redis_client.get_async_pubsub().await?;
    pubsub.subscribe(CHANNEL_INSTALLER_EVENTS).await?;
    tracing::info!(
        "installer listening on Redis channel '{}'",
        CHANNEL_INSTALLER_EVENTS
    );

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("⚠️  undecodable delivery: {:?}", e);
                continue;
            }
        };
        println!("📩 Received Event: {}", payload);

        let settings = settings.clone();
        let email = email.clone();
        tokio::spawn(async move {
            if let Err(e) = services::process_install(
                &payload,
                &settings.control_host,
                &settings.playbook,
                &email,
            )
            .await
            {
                eprintln!("❌ install handling failed: {:?}", e);
            }
        });
    }

    Ok(())
}
