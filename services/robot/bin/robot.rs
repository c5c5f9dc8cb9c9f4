//! Main Entrypoint for the Riddler Robot
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment and the command line.
//! 2. Connecting to the robot's WAMP router.
//! 3. Preparing the robot (posture, greeting, language, speech recognition).
//! 4. Building the gesture coordinator and language-model oracle.
//! 5. Running the game until the user is done, then leaving the session.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use clap::Parser;
use riddler_core::{
    BoundedOracle, GameOracle, GestureCoordinator, GestureLibrary, OpenAIOracle, SpeechBackend,
    SpeechEstimator,
};
use riddler_robot::{
    config::Config,
    game::Game,
    robot::{RobotMotion, RobotSpeech, play_behavior, set_language},
    stt::WordBuffer,
    wamp::WampSession,
};
use secrecy::ExposeSecret;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "Plays a word-guessing game on a social robot")]
struct Args {
    /// Gesture library JSON file (overrides GESTURES_PATH).
    #[arg(long)]
    gestures: Option<PathBuf>,

    /// WAMP realm of the robot (overrides WAMP_REALM).
    #[arg(long)]
    realm: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let args = Args::parse();
    if let Some(realm) = &args.realm {
        // SAFETY: no other thread exists before the runtime is built.
        unsafe { std::env::set_var("WAMP_REALM", realm) };
    }
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(path) = args.gestures {
        config.gestures_path = path;
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?
        .block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded.");

    let library = Arc::new(GestureLibrary::load_or_empty(&config.gestures_path));
    let mut names: Vec<_> = library.names().collect();
    names.sort_unstable();
    info!(count = library.len(), gestures = ?names, path = %config.gestures_path.display(), "Gesture library ready");

    // --- 2. Connect ---
    let session = WampSession::connect(&config.wamp_url, &config.wamp_realm)
        .await
        .context("Failed to join the robot's WAMP realm")?;
    info!(session = session.session_id(), realm = %config.wamp_realm, "Connected to robot");

    // --- 3. Prepare the Robot ---
    let speech = Arc::new(RobotSpeech::new(session.clone()));
    let motion = Arc::new(RobotMotion::new(session.clone()));

    if let Err(e) = play_behavior(&session, "BlocklyCrouch").await {
        warn!(error = ?e, "Could not crouch; continuing");
    }
    if let Err(e) = speech.speak("Initializing the game...").await?.wait().await {
        warn!(error = ?e, "Greeting failed; continuing");
    }
    set_language(&session, "en").await?;

    let words = WordBuffer::new();
    let events = session
        .subscribe(&config.stt_topic, 64)
        .await
        .context("Failed to subscribe to speech recognition")?;
    let _listener = words.listen(events);

    // --- 4. Initialize Shared Services ---
    info!(provider = ?config.provider, model = %config.chat_model, "Using language model");
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.api_key.expose_secret())
        .with_api_base(config.provider.api_base());
    let oracle: Arc<dyn GameOracle> =
        Arc::new(OpenAIOracle::new(openai_config, config.chat_model.clone()));
    let oracle = BoundedOracle::new(oracle, config.llm_timeout);

    let coordinator = GestureCoordinator::new(speech, motion, library)
        .with_estimator(SpeechEstimator::new(config.seconds_per_word));

    // --- 5. Play ---
    Game::new(Arc::new(coordinator), oracle, Arc::new(words))
        .play()
        .await;

    session.leave().await.context("Failed to leave the WAMP session")?;
    info!("Session closed.");
    Ok(())
}
