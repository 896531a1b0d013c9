//! Composition root: wires the ffmpeg adapters, the in-memory video store
//! and the event hub into the HTTP/WebSocket server.

use caruso::adapters::ffmpeg::Ffmpeg;
use caruso::adapters::http::{self, AppState};
use caruso::adapters::memory::InMemoryVideoRepository;
use caruso::application::library::VideoLibrary;
use caruso::application::orchestrator::TranscodeService;
use caruso::config::Config;
use caruso::EventHub;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::fmt::init();

    let upload_dir = PathBuf::from(&config.upload_dir);
    if let Err(err) = tokio::fs::create_dir_all(&upload_dir).await {
        eprintln!("Failed to create upload dir {}: {err}", upload_dir.display());
        std::process::exit(1);
    }

    // Adapters
    let repo = InMemoryVideoRepository::new();
    let hub = Arc::new(EventHub::new());

    // Application services
    let transcoder = Arc::new(TranscodeService::new(
        Ffmpeg::new(),
        Ffmpeg::new(),
        Ffmpeg::new(),
        repo.clone(),
        hub.clone(),
    ));
    let library = Arc::new(VideoLibrary::new(repo, &config.public_prefix));

    let app = http::router(AppState {
        transcoder,
        library,
        hub,
        upload_dir,
    });

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port))
        .await
        .expect("Failed to bind TCP listener");
    println!("Listening at {}:{}", config.addr, config.port);
    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
