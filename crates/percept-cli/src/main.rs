use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use percept_server::{PredictionService, cors_layer, router};
use percept_vision::ModelRegistry;

#[derive(Parser, Debug)]
#[command(name = "percept", version, about = "Image classification API server")]
struct Args {
    /// Host to bind.
    #[arg(long, env = "PERCEPT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind.
    #[arg(long, env = "PERCEPT_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding `<family>.onnx` and `<family>_classes.json` files.
    #[arg(long, env = "PERCEPT_MODELS_DIR", default_value = "models")]
    models_dir: PathBuf,

    /// Origin allowed by CORS (the frontend dev server by default).
    #[arg(long, env = "PERCEPT_ALLOW_ORIGIN", default_value = "http://localhost:5173")]
    allow_origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    tracing::info!("percept v{}", env!("CARGO_PKG_VERSION"));

    let registry = ModelRegistry::new(&args.models_dir);
    let service = Arc::new(PredictionService::new(registry));
    let app = router(service).layer(cors_layer(&args.allow_origin)?);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        models_dir = %args.models_dir.display(),
        "listening"
    );
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
