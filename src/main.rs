//! Face Detection Service - static files and on-demand face detection over HTTP.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use face_detection_service::{
    config::{CheckConfig, Cli, Command, ServeConfig},
    detect::{DetectionService, DetectorLoader, FrameSource, ModelFileLoader, StillImageSource},
    server::{create_router, RouterConfig},
    static_files::WebRoot,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Check(config) => run_check(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let web_root = match WebRoot::new(&config.web_root) {
        Ok(root) => root,
        Err(e) => {
            error!(
                "Web root {} is not usable: {}",
                config.web_root.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let Some(annotated_path) = web_root.child(&config.annotated_image) else {
        error!("Invalid annotated image name: {}", config.annotated_image);
        return ExitCode::FAILURE;
    };

    print_banner();

    info!("Configuration:");
    info!("  Web root: {}", web_root.path().display());
    info!("  Chunk size: {} bytes", config.chunk_size);
    info!("  Model: {}", config.model.display());
    info!(
        "  Device: {} ({})",
        config.device,
        StillImageSource::new(&config.capture_dir, config.device)
            .frame_path()
            .display()
    );
    info!("  Annotated image: {}", annotated_path.display());
    info!("  Detection timeout: {}s", config.detection_timeout);
    if config.fail_fast {
        info!("  Device access: fail fast when busy");
    }

    let frames = StillImageSource::new(&config.capture_dir, config.device);
    let loader = ModelFileLoader::new(&config.model);
    let detection = DetectionService::new(Arc::new(frames), Arc::new(loader), annotated_path)
        .with_timeout(config.detection_timeout())
        .with_jpeg_quality(config.jpeg_quality)
        .with_fail_fast(config.fail_fast);

    // Build router configuration
    let router_config = build_router_config(&config);

    // Create router
    let router = create_router(web_root, detection, router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl http://{}/getResult?type=json", addr);
    info!("    curl http://{}/getResult?type=image", addr);
    info!("");
    info!("  Browse the web root:");
    info!("    open http://{}/", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("███████╗ █████╗  ██████╗███████╗");
    info!("██╔════╝██╔══██╗██╔════╝██╔════╝");
    info!("█████╗  ███████║██║     █████╗  ");
    info!("██╔══╝  ██╔══██║██║     ██╔══╝  ");
    info!("██║     ██║  ██║╚██████╗███████╗");
    info!("╚═╝     ╚═╝  ╚═╝ ╚═════╝╚══════╝");
    info!("");
    info!("  Face Detection Service v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "face_detection_service=debug,tower_http=debug"
    } else {
        "face_detection_service=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    RouterConfig::new()
        .with_chunk_size(config.chunk_size)
        .with_tracing(!config.no_tracing)
}

// =============================================================================
// Check Command
// =============================================================================

fn run_check(config: CheckConfig) -> ExitCode {
    let serve = &config.serve;

    // Initialize minimal logging for check command
    if serve.verbose {
        init_logging(true);
    }

    println!("Face Detection Service Configuration Check");
    println!("══════════════════════════════════════════");
    println!();

    if let Err(e) = serve.validate() {
        println!("✗ Configuration: {}", e);
        return ExitCode::FAILURE;
    }
    println!("✓ Configuration");

    let web_root = match WebRoot::new(&serve.web_root) {
        Ok(root) => {
            println!("✓ Web root: {}", root.path().display());
            root
        }
        Err(e) => {
            println!("✗ Web root: {}: {}", serve.web_root.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = web_root.child(&serve.annotated_image) {
        println!("✓ Annotated image: {}", path.display());
    }

    let loader = ModelFileLoader::new(&serve.model);
    let detector = match loader.load() {
        Ok(detector) => {
            println!("✓ Model: {}", serve.model.display());
            detector
        }
        Err(e) => {
            println!("✗ Model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let frames = StillImageSource::new(&serve.capture_dir, serve.device);
    let frame_path = frames.frame_path();
    if frame_path.is_file() {
        println!("✓ Device {}: {}", serve.device, frame_path.display());
    } else {
        println!("✗ Device {}: {} not found", serve.device, frame_path.display());
        println!();
        println!("Please check:");
        println!("  - The capture directory is correct (--capture-dir)");
        println!("  - Frames are being written for device {}", serve.device);
        return ExitCode::FAILURE;
    }

    // Capture and detect if requested
    if config.capture {
        println!();
        print!("Capturing a frame... ");

        match frames.capture() {
            Ok(frame) => {
                let faces = detector.detect(&frame);
                println!("✓ {}x{}", frame.width(), frame.height());
                println!("  Faces detected: {}", faces.len());
                for rect in &faces.faces {
                    println!(
                        "    x={} y={} width={} height={}",
                        rect.x, rect.y, rect.width, rect.height
                    );
                }
            }
            Err(e) => {
                println!("✗ failed");
                println!();
                println!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    println!();
    println!("══════════════════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
