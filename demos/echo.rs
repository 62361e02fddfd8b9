//! Echo server: answers every request with its own body.
//!
//! ```text
//! cargo run --example echo -- [settings.toml]
//! curl -d 'hello' http://127.0.0.1:8080/
//! ```

use std::path::Path;

use bytes::Bytes;
use http::{Request, Response};
use http_front::config::{load_settings, ServiceSettings};
use http_front::observability::logging::init_logging;
use http_front::{RouterError, ServiceBuilder};

async fn echo(request: Request<Bytes>) -> Result<Response<Bytes>, RouterError> {
    Ok(Response::new(request.into_body()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = match std::env::args().nth(1) {
        Some(path) => load_settings(Path::new(&path))?,
        None => ServiceSettings {
            host: Some("127.0.0.1".into()),
            port: 8080,
            ..ServiceSettings::default()
        },
    };
    let _ = init_logging(&settings.logging.filter);

    let service = ServiceBuilder::from_settings(&settings).router(echo).build()?;

    let stopper = service.clone();
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!(error = %e, "Cannot watch for Ctrl-C");
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            tracing::info!("Ctrl-C received");
            stopper.stop();
        }
    });

    service.start()?;
    Ok(())
}
