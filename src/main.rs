use std::time::{SystemTime, UNIX_EPOCH};

use sentinel::http::response::ResponseBuilder;
use sentinel::{Config, Response, Router, Server, StatusCode};
use tracing_subscriber::EnvFilter;

fn register_routes(router: &Router) {
    router.get("/api/hello", |_| Ok(Response::ok("Hello, World!")));

    router.get("/api/greet", |req| {
        let name = req.query_param("name").unwrap_or("stranger");
        Ok(Response::ok(format!("Hello, {name}!")))
    });

    router.get("/api/time", |_| {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        Ok(Response::json(format!("{{\"unix\":{secs}}}")))
    });

    router.post("/api/echo", |req| {
        let content_type = req
            .header("content-type")
            .unwrap_or("application/octet-stream");
        Ok(ResponseBuilder::new(StatusCode::CREATED)
            .content_type(content_type)
            .body(req.body.clone())
            .build())
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let server = Server::new(&cfg)?;
    register_routes(&server.router());

    let handle = server.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            handle.stop();
        }
    });

    server.start().await
}
