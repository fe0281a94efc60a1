use gbm_risk::errors::{EngineError, EngineResult};
use gbm_risk::models::black_scholes::BlackScholes;
use gbm_risk::{
    AppConfig, CancelToken, Engine, OptionPricingRequest, SeededBoxMuller, SimulationRequest,
};
use tokio::io::AsyncReadExt;

/// One request per invocation, selected by `kind`.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum EngineRequest {
    Simulation(SimulationRequest),
    #[serde(rename = "option")]
    OptionPricing(OptionPricingRequest),
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    request_id: String,
    computed_at: String,
    seed: u64,
    result: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    black_scholes_price: Option<f64>,
}

#[tokio::main]
async fn main() {
    // Structured logging on stderr; stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let engine = match Engine::new(cfg.engine) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("engine config error: {e}");
            std::process::exit(1);
        }
    };

    let request = match read_request(std::env::args().nth(1)).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("request error: {e}");
            print_error(&e);
            std::process::exit(2);
        }
    };

    let seed = cfg.seed.unwrap_or_else(rand::random);
    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(request_id = %request_id, seed, "request accepted");

    // CPU-bound work runs on a blocking worker; the timeout only flips the
    // cancel flag, the worker stops at the next path boundary.
    let cancel = CancelToken::new();
    let worker_cancel = cancel.clone();
    let mut handle =
        tokio::task::spawn_blocking(move || execute(&engine, &request, seed, &worker_cancel));

    let joined = match tokio::time::timeout(cfg.request_timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(
                request_id = %request_id,
                timeout_secs = cfg.request_timeout.as_secs(),
                "request timed out, cancelling"
            );
            cancel.cancel();
            handle.await
        }
    };

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("worker task failed: {e}");
            std::process::exit(1);
        }
    };

    match outcome {
        Ok((result, black_scholes_price)) => {
            let envelope = Envelope {
                request_id,
                computed_at: chrono::Utc::now().to_rfc3339(),
                seed,
                result,
                black_scholes_price,
            };
            match serde_json::to_string_pretty(&envelope) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    tracing::error!("serialize error: {e}");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "request failed");
            print_error(&e);
            std::process::exit(1);
        }
    }
}

async fn read_request(path: Option<String>) -> EngineResult<EngineRequest> {
    let raw = match path {
        Some(p) => tokio::fs::read_to_string(&p).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    Ok(serde_json::from_str(&raw)?)
}

fn execute(
    engine: &Engine,
    request: &EngineRequest,
    seed: u64,
    cancel: &CancelToken,
) -> EngineResult<(serde_json::Value, Option<f64>)> {
    let sources = SeededBoxMuller::new(seed);
    match request {
        EngineRequest::Simulation(req) => {
            let result = engine.simulate(req, &sources, cancel)?;
            Ok((serde_json::to_value(result)?, None))
        }
        EngineRequest::OptionPricing(req) => {
            let result = engine.price_option(req, &sources, cancel)?;
            let reference = BlackScholes::new().price(
                req.option_type,
                req.spot_price,
                req.strike_price,
                req.risk_free_rate,
                req.volatility,
                req.time_to_expiry_years,
            );
            Ok((serde_json::to_value(result)?, Some(reference)))
        }
    }
}

fn print_error(e: &EngineError) {
    println!("{}", serde_json::json!({ "error": e.to_string() }));
}
