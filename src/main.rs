use chrono::Utc;
use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use geotrust::{
    capture::manual_sample,
    config::Config,
    engine::LocationEngine,
    logging,
    models::{LocationSample, SampleSource},
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

const USAGE: &str = "usage:
  geotrust [locate]
  geotrust reverse <lat> <lng> [region]
  geotrust jump <lat1> <lng1> <t1_ms> <lat2> <lng2> <t2_ms>
  geotrust search <query> [region]";

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::initialize_logging("logs");
    color_eyre::install()?;

    let config = Config::load("config.toml");
    let engine = LocationEngine::from_config(&config)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("locate");

    match command {
        "locate" => locate(&engine, &config).await,
        "reverse" => {
            let lat = parse_f64(&args, 1, "lat")?;
            let lng = parse_f64(&args, 2, "lng")?;
            let region = args.get(3).map(String::as_str);
            print_json(&engine.reconcile_address(lat, lng, region, None).await)
        }
        "jump" => {
            let prev = sample_from_args(&args, 1)?;
            let next = sample_from_args(&args, 4)?;
            print_json(&engine.detect_jump(&prev, &next, None))
        }
        "search" => {
            let query = args.get(1).ok_or_else(|| eyre!("missing query\n{}", USAGE))?;
            let region = args.get(2).map(String::as_str);
            match engine
                .resolve_manual_pick(query, region, Utc::now().timestamp_millis())
                .await
            {
                Some((sample, address)) => {
                    print_json(&json!({ "sample": sample, "address": address }))
                }
                None => bail!("No usable location found for '{}'", query),
            }
        }
        other => bail!("unknown command '{}'\n{}", other, USAGE),
    }
}

/// Captures a position, falls back to the configured manual point when the
/// capture asks for manual selection, then looks up the address.
async fn locate(engine: &LocationEngine, config: &Config) -> Result<()> {
    let capture = engine.capture_location(None).await;

    let sample = match capture.sample.filter(|_| capture.success) {
        Some(sample) => sample,
        None => {
            warn!(
                "Capture needs manual selection ({}); using configured point",
                capture.error.as_deref().unwrap_or("no fix")
            );
            manual_sample(
                config.location.manual_lat,
                config.location.manual_lon,
                Utc::now().timestamp_millis(),
            )
            .map_err(|v| eyre!("Configured manual location is invalid: {:?}", v.errors))?
        }
    };

    let hint = engine
        .registry()
        .containing(sample.latitude, sample.longitude)
        .map(|r| r.name.clone());
    info!(
        "Resolving address for ({}, {}) in region {:?}",
        sample.latitude, sample.longitude, hint
    );

    let address = engine
        .reconcile_address(sample.latitude, sample.longitude, hint.as_deref(), None)
        .await;

    print_json(&json!({
        "capture": capture,
        "sample": sample,
        "quality": engine.classify_quality(sample.accuracy),
        "address": address,
    }))
}

fn parse_f64(args: &[String], idx: usize, name: &str) -> Result<f64> {
    let raw = args
        .get(idx)
        .ok_or_else(|| eyre!("missing <{}>\n{}", name, USAGE))?;
    raw.parse()
        .wrap_err_with(|| format!("<{}> must be a number, got '{}'", name, raw))
}

fn sample_from_args(args: &[String], start: usize) -> Result<LocationSample> {
    let lat = parse_f64(args, start, "lat")?;
    let lng = parse_f64(args, start + 1, "lng")?;
    let raw_ts = args
        .get(start + 2)
        .ok_or_else(|| eyre!("missing <t_ms>\n{}", USAGE))?;
    let timestamp: i64 = raw_ts
        .parse()
        .wrap_err_with(|| format!("<t_ms> must be an integer, got '{}'", raw_ts))?;

    Ok(LocationSample::new(lat, lng, 0.0, timestamp, SampleSource::Manual))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
