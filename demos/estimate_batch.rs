//! Example: Estimate keys for many tensor files in parallel
//!
//! Usage:
//!   cargo run --release --features ml --example estimate_batch -- --model key.onnx [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Reading, decoding and normalization run in parallel across files.
//! - The model is shared behind a mutex that is held only for inference.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use keyscribe::features::key::{
    average_distributions, predict_distributions, prepare_frames, rank_keys,
};
use keyscribe::io::tensor_decoder::{decode_tensor, into_batch};
use keyscribe::ml::OnnxKeyModel;
use keyscribe::{KeyEstimationConfig, RankedKeyList};
use rayon::prelude::*;
use std::env;
use std::sync::Mutex;
use std::time::Instant;

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn estimate_file(
    path: &str,
    model: &Mutex<OnnxKeyModel>,
    config: &KeyEstimationConfig,
) -> Result<RankedKeyList, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("read failed: {e}"))?;
    let batch = decode_tensor(&bytes)
        .map(into_batch)
        .map_err(|e| format!("decode failed: {e}"))?;

    let frames = prepare_frames(&batch).map_err(|e| format!("invalid frames: {e}"))?;

    let distributions = {
        let mut model = model.lock().map_err(|_| "model lock poisoned".to_string())?;
        predict_distributions(frames.view(), &mut *model)
            .map_err(|e| format!("inference failed: {e}"))?
    };

    average_distributions(&distributions)
        .and_then(|averaged| rank_keys(&averaged.to_vec(), config))
        .map_err(|e| format!("ranking failed: {e}"))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut model_path: Option<String> = None;
    let mut input_name = "input_1".to_string();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--model" => {
                model_path = Some(args.first().ok_or("--model requires a value")?.clone());
                args.remove(0);
            }
            "--input-name" => {
                input_name = args.first().ok_or("--input-name requires a value")?.clone();
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: estimate_batch --model <key.onnx> [--input-name NAME] [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one tensor file path. Use --help for usage.");
        std::process::exit(2);
    }
    let model_path = model_path.ok_or("Provide --model <key.onnx>. Use --help for usage.")?;

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let model = OnnxKeyModel::load(&model_path, &input_name)?;
    eprintln!("Model: {} (input '{}')", model_path, model.input_name());
    let model = Mutex::new(model);
    let config = KeyEstimationConfig::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<(String, Result<RankedKeyList, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| (path.clone(), estimate_file(path, &model, &config)))
            .collect()
    });

    for (idx, (path, out)) in outs.iter().enumerate() {
        match (out, json) {
            (Ok(ranked), true) => println!(
                "{{\"file\":{},\"ranking\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(ranked)?
            ),
            (Err(e), true) => println!(
                "{{\"file\":{},\"error\":{}}}",
                serde_json::to_string(path)?,
                serde_json::to_string(e)?
            ),
            (Ok(ranked), false) => {
                let (key, probability) = ranked.top().unwrap_or(("?", 0.0));
                println!(
                    "[{}/{}] {}: Key={} (p={:.5})",
                    idx + 1,
                    outs.len(),
                    path,
                    key,
                    probability
                );
            }
            (Err(e), false) => {
                println!("[{}/{}] {}: ERROR: {}", idx + 1, outs.len(), path, e);
            }
        }
    }

    let ok = outs.iter().filter(|(_, o)| o.is_ok()).count();
    eprintln!(
        "Done: ok={}/{} wall={:.0}ms",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    Ok(())
}
