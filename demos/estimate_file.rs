//! Example: Estimate the key of a single tensor file
//!
//! Usage:
//!   cargo run --features ml --example estimate_file -- --model key.onnx [--input-name NAME] [--ascii] [--json] <tensor.bin>

use keyscribe::ml::OnnxKeyModel;
use keyscribe::{decode_and_estimate_with_config, AccidentalStyle, KeyEstimationConfig};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut model_path: Option<String> = None;
    let mut input_name = "input_1".to_string();
    let mut json = false;
    let mut config = KeyEstimationConfig::default();
    let mut tensor_path: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--model" => {
                model_path = Some(args.first().ok_or("--model requires a value")?.clone());
                args.remove(0);
            }
            "--input-name" => {
                input_name = args.first().ok_or("--input-name requires a value")?.clone();
                args.remove(0);
            }
            "--ascii" => config.accidental_style = AccidentalStyle::Ascii,
            "--json" => json = true,
            "--help" | "-h" => {
                eprintln!(
                    "Usage: estimate_file --model <key.onnx> [--input-name NAME] [--ascii] [--json] <tensor.bin>\n\
                     \n\
                     --model PATH       ONNX key model\n\
                     --input-name NAME  Graph input name (default: input_1)\n\
                     --ascii            Write sharps as '#'\n\
                     --json             Emit the ranked list as JSON\n"
                );
                return Ok(());
            }
            _ => tensor_path = Some(a),
        }
    }

    let model_path = model_path.ok_or("Provide --model <key.onnx>. Use --help for usage.")?;
    let tensor_path = tensor_path.ok_or("Provide a tensor file. Use --help for usage.")?;

    let mut model = OnnxKeyModel::load(&model_path, &input_name)?;
    log::info!("Loaded {} (input '{}')", model_path, model.input_name());
    let bytes = std::fs::read(&tensor_path)?;

    let ranked = decode_and_estimate_with_config(&bytes, &mut model, &config)?;

    if json {
        println!("{}", serde_json::to_string(&ranked)?);
    } else {
        println!("Key estimate for {}:", tensor_path);
        for (rank, (key, probability)) in ranked.iter().take(5).enumerate() {
            println!("  {}. {:<10} {:.5}", rank + 1, key, probability);
        }
    }

    Ok(())
}
