use std::path::PathBuf;

use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use tracing::{error, info};

use fitting_room::catalog;
use fitting_room::config::CONFIG;
use fitting_room::driver::{print_catalog, run_analyze, run_generate, AnalyzeArgs, GenerateArgs};
use fitting_room::llm::GeminiBackend;
use fitting_room::models::{ClothingCategory, ItemId};
use fitting_room::utils::logging::init_logging;

#[derive(Debug, Clone, PartialEq)]
enum DriverCommand {
    Generate(GenerateArgs),
    Analyze(AnalyzeArgs),
    Catalog,
}

fn usage() -> &'static str {
    "Usage:\n  \
     fitting_room generate --photo <path> [--item <catalog-id>]... [--add <category>=<path>]... [--style <text>] [--out <dir>]\n  \
     fitting_room analyze --photo <path>\n  \
     fitting_room catalog\n\
     Categories: upper, lower, shoes, accessory, fullbody"
}

fn next_value<'a>(args: &'a [String], index: &mut usize, flag: &str) -> Result<&'a str> {
    *index += 1;
    args.get(*index)
        .map(|value| value.as_str())
        .ok_or_else(|| anyhow!("Missing value for {flag}"))
}

fn parse_upload(value: &str) -> Result<(ClothingCategory, PathBuf)> {
    let (category, path) = value
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid --add value '{value}', expected <category>=<path>"))?;
    let category = ClothingCategory::parse(category)
        .ok_or_else(|| anyhow!("Unknown category '{category}'\n{}", usage()))?;
    if path.trim().is_empty() {
        return Err(anyhow!("Missing image path in --add value '{value}'"));
    }
    Ok((category, PathBuf::from(path)))
}

fn parse_generate_args(args: &[String]) -> Result<GenerateArgs> {
    let mut photo: Option<PathBuf> = None;
    let mut item_ids = Vec::new();
    let mut uploads = Vec::new();
    let mut style = catalog::DEFAULT_STYLE_PROMPT.to_string();
    let mut output_dir = CONFIG.looks_output_dir.clone();

    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--photo" => {
                photo = Some(PathBuf::from(next_value(args, &mut index, "--photo")?));
            }
            "--item" => {
                let value = next_value(args, &mut index, "--item")?;
                let id = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("Invalid --item value: {value}"))?;
                item_ids.push(ItemId(id));
            }
            "--add" => {
                uploads.push(parse_upload(next_value(args, &mut index, "--add")?)?);
            }
            "--style" => {
                style = next_value(args, &mut index, "--style")?.to_string();
            }
            "--out" => {
                output_dir = PathBuf::from(next_value(args, &mut index, "--out")?);
            }
            "--help" | "-h" => return Err(anyhow!(usage())),
            other => {
                return Err(anyhow!("Unknown generate argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    let photo = photo.ok_or_else(|| anyhow!("--photo is required"))?;
    if item_ids.is_empty() && uploads.is_empty() {
        return Err(anyhow!("Select at least one item with --item or --add"));
    }

    Ok(GenerateArgs {
        photo,
        item_ids,
        uploads,
        style,
        output_dir,
    })
}

fn parse_analyze_args(args: &[String]) -> Result<AnalyzeArgs> {
    let mut photo: Option<PathBuf> = None;
    let mut index = 2;
    while index < args.len() {
        match args[index].as_str() {
            "--photo" => {
                photo = Some(PathBuf::from(next_value(args, &mut index, "--photo")?));
            }
            "--help" | "-h" => return Err(anyhow!(usage())),
            other => {
                return Err(anyhow!("Unknown analyze argument: {other}\n{}", usage()));
            }
        }
        index += 1;
    }

    Ok(AnalyzeArgs {
        photo: photo.ok_or_else(|| anyhow!("--photo is required"))?,
    })
}

fn parse_args(args: &[String]) -> Result<DriverCommand> {
    match args.get(1).map(|value| value.as_str()) {
        Some("generate") => parse_generate_args(args).map(DriverCommand::Generate),
        Some("analyze") => parse_analyze_args(args).map(DriverCommand::Analyze),
        Some("catalog") => Ok(DriverCommand::Catalog),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
        None => Err(anyhow!(usage())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;
    if command == DriverCommand::Catalog {
        print_catalog();
        return Ok(());
    }

    let backend = GeminiBackend::from_config()?;
    info!(
        text_model = %CONFIG.gemini_text_model,
        image_model = %CONFIG.gemini_image_model,
        "Starting fitting room"
    );

    let result = match command {
        DriverCommand::Generate(generate_args) => {
            run_generate(&backend, generate_args).await.map(|_| ())
        }
        DriverCommand::Analyze(analyze_args) => run_analyze(&backend, analyze_args).await,
        DriverCommand::Catalog => Ok(()),
    };

    if let Err(err) = &result {
        error!("Fitting room command failed: {err:#}");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(values: &[&str]) -> Vec<String> {
        std::iter::once("fitting_room")
            .chain(values.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_generate_arguments() {
        let command = parse_args(&argv(&[
            "generate",
            "--photo",
            "me.jpg",
            "--item",
            "101",
            "--add",
            "shoes=boots.png",
            "--style",
            "Rainy day in London",
            "--out",
            "out",
        ]))
        .unwrap();

        match command {
            DriverCommand::Generate(args) => {
                assert_eq!(args.photo, PathBuf::from("me.jpg"));
                assert_eq!(args.item_ids, vec![ItemId(101)]);
                assert_eq!(
                    args.uploads,
                    vec![(ClothingCategory::Shoes, PathBuf::from("boots.png"))]
                );
                assert_eq!(args.style, "Rainy day in London");
                assert_eq!(args.output_dir, PathBuf::from("out"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_incomplete_generate_arguments() {
        assert!(parse_args(&argv(&["generate", "--item", "1"])).is_err());
        assert!(parse_args(&argv(&["generate", "--photo", "me.jpg"])).is_err());
        assert!(parse_args(&argv(&["generate", "--photo", "me.jpg", "--add", "hat=hat.png"])).is_err());
        assert!(parse_args(&argv(&["generate", "--photo"])).is_err());
    }

    #[test]
    fn parses_analyze_and_catalog() {
        assert_eq!(
            parse_args(&argv(&["analyze", "--photo", "me.jpg"])).unwrap(),
            DriverCommand::Analyze(AnalyzeArgs {
                photo: PathBuf::from("me.jpg")
            })
        );
        assert_eq!(parse_args(&argv(&["catalog"])).unwrap(), DriverCommand::Catalog);
        assert!(parse_args(&argv(&["shop"])).is_err());
    }
}
