//! Prints the panel's OpenAPI document.
//!
//!   generate_openapi                      pretty JSON on stdout
//!   generate_openapi --output api.json    write to a file
//!   generate_openapi --compact            single-line JSON

use std::{fs, io::Write, path::PathBuf};

use anyhow::{bail, Context, Result};
use switchbot_panel::api::handlers::ApiDoc;
use utoipa::OpenApi;

#[derive(Debug, Default)]
struct Args {
    output: Option<PathBuf>,
    compact: bool,
}

impl Args {
    fn parse(mut raw: impl Iterator<Item = String>) -> Result<Self> {
        let mut args = Self::default();
        while let Some(arg) = raw.next() {
            match arg.as_str() {
                "--output" | "-o" => {
                    let path = raw.next().context("--output needs a path")?;
                    args.output = Some(PathBuf::from(path));
                }
                "--compact" => args.compact = true,
                other => bail!("unknown argument: {other}"),
            }
        }
        Ok(args)
    }
}

fn render(compact: bool) -> Result<String> {
    let doc = ApiDoc::openapi();
    let json = if compact {
        doc.to_json()
    } else {
        doc.to_pretty_json()
    };
    json.context("Failed to serialise the OpenAPI document")
}

fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;
    let json = render(args.compact)?;

    match args.output {
        Some(path) => {
            fs::write(&path, json.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
        None => std::io::stdout()
            .lock()
            .write_all(json.as_bytes())
            .context("Failed to write to stdout")?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_means_pretty_stdout() {
        let args = parse(&[]).unwrap();
        assert!(args.output.is_none());
        assert!(!args.compact);
    }

    #[test]
    fn output_and_compact_flags_are_read() {
        let args = parse(&["--compact", "-o", "api.json"]).unwrap();
        assert_eq!(args.output, Some(PathBuf::from("api.json")));
        assert!(args.compact);
    }

    #[test]
    fn output_without_path_is_rejected() {
        assert!(parse(&["--output"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }

    #[test]
    fn rendered_document_lists_panel_routes() {
        let json: serde_json::Value = serde_json::from_str(&render(true).unwrap()).unwrap();
        assert_eq!(json["info"]["title"], "SwitchBot Panel API");
        assert!(json["paths"]["/status/cached"].is_object());
        assert!(json["paths"]["/devices/{device_id}/commands"].is_object());
    }
}
