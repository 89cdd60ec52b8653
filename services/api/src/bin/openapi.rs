//! services/api/src/bin/openapi.rs
//!
//! Writes the navigator's OpenAPI document (auth, folders, profile, history
//! and search endpoints) as pretty JSON.
//!
//! Usage: `openapi [OUTPUT]`, where `OUTPUT` defaults to `openapi.json`.
//! Pass `-` to print to stdout instead.

use navigator_lib::web::rest::ApiDoc;
use std::io::Write;
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

enum Output {
    Stdout,
    File(PathBuf),
}

impl Output {
    fn from_arg(arg: Option<String>) -> Self {
        match arg.as_deref() {
            Some("-") => Output::Stdout,
            Some(path) => Output::File(PathBuf::from(path)),
            None => Output::File(PathBuf::from(DEFAULT_OUTPUT)),
        }
    }
}

fn write_document(output: &Output) -> Result<(), Box<dyn std::error::Error>> {
    let document = ApiDoc::openapi().to_pretty_json()?;
    match output {
        Output::Stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
        Output::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, document)?;
            eprintln!("OpenAPI document written to {}", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = Output::from_arg(std::env::args().nth(1));
    write_document(&output)
}
