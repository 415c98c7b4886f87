use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use json_edit::{flatten, DataQuery, Editor, MemoryRenderer, Options};
use serde_json::{Deserializer, Value};
use std::fs::File;
use std::io::{stdin, BufReader, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// The normalized field definitions, with order lists
    Normalized,
    /// A JSON Type Definition for the data the form produces
    Jtd,
    /// The data as a map of dotted paths to values
    Flat,
    /// The data read back from the rendered form
    Data,
}

/// Builds a form over JSON data and prints what the editor makes of it
#[derive(Debug, Parser)]
#[command(name = "json-edit", version)]
struct Args {
    /// Where to read the data from. Dash (hyphen) indicates stdin
    #[arg(default_value = "-")]
    input: String,

    /// A schema overriding parts of what is inferred from the data
    #[arg(long)]
    schema: Option<String>,

    /// Editor options as JSON
    #[arg(long)]
    options: Option<String>,

    #[arg(long, value_enum, default_value = "normalized")]
    format: Format,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader = BufReader::new(match args.input.as_str() {
        "-" => Box::new(stdin()) as Box<dyn Read>,
        file => Box::new(File::open(file).with_context(|| format!("failed to open {}", file))?)
            as Box<dyn Read>,
    });

    // Only the first document of the input is edited.
    let data = Deserializer::from_reader(reader)
        .into_iter::<Value>()
        .next()
        .transpose()
        .context("failed to parse input")?
        .unwrap_or(Value::Null);

    let overrides = match &args.schema {
        Some(file) => read_json(file)?,
        None => Value::Object(Default::default()),
    };

    let options: Options = match &args.options {
        Some(file) => serde_json::from_value(read_json(file)?)
            .with_context(|| format!("invalid options in {}", file))?,
        None => Options::default(),
    };

    let options = Options {
        auto_init: true,
        ..options
    };

    let editor = Editor::new(data, overrides, options, MemoryRenderer::new());
    debug!(fields = editor.renderer().len(), "rendered form");

    let out = match args.format {
        Format::Normalized => editor.schema().to_json(),
        Format::Jtd => serde_json::to_value(editor.schema().to_jtd().into_serde_schema())?,
        Format::Flat => Value::Object(flatten(editor.data())),
        Format::Data => editor.get_data(&DataQuery::default()),
    };

    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn read_json(file: &str) -> Result<Value> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("failed to open {}", file))?);
    serde_json::from_reader(reader).with_context(|| format!("failed to parse {}", file))
}

// RUST_LOG wins when it parses; otherwise only the library's warnings show.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("json_edit=warn"))
}
