//! Metaplate CLI
//!
//! Renders metadata templates against files:
//!   metaplate -p "{filepath.name}" -p "{size}" song.mp3 notes.pdf
//!
//! Output is one line per file by default; `--csv` and `--json` switch to
//! record-oriented output keyed by template labels.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use metaplate::{
    parse, render_with_options, FileHandle, ProviderRegistry, RenderOptions, Template,
};

mod report;

#[derive(Parser)]
#[command(name = "metaplate")]
#[command(about = "Print file metadata rendered through MTL templates")]
struct Cli {
    /// Files to render templates against
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Template to render; repeatable. An optional `LABEL:` or `LABEL=`
    /// prefix names the CSV column / JSON key.
    #[arg(short = 'p', long = "print", required = true)]
    templates: Vec<String>,

    /// Emit CSV records instead of plain lines
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Emit JSON records instead of plain lines
    #[arg(long)]
    json: bool,

    /// With --json, emit one array instead of an object per line
    #[arg(long, requires = "json")]
    array: bool,

    /// Omit the filename column/key/prefix
    #[arg(long)]
    no_filename: bool,

    /// Use the full path instead of the file name
    #[arg(long)]
    path: bool,

    /// Separate printed values with NUL instead of space
    #[arg(long, conflicts_with_all = ["csv", "json"])]
    null_separator: bool,

    /// With --csv, skip the header row
    #[arg(long, requires = "csv")]
    no_header: bool,

    /// CSV delimiter; `tab` or `\t` for tab-separated output
    #[arg(long, requires = "csv")]
    delimiter: Option<String>,

    /// Text substituted for fields with no value (default: empty)
    #[arg(long)]
    undefined: Option<String>,
}

struct Column {
    label: String,
    template: Template,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut columns = Vec::new();
    for source in &cli.templates {
        let body = report::split_label(source).map_or(source.as_str(), |(_, body)| body);
        let template = match parse(body) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{}", e.format(body, "template"));
                return ExitCode::from(2);
            }
        };
        columns.push(Column {
            label: report::field_label(source, &template),
            template,
        });
    }

    // render misses with a sentinel so defaults stay expressible while
    // missing values become the --undefined text
    let sentinel = format!("__metaplate_none_{}__", std::process::id());
    let options = RenderOptions::default().with_none_str(sentinel.clone());
    let undefined = cli.undefined.clone().unwrap_or_default();
    let registry = ProviderRegistry::with_builtins();

    let mut failed = false;
    let mut json_records = Vec::new();

    if cli.csv && !cli.no_header {
        let mut labels: Vec<String> = columns.iter().map(|c| c.label.clone()).collect();
        if !cli.no_filename {
            labels.insert(0, "filename".to_string());
        }
        println!("{}", report::csv_row(&labels, csv_delimiter(&cli)));
    }

    for path in &cli.files {
        let file = FileHandle::new(path);
        let display_name = if cli.path {
            path.display().to_string()
        } else {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        };

        let mut rendered: Vec<(String, Vec<String>)> = Vec::new();
        let mut file_failed = false;
        for column in &columns {
            match render_with_options(&column.template, &file, &registry, &options) {
                Ok(values) => {
                    let values = values
                        .into_iter()
                        .map(|v| v.replace(&sentinel, &undefined))
                        .collect();
                    rendered.push((column.label.clone(), values));
                }
                Err(e) => {
                    eprintln!("error: {}: {e}", path.display());
                    file_failed = true;
                    break;
                }
            }
        }
        if file_failed {
            failed = true;
            continue;
        }

        if cli.csv {
            let mut row: Vec<String> = rendered
                .iter()
                .map(|(_, values)| values.join(" "))
                .collect();
            if !cli.no_filename {
                row.insert(0, display_name.clone());
            }
            println!("{}", report::csv_row(&row, csv_delimiter(&cli)));
        } else if cli.json {
            let mut record_columns = rendered;
            if !cli.no_filename {
                record_columns.push(("filename".to_string(), vec![display_name.clone()]));
            }
            let record = report::json_record(record_columns);
            if cli.array {
                json_records.push(record);
            } else {
                println!("{}", pretty(&record));
            }
        } else {
            let values: Vec<String> = rendered
                .into_iter()
                .flat_map(|(_, values)| values)
                .collect();
            let separator = if cli.null_separator { "\0" } else { " " };
            let header = if cli.no_filename {
                String::new()
            } else {
                format!("{display_name}: ")
            };
            println!("{header}{}", values.join(separator));
        }
    }

    if cli.json && cli.array {
        println!("{}", pretty(&serde_json::Value::Array(json_records)));
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn csv_delimiter(cli: &Cli) -> char {
    match cli.delimiter.as_deref() {
        Some("tab") | Some("TAB") | Some("\\t") | Some("\t") => '\t',
        Some(s) => s.chars().next().unwrap_or(','),
        None => ',',
    }
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
