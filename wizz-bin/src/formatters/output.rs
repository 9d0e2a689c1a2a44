use std::io::Write;

use anyhow::Result;
use wizz_lib::{Content, FetchResult};

use crate::options::OutputFormat;

/// Placeholder for a URL without a result in plain output
const MISSING: &str = "-";

/// Write one line per result, in the order given
pub(crate) fn write_results(
    writer: &mut dyn Write,
    results: &[FetchResult],
    format: &OutputFormat,
) -> Result<()> {
    for result in results {
        writeln!(writer, "{}", format_result(result.as_ref(), format)?)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_result(result: Option<&Content>, format: &OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&result)?,
        OutputFormat::Plain => match result {
            None => MISSING.to_string(),
            Some(Content::Json(value)) => value.to_string(),
            Some(Content::Text(text)) => single_line(text),
        },
    })
}

/// Escape line breaks, so that every result takes up exactly one line
fn single_line(text: &str) -> String {
    text.trim_end_matches(['\r', '\n'])
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}
