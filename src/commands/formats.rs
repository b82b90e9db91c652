//! Supported format listing.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use meshforge_service::{FormatInfo, SupportedFormats};

use crate::output::{self, OutputFormat};

/// Format display row
#[derive(Debug, Serialize, Tabled)]
struct FormatRow {
    /// Canonical id
    id: String,
    /// Input or output
    direction: &'static str,
    /// File extension
    extension: String,
    /// MIME type
    mime_type: String,
    /// Needs the geometry kernel
    kernel: String,
    /// Description
    description: String,
}

impl FormatRow {
    fn new(info: &FormatInfo, direction: &'static str) -> Self {
        Self {
            id: info.id.clone(),
            direction,
            extension: format!(".{}", info.extension),
            mime_type: info.mime_type.clone(),
            kernel: if info.requires_kernel { "yes" } else { "no" }.to_string(),
            description: info.description.clone(),
        }
    }
}

/// Execute the formats command
pub fn execute(format: OutputFormat) -> Result<()> {
    let formats = SupportedFormats::current();
    match format {
        OutputFormat::Json => output::print_item(&formats, format),
        OutputFormat::Table => {
            let rows: Vec<FormatRow> = formats
                .inputs
                .iter()
                .map(|f| FormatRow::new(f, "input"))
                .chain(formats.outputs.iter().map(|f| FormatRow::new(f, "output")))
                .collect();
            output::print_list(&rows, format);
        }
    }
    Ok(())
}
