//! Output rendering and formatting

use crate::error::CliError;
use crate::events::format_bytes;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use console::Style;
use lobup_errors::UserFacingError;
use lobup_package::ExtractedPackage;
use lobup_upload::UploadOutcome;
use serde_json::json;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    colors_enabled: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool, colors_enabled: bool) -> Self {
        Self {
            json_output,
            colors_enabled,
        }
    }

    /// Render the result of a successful upload
    pub fn render_outcome(&self, outcome: &UploadOutcome) -> io::Result<()> {
        if self.json_output {
            return print_json(&outcome_json(outcome));
        }

        println!(
            "{} {}",
            self.style(Style::new().green().bold(), "Uploaded"),
            outcome.file_name
        );
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![Cell::new("Application"), Cell::new(&outcome.app_id)]);
        table.add_row(vec![
            Cell::new("Content version"),
            Cell::new(&outcome.content_version_id),
        ]);
        table.add_row(vec![Cell::new("File"), Cell::new(&outcome.file_id)]);
        table.add_row(vec![
            Cell::new("Encrypted size"),
            Cell::new(format_bytes(outcome.encrypted_size)),
        ]);
        table.add_row(vec![Cell::new("Blocks"), Cell::new(outcome.chunks)]);
        table.add_row(vec![Cell::new("Renewals"), Cell::new(outcome.renewals)]);
        table.add_row(vec![
            Cell::new("Duration"),
            Cell::new(format!("{:.1}s", outcome.duration.as_secs_f64())),
        ]);

        println!("{table}");
        Ok(())
    }

    /// Render the manifest and payload location of a package archive
    ///
    /// Key material is never printed.
    pub fn render_package(&self, package: &ExtractedPackage) -> io::Result<()> {
        let manifest = &package.manifest;
        if self.json_output {
            return print_json(&json!({
                "file_name": manifest.file_name,
                "name": manifest.name,
                "setup_file": manifest.setup_file,
                "tool_version": manifest.tool_version,
                "unencrypted_size": manifest.unencrypted_size,
                "encrypted_size": package.encrypted_size,
                "content_match": package.content_match.to_string(),
                "digest_algorithm": manifest.file_digest_algorithm,
                "profile_identifier": manifest.profile_identifier,
                "msi_info": manifest.msi_info,
            }));
        }

        println!(
            "{}",
            self.style(Style::new().cyan().bold(), &manifest.file_name)
        );
        println!();

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        table.add_row(vec![Cell::new("Name"), Cell::new(optional(&manifest.name))]);
        table.add_row(vec![
            Cell::new("Setup file"),
            Cell::new(optional(&manifest.setup_file)),
        ]);
        table.add_row(vec![
            Cell::new("Tool version"),
            Cell::new(optional(&manifest.tool_version)),
        ]);
        table.add_row(vec![
            Cell::new("Unencrypted size"),
            Cell::new(format_bytes(manifest.unencrypted_size)),
        ]);
        table.add_row(vec![
            Cell::new("Encrypted size"),
            Cell::new(format_bytes(package.encrypted_size)),
        ]);
        table.add_row(vec![
            Cell::new("Payload"),
            Cell::new(package.content_match.to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Digest"),
            Cell::new(&manifest.file_digest_algorithm),
        ]);
        table.add_row(vec![
            Cell::new("Profile"),
            Cell::new(&manifest.profile_identifier),
        ]);
        if let Some(msi) = &manifest.msi_info {
            table.add_row(vec![
                Cell::new("MSI product code"),
                Cell::new(optional(&msi.product_code)),
            ]);
            table.add_row(vec![
                Cell::new("MSI product version"),
                Cell::new(optional(&msi.product_version)),
            ]);
        }

        println!("{table}");
        Ok(())
    }

    /// JSON document describing a failed command
    pub fn error_json(error: &CliError) -> String {
        let value = match error {
            CliError::Config(e) | CliError::Upload(e) => json!({
                "success": false,
                "stage": e.stage(),
                "code": e.user_code(),
                "message": e.user_message(),
                "hint": e.user_hint(),
                "retryable": e.is_retryable(),
            }),
            other => json!({
                "success": false,
                "message": other.to_string(),
            }),
        };
        value.to_string()
    }

    fn style(&self, style: Style, text: &str) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn outcome_json(outcome: &UploadOutcome) -> serde_json::Value {
    json!({
        "success": true,
        "app_id": outcome.app_id,
        "content_version_id": outcome.content_version_id,
        "file_id": outcome.file_id,
        "file_name": outcome.file_name,
        "encrypted_size": outcome.encrypted_size,
        "chunks": outcome.chunks,
        "renewals": outcome.renewals,
        "duration_ms": u64::try_from(outcome.duration.as_millis()).unwrap_or(u64::MAX),
    })
}

fn print_json(value: &serde_json::Value) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}
