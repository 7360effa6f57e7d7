use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use structwire_protocol::Snapshot;
use structwire_receiver::{Disposition, ReceiverStats};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
pub struct ChannelRow {
    pub name: String,
    pub kind: String,
    pub commandable: bool,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_name: Option<String>,
}

#[derive(Serialize)]
pub struct DecodeReport {
    pub messages: Vec<Snapshot>,
    /// Hex of the payload passed to the non-struct handler, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_struct: Option<String>,
    pub disposition: Disposition,
    pub stats: ReceiverStats,
}

pub fn print_channels(rows: &[ChannelRow], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "KIND", "COMMANDABLE", "ENUM"]);
            for row in rows {
                table.add_row(vec![
                    row.name.clone(),
                    row.kind.clone(),
                    row.commandable.to_string(),
                    row.enum_name.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                let access = if row.commandable { "rw" } else { "ro" };
                match &row.enum_name {
                    Some(name) => println!("{} {} {access} enum={name}", row.name, row.kind),
                    None => println!("{} {} {access}", row.name, row.kind),
                }
            }
        }
    }
}

pub fn print_decode(report: &DecodeReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = new_table(vec!["MESSAGE", "ID", "FIELD", "VALUE"]);
            for snapshot in &report.messages {
                for entry in &snapshot.values {
                    table.add_row(vec![
                        snapshot.name.clone(),
                        snapshot.id.to_string(),
                        entry.path.clone(),
                        entry.value.to_string(),
                    ]);
                }
            }
            println!("{table}");

            let mut summary = new_table(vec!["OBSERVATION", "COUNT"]);
            for (name, count) in observation_rows(&report.stats) {
                summary.add_row(vec![name.to_string(), count.to_string()]);
            }
            println!("{summary}");
        }
        OutputFormat::Pretty => {
            for snapshot in &report.messages {
                println!("{}({}) @ {}ns", snapshot.name, snapshot.id, snapshot.timestamp_ns);
                for entry in &snapshot.values {
                    println!("  {} = {}", entry.path, entry.value);
                }
            }
            if let Some(payload) = &report.non_struct {
                println!("non-struct payload: {payload}");
            }
            println!(
                "{:?}: {} message(s), {} byte(s) abandoned",
                report.disposition, report.stats.messages, report.stats.abandoned_bytes
            );
        }
    }
}

fn observation_rows(stats: &ReceiverStats) -> [(&'static str, u64); 9] {
    [
        ("messages", stats.messages),
        ("unhandled", stats.unhandled),
        ("unknown_identifier", stats.unknown_identifier),
        ("truncated", stats.truncated),
        ("non_struct", stats.non_struct),
        ("non_struct_failed", stats.non_struct_failed),
        ("non_struct_unhandled", stats.non_struct_unhandled),
        ("unconfigured", stats.unconfigured),
        ("abandoned_bytes", stats.abandoned_bytes),
    ]
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_table_lists_every_counter() {
        let stats = ReceiverStats {
            unconfigured: 2,
            ..ReceiverStats::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        let counters = json.as_object().unwrap();

        let rows = observation_rows(&stats);
        assert_eq!(rows.len(), counters.len());
        for (name, count) in rows {
            assert_eq!(counters[name], count, "{name}");
        }
        assert!(rows.contains(&("unconfigured", 2)));
    }
}
