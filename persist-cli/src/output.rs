use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use crate::{
    cli::OutputFormat,
    commands::Inspection,
    record::User,
};

pub fn format_users(users: &[User], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => {
            let mut output = String::new();
            for (index, user) in users.iter().enumerate() {
                let _ = writeln!(output, "User #{index}:");
                output.push_str(&user.to_string());
            }
            Ok(output)
        }
        OutputFormat::Json => to_json(users, true),
        OutputFormat::JsonCompact => to_json(users, false),
    }
}

pub fn format_inspection(inspection: &Inspection) -> String {
    let mut output = String::new();
    for frame in &inspection.frames {
        let _ = writeln!(
            output,
            "offset {:>8}  length {:>8}  back signature {}",
            frame.offset,
            frame.len,
            if frame.back_ok { "ok" } else { "BAD" }
        );
    }
    let _ = writeln!(
        output,
        "{} frame(s), {} byte(s) in file",
        inspection.frames.len(),
        inspection.file_len
    );
    output
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize output")
}
