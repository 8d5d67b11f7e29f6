//! Raw command passthrough.

use guestwire_core::{AttributeRecord, HotspotClient, Sentence};

use crate::cli::{GlobalOpts, OutputFormat, RawArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    client: &HotspotClient,
    args: RawArgs,
    global: &GlobalOpts,
    format: OutputFormat,
) -> Result<(), CliError> {
    let command = build_sentence(args)?;
    tracing::debug!(%command, "sending raw command");

    let records = client.run_raw(command).await?;
    let out = match format {
        OutputFormat::Table => table(&records),
        OutputFormat::Json => output::render_json(&records, false)?,
        OutputFormat::JsonCompact => output::render_json(&records, true)?,
        OutputFormat::Yaml => output::render_yaml(&records)?,
        OutputFormat::Plain => plain(&records),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

fn build_sentence(args: RawArgs) -> Result<Sentence, CliError> {
    if !args.command.starts_with('/') {
        return Err(CliError::Validation {
            field: "command".into(),
            reason: format!("expected a path like /ip/hotspot/user/print, got '{}'", args.command),
        });
    }
    if let Some(empty) = args.words.iter().position(String::is_empty) {
        return Err(CliError::Validation {
            field: "words".into(),
            reason: format!("word {} is empty", empty + 1),
        });
    }
    Ok(args
        .words
        .into_iter()
        .fold(Sentence::new(args.command), Sentence::with_word))
}

/// One column per key seen in any record, in first-seen order.
fn table(records: &[AttributeRecord]) -> String {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for (key, _) in record.iter() {
            if !header.iter().any(|h| h == key) {
                header.push(key.to_owned());
            }
        }
    }
    let rows = records
        .iter()
        .map(|r| header.iter().map(|k| r.get_or_default(k).to_owned()).collect())
        .collect();
    output::render_dynamic_table(header, rows)
}

fn plain(records: &[AttributeRecord]) -> String {
    records
        .iter()
        .map(|r| {
            r.iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(command: &str, words: &[&str]) -> RawArgs {
        RawArgs {
            command: command.into(),
            words: words.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn builds_sentence_from_words() {
        let sentence = build_sentence(args("/ip/hotspot/active/print", &["?user=g1"])).unwrap();
        assert_eq!(sentence.words(), ["/ip/hotspot/active/print", "?user=g1"]);
    }

    #[test]
    fn rejects_relative_paths_and_empty_words() {
        assert!(build_sentence(args("system/print", &[])).is_err());
        assert!(build_sentence(args("/system/print", &[""])).is_err());
    }

    #[test]
    fn plain_joins_pairs() {
        let records = vec![AttributeRecord::from_iter([("a", "1"), ("b", "2")])];
        assert_eq!(plain(&records), "a=1 b=2");
    }
}
