use crate::roster::{CheckpointKey, Roster};
use crate::util::format_elapsed;
use itertools::Itertools;
use std::io::{Read, Write};

/// Pull candidate participant names out of a CSV name list: first column of
/// each row, trimmed. A leading header row ("name"/"runner") and malformed
/// or empty rows are skipped; the caller feeds survivors through
/// `add_participant` one by one, which does the real validation.
pub fn import_names<R: Read>(reader: R) -> Vec<String> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut names = Vec::new();
    for (i, record) in csv_reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(_) => continue,
        };
        let first = match record.get(0) {
            Some(first) if !first.is_empty() => first,
            _ => continue,
        };
        if i == 0 && matches!(first.to_lowercase().as_str(), "name" | "runner") {
            continue;
        }
        names.push(first.to_string());
    }
    names
}

/// Write the finish-order results table as CSV: runners with a recorded
/// mile3 first, fastest on top, then everyone else in roster order.
/// Unrecorded splits export as empty cells. Never mutates core state.
pub fn export_results<W: Write>(writer: W, roster: &Roster) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["name", "mile1", "mile2", "mile3"])?;

    let finish_order = roster
        .participants()
        .iter()
        .enumerate()
        .sorted_by_key(|(i, p)| match p.split(CheckpointKey::Mile3) {
            Some(ms) => (0, ms, *i),
            None => (1, 0, *i),
        });

    for (_, participant) in finish_order {
        let cell = |key: CheckpointKey| {
            participant
                .split(key)
                .map(format_elapsed)
                .unwrap_or_default()
        };
        let record = [
            participant.name.clone(),
            cell(CheckpointKey::Mile1),
            cell(CheckpointKey::Mile2),
            cell(CheckpointKey::Mile3),
        ];
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_plain_name_list() {
        let input = "Jane Smith\nJohn Doe\n";
        assert_eq!(import_names(input.as_bytes()), vec!["Jane Smith", "John Doe"]);
    }

    #[test]
    fn test_import_skips_header_row() {
        let input = "Name\nJane Smith\n";
        assert_eq!(import_names(input.as_bytes()), vec!["Jane Smith"]);
    }

    #[test]
    fn test_import_takes_first_column_only() {
        let input = "Jane Smith,12,varsity\nJohn Doe,9,jv\n";
        assert_eq!(import_names(input.as_bytes()), vec!["Jane Smith", "John Doe"]);
    }

    #[test]
    fn test_import_skips_blank_rows_and_trims() {
        let input = "  Jane Smith  \n\n   \nJohn Doe\n";
        assert_eq!(import_names(input.as_bytes()), vec!["Jane Smith", "John Doe"]);
    }

    #[test]
    fn test_import_empty_input() {
        assert!(import_names("".as_bytes()).is_empty());
    }

    #[test]
    fn test_export_orders_by_finish_and_formats_splits() {
        let mut roster = Roster::new();
        let slow = roster.add("Slow Sam").unwrap().id;
        let fast = roster.add("Fast Fran").unwrap().id;
        let unfinished = roster.add("Dnf Dana").unwrap().id;

        roster.record(&slow, CheckpointKey::Mile1, 65_000).unwrap();
        roster.record(&slow, CheckpointKey::Mile3, 1_200_000).unwrap();
        roster.record(&fast, CheckpointKey::Mile3, 1_000_000).unwrap();
        roster.record(&unfinished, CheckpointKey::Mile1, 70_000).unwrap();

        let mut out = Vec::new();
        export_results(&mut out, &roster).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "name,mile1,mile2,mile3");
        assert_eq!(lines[1], "Fast Fran,,,16:40");
        assert_eq!(lines[2], "Slow Sam,01:05,,20:00");
        assert_eq!(lines[3], "Dnf Dana,01:10,,");
    }

    #[test]
    fn test_export_empty_roster_is_header_only() {
        let mut out = Vec::new();
        export_results(&mut out, &Roster::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "name,mile1,mile2,mile3\n");
    }
}
