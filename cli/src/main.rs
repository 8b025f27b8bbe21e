use std::{
    fs::OpenOptions,
    io::{stderr, stdin, stdout, BufReader, Read, Write},
    process::ExitCode,
};

use clap::{command, Arg, ArgAction, ArgMatches, Command};
use colored::Colorize;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use toy_jsonpath::{enumerate, parse, resolve};

fn main() -> ExitCode {
    let arg_matches = command!()
        .about(
            r#"
jpx is a CLI tool for pulling values out of JSON documents. Point it at
a document and a path expression like $.employees[0].skills and it
prints the addressed subtree as JSON, or ask it for every path the
document contains. Path expressions support dot keys, bracket-quoted
keys for names that aren't bare identifiers, and array indices; there
are no wildcards, slices, or filters."#,
        )
        .subcommand(
            Command::new("extract")
                .about("Extract the value at a path expression from a JSON document")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("the JSON document; with a single argument this slot holds the path expression and the document is read from standard input"),
                )
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .help("the path expression, starting with '$'"),
                )
                .arg(
                    Arg::new("compact")
                        .long("compact")
                        .short('c')
                        .action(ArgAction::SetTrue)
                        .help("compact instead of pretty-printed output"),
                )
                .arg(
                    Arg::new("tab")
                        .long("tab")
                        .action(ArgAction::SetTrue)
                        .help("use tabs for indentation (default: 2 spaces)"),
                ),
        )
        .subcommand(
            Command::new("list-paths")
                .about("List every path expression that addresses a value in a JSON document")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .help("the JSON document; read from standard input when omitted"),
                ),
        )
        .after_help(
            r#"Examples:

  jpx extract data.json '$.company.name'
  jpx extract data.json '$.employees[0].skills'
  jpx extract data.json '$["key with spaces"]'
  jpx extract '$.company.name'     (JSON from standard input)
  jpx list-paths data.json
"#,
        )
        .get_matches();

    match arg_matches.subcommand() {
        Some(("extract", matches)) => extract(matches),
        Some(("list-paths", matches)) => list_paths(matches),
        _ => {
            report_error("expected a subcommand: extract or list-paths (see --help)");
            ExitCode::FAILURE
        }
    }
}

fn extract(matches: &ArgMatches) -> ExitCode {
    let first = matches.get_one::<String>("file");
    let second = matches.get_one::<String>("path");

    let (raw, path_expr) = match (first, second) {
        (Some(file), Some(path)) => {
            let raw = match read_file(file) {
                Ok(raw) => raw,
                Err(code) => return code,
            };
            (raw, path.as_str())
        }
        // single-argument form: the positional is the path expression
        // and the document comes from standard input
        (Some(path), None) => {
            let raw = match read_stdin() {
                Ok(raw) => raw,
                Err(code) => return code,
            };
            (raw, path.as_str())
        }
        _ => {
            report_error(
                "expected <FILE> <PATH>, or <PATH> alone to read the document from standard input",
            );
            return ExitCode::FAILURE;
        }
    };

    let document = match decode_document(&raw) {
        Ok(document) => document,
        Err(code) => return code,
    };

    let tokens = match parse(path_expr) {
        Ok(tokens) => tokens,
        Err(err) => {
            report_error(&format!("Invalid path: {}", err));
            return ExitCode::FAILURE;
        }
    };

    let value = match resolve(&document, &tokens) {
        Ok(value) => value,
        Err(err) => {
            report_error(&format!("Path error: {}", err));
            return ExitCode::FAILURE;
        }
    };

    let rendered = render_json(
        value,
        matches.get_flag("compact"),
        if matches.get_flag("tab") { "\t" } else { "  " },
    );

    let mut stdout = stdout().lock();
    stdout.write_all(rendered.as_bytes()).ok();
    stdout.write_all(&[b'\n']).ok();
    stdout.flush().ok();
    ExitCode::SUCCESS
}

fn list_paths(matches: &ArgMatches) -> ExitCode {
    let raw = match matches.get_one::<String>("file") {
        Some(file) => match read_file(file) {
            Ok(raw) => raw,
            Err(code) => return code,
        },
        None => match read_stdin() {
            Ok(raw) => raw,
            Err(code) => return code,
        },
    };

    let document = match decode_document(&raw) {
        Ok(document) => document,
        Err(code) => return code,
    };

    let mut stdout = stdout().lock();
    for path in enumerate(&document) {
        stdout.write_all(path.as_bytes()).ok();
        stdout.write_all(&[b'\n']).ok();
    }
    stdout.flush().ok();
    ExitCode::SUCCESS
}

fn decode_document(raw: &str) -> Result<Value, ExitCode> {
    match serde_json::from_str(raw.trim()) {
        Ok(value) => Ok(value),
        Err(err) => {
            report_error(&format!("Invalid JSON: {}", err));
            Err(ExitCode::FAILURE)
        }
    }
}

fn read_file(path: &str) -> Result<String, ExitCode> {
    let file = match OpenOptions::new().read(true).write(false).open(path) {
        Ok(file) => file,
        Err(err) => {
            report_error(&format!("Failed to open file '{}'. Message: {}", path, err));
            return Err(ExitCode::FAILURE);
        }
    };

    let mut bytes = Vec::new();
    if let Err(err) = BufReader::new(file).read_to_end(&mut bytes) {
        report_error(&format!("Failed to read file '{}'. Message: {}", path, err));
        return Err(ExitCode::FAILURE);
    }

    decode_input(bytes).map_err(|message| {
        report_error(&message);
        ExitCode::FAILURE
    })
}

fn read_stdin() -> Result<String, ExitCode> {
    println!("Paste JSON input (press Ctrl+D when done):");

    let mut bytes = Vec::new();
    if let Err(err) = BufReader::new(stdin().lock()).read_to_end(&mut bytes) {
        report_error(&format!("Failed to read standard input. Message: {}", err));
        return Err(ExitCode::FAILURE);
    }

    decode_input(bytes).map_err(|message| {
        report_error(&message);
        ExitCode::FAILURE
    })
}

/// Decodes raw input bytes into a string, honoring any Byte Order Mark
/// at the front. Input without a BOM is treated as UTF-8.
fn decode_input(bytes: Vec<u8>) -> Result<String, String> {
    if bytes.is_empty() {
        return Ok(String::new());
    }

    match bytes[0] {
        0xEF => {
            if bytes.len() < 3 || bytes[1] != 0xBB || bytes[2] != 0xBF {
                return Err("First byte was 0xEF, which was expected to signify UTF-8 encoding, but UTF-8 Byte Order Mark was not found.".to_string());
            }
            match String::from_utf8(bytes) {
                Ok(str) => Ok(str.trim_start_matches('\u{feff}').to_string()),
                Err(err) => Err(format!("Failed to parse UTF-8 string with error: {}", err)),
            }
        }
        0xFE => {
            if bytes.len() < 2 || bytes[1] != 0xFF {
                return Err("First byte was 0xFE, which was expected to signify UTF-16 Big Endian encoding, but UTF-16 Big Endian Byte Order Mark was not found.".to_string());
            }
            decode_utf16(&bytes[2..], u16::from_be_bytes)
        }
        0xFF => {
            if bytes.len() < 2 || bytes[1] != 0xFE {
                return Err("First byte was 0xFF, which was expected to signify UTF-16 Little Endian encoding, but UTF-16 Little Endian Byte Order Mark was not found.".to_string());
            }
            decode_utf16(&bytes[2..], u16::from_le_bytes)
        }
        _ => match String::from_utf8(bytes) {
            Ok(str) => Ok(str),
            Err(err) => Err(format!("No known Byte Order Mark was found, so input was parsed as UTF-8. The string was not valid UTF-8. Message: {}", err)),
        },
    }
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("UTF-16 input did not contain an even number of bytes.".to_string());
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect::<Vec<_>>();

    String::from_utf16(&units)
        .map_err(|err| format!("Failed to parse UTF-16 input. Message: {}", err))
}

fn render_json(value: &Value, compact: bool, indent_str: &str) -> String {
    if compact {
        return value.to_string();
    }

    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(indent_str.as_bytes());
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .expect("BUG: serializing to an in-memory buffer should not fail");
    String::from_utf8(out).expect("BUG: serde_json emits valid UTF-8")
}

fn report_error(message: &str) {
    let mut stderr = stderr().lock();
    stderr
        .write_all(format!("{} {}", "error:".red().bold(), message).as_bytes())
        .ok();
    stderr.write_all(&[b'\n']).ok();
    stderr.flush().ok();
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_input, render_json};

    #[test]
    fn decodes_plain_utf8() {
        assert_eq!("{\"a\": 1}", decode_input(b"{\"a\": 1}".to_vec()).unwrap());
        assert_eq!("", decode_input(Vec::new()).unwrap());
    }

    #[test]
    fn strips_utf8_byte_order_mark() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"true");
        assert_eq!("true", decode_input(bytes).unwrap());
    }

    #[test]
    fn decodes_utf16_via_byte_order_mark() {
        // "1" little endian
        assert_eq!("1", decode_input(vec![0xFF, 0xFE, 0x31, 0x00]).unwrap());
        // "1" big endian
        assert_eq!("1", decode_input(vec![0xFE, 0xFF, 0x00, 0x31]).unwrap());
    }

    #[test]
    fn rejects_truncated_encodings() {
        assert!(decode_input(vec![0xFF, 0x00]).is_err());
        assert!(decode_input(vec![0xFE, 0x00]).is_err());
        assert!(decode_input(vec![0xEF, 0xBB]).is_err());
        // odd byte count after a UTF-16 BOM
        assert!(decode_input(vec![0xFF, 0xFE, 0x31, 0x00, 0x31]).is_err());
    }

    #[test]
    fn renders_pretty_by_default() {
        let value = json!({"a": [1, 2]});
        assert_eq!(
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}",
            render_json(&value, false, "  ")
        );
    }

    #[test]
    fn renders_compact_and_tab_variants() {
        let value = json!({"a": [1, 2]});
        assert_eq!("{\"a\":[1,2]}", render_json(&value, true, "  "));
        assert_eq!(
            "{\n\t\"a\": [\n\t\t1,\n\t\t2\n\t]\n}",
            render_json(&value, false, "\t")
        );
    }
}
