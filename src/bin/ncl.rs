//! ncl: run nimbus.io command language statements.
//!
//! Usage: `ncl [-i IDENTITY_FILE] [-v...] [COMMAND...]`. The command words
//! are joined into one statement; with none, statements are read from stdin,
//! one per line.

use anyhow::{anyhow, bail, Context};
use clap::{ArgAction, Parser};
use lumberyard::command::{self, NclCommand};
use lumberyard::observability::LoggingConfig;
use lumberyard::{
    ConnectionConfig, Credentials, EnvIdentityProvider, FileIdentityProvider, HttpConnection,
    HttpRequest, IdentityProvider, ReadReporter,
};
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, trace};

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "ncl")]
#[command(about = "Nimbus.io Command Language", long_about = None, version)]
struct Cli {
    /// Path to a nimbus.io identity file
    #[arg(short, long, value_name = "PATH")]
    identity_file: Option<PathBuf>,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// An NCL statement; read from stdin when absent
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = LoggingConfig::from_verbosity(cli.verbose).init() {
        eprintln!("ncl: unable to initialize logging: {}", e);
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let identity = load_identity(cli)?;
    let config = ConnectionConfig::from_env()?;

    if !cli.words.is_empty() {
        return execute_line(&cli.words.join(" "), identity.as_ref(), &config);
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        execute_line(&line, identity.as_ref(), &config)
            .with_context(|| format!("statement failed: {}", line.trim()))?;
    }
    Ok(())
}

fn load_identity(cli: &Cli) -> anyhow::Result<Option<Credentials>> {
    if let Some(path) = &cli.identity_file {
        let credentials = FileIdentityProvider::with_path(path)
            .identity()
            .with_context(|| format!("invalid identity: unable to load {}", path.display()))?;
        return Ok(Some(credentials));
    }

    match EnvIdentityProvider::new().identity() {
        Ok(credentials) => Ok(Some(credentials)),
        Err(e) => {
            debug!(error = %e, "No identity in environment");
            Ok(None)
        }
    }
}

fn execute_line(
    line: &str,
    identity: Option<&Credentials>,
    config: &ConnectionConfig,
) -> anyhow::Result<()> {
    let command = command::parse(line)?;
    let route = command::route(&command, identity.map(Credentials::user_name))?;
    let host = route.host(config);
    info!(command = command.name(), host = %host, uri = %route.uri, "Executing statement");

    let mut connection = match identity {
        Some(credentials) => HttpConnection::authenticated(host, credentials.clone(), config.clone()),
        None => HttpConnection::unauthenticated(host, config.clone())?,
    };

    let result = execute(
        &mut connection,
        &command,
        route.to_request(),
        &mut io::stdout().lock(),
    );
    connection.close();
    result
}

/// Send the request for `command` and print its result to `out`.
fn execute(
    connection: &mut HttpConnection,
    command: &NclCommand,
    request: HttpRequest<'static>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        NclCommand::ArchiveKey { path, .. } => {
            let file =
                File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
            let length = file.metadata()?.len();
            let mut sent = 0u64;
            let reporter = ReadReporter::with_callback(file, move |n| {
                sent += n as u64;
                trace!(sent, length, "Archive progress");
            });
            let result: Value = connection
                .request(request.with_reader(reporter, Some(length)))?
                .read_json()?;
            print_value(out, &result)
        }
        NclCommand::RetrieveKey { .. } => {
            let mut response = connection.request(request)?;
            let mut buf = vec![0u8; READ_BUFFER_SIZE];
            loop {
                let n = response.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                out.write_all(&buf[..n])?;
            }
            out.flush()?;
            Ok(())
        }
        NclCommand::DeleteKey { .. } | NclCommand::DeleteCollection { .. } => {
            let body = connection.request(request)?.read_to_text()?;
            print_optional_json(out, &body)
        }
        NclCommand::ListCollections => {
            let collections: Vec<Value> = connection.request(request)?.read_json()?;
            for entry in &collections {
                writeln!(out, "{}", text(&entry["name"]))?;
            }
            Ok(())
        }
        NclCommand::ListKeys { .. } => {
            let result: Value = connection.request(request)?.read_json()?;
            print_key_listing(out, &result)
        }
        NclCommand::SpaceUsage { .. } => {
            let result: Value = connection.request(request)?.read_json()?;
            print_space_usage(out, &result)
        }
        _ => {
            let body = connection.request(request)?.read_to_text()?;
            print_optional_json(out, &body)
        }
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn count(entry: &Value, field: &str) -> u64 {
    entry[field].as_u64().unwrap_or(0)
}

fn print_value(out: &mut dyn Write, value: &Value) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn print_optional_json(out: &mut dyn Write, body: &str) -> anyhow::Result<()> {
    if body.trim().is_empty() {
        return Ok(());
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => print_value(out, &value),
        Err(_) => {
            writeln!(out, "{}", body.trim_end())?;
            Ok(())
        }
    }
}

fn print_key_listing(out: &mut dyn Write, result: &Value) -> anyhow::Result<()> {
    if let Some(keys) = result.get("key_data").and_then(Value::as_array) {
        for entry in keys {
            writeln!(out, "{}", text(&entry["key"]))?;
        }
    } else if let Some(prefixes) = result.get("prefixes").and_then(Value::as_array) {
        for prefix in prefixes {
            writeln!(out, "{}", text(prefix))?;
        }
    } else {
        bail!("unexpected listing result {}", result);
    }
    Ok(())
}

fn print_space_usage(out: &mut dyn Write, result: &Value) -> anyhow::Result<()> {
    if !result["success"].as_bool().unwrap_or(false) {
        return Err(anyhow!(
            "space usage failed: {}",
            text(&result["error_message"])
        ));
    }

    writeln!(out)?;
    let days = result["operational_stats"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();
    for day in days {
        writeln!(out, "{}", text(&day["day"]))?;
        if count(day, "archive_success") != 0 {
            writeln!(out, "{:>8} archive success", count(day, "archive_success"))?;
            writeln!(out, "{:>8} archive bytes", count(day, "success_bytes_in"))?;
        }
        if count(day, "retrieve_success") != 0 {
            writeln!(out, "{:>8} retrieve success", count(day, "retrieve_success"))?;
            writeln!(out, "{:>8} retrieve bytes", count(day, "success_bytes_out"))?;
        }
        if count(day, "delete_success") != 0 {
            writeln!(out, "{:>8} delete success", count(day, "delete_success"))?;
        }
        if count(day, "listmatch_success") != 0 {
            writeln!(out, "{:>8} listmatch success", count(day, "listmatch_success"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumberyard::mocks::{MockResponse, MockTransport, TestFixtures};
    use lumberyard::RequestSigner;
    use std::io::Write as _;

    fn run_statement(line: &str, responses: Vec<MockResponse>) -> (anyhow::Result<String>, MockTransport) {
        let transport = MockTransport::with_responses(responses);
        let handle = transport.clone();
        let command = command::parse(line).unwrap();
        let route = command::route(&command, Some("alice")).unwrap();
        let mut connection = HttpConnection::with_transport(
            route.host(&TestFixtures::config()),
            Some(RequestSigner::new(TestFixtures::credentials())),
            TestFixtures::config(),
            transport,
        );

        let mut out = Vec::new();
        let result = execute(&mut connection, &command, route.to_request(), &mut out)
            .map(|()| String::from_utf8(out).unwrap());
        (result, handle)
    }

    #[test]
    fn test_cli_parses_identity_and_words() {
        let cli = Cli::parse_from(["ncl", "-i", "/tmp/id", "-vv", "photos", "list", "keys"]);
        assert_eq!(cli.identity_file, Some(PathBuf::from("/tmp/id")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.words.join(" "), "photos list keys");
    }

    #[test]
    fn test_list_collections_prints_names() {
        let body = r#"[{"name": "dd-alice"}, {"name": "photos"}]"#;
        let (result, handle) = run_statement("list collections", vec![MockResponse::ok_with_body(body)]);
        assert_eq!(result.unwrap(), "dd-alice\nphotos\n");
        assert_eq!(handle.last_request().unwrap().uri, "/customers/alice/collections");
    }

    #[test]
    fn test_list_keys_prints_keys_or_prefixes() {
        let (result, _) = run_statement(
            "photos list keys",
            vec![MockResponse::ok_with_body(r#"{"key_data": [{"key": "a"}, {"key": "b"}]}"#)],
        );
        assert_eq!(result.unwrap(), "a\nb\n");

        let (result, _) = run_statement(
            "photos list keys delimiter=/",
            vec![MockResponse::ok_with_body(r#"{"prefixes": ["2023/", "2024/"]}"#)],
        );
        assert_eq!(result.unwrap(), "2023/\n2024/\n");
    }

    #[test]
    fn test_list_keys_rejects_unexpected_result() {
        let (result, _) = run_statement(
            "photos list keys",
            vec![MockResponse::ok_with_body(r#"{"other": 1}"#)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_space_usage_output() {
        let body = r#"{
            "success": true,
            "operational_stats": [
                {"day": "2024-05-01", "archive_success": 3, "success_bytes_in": 1024,
                 "retrieve_success": 0, "success_bytes_out": 0,
                 "delete_success": 1, "listmatch_success": 0}
            ]
        }"#;
        let (result, _) = run_statement("photos space usage", vec![MockResponse::ok_with_body(body)]);
        assert_eq!(
            result.unwrap(),
            "\n2024-05-01\n       3 archive success\n    1024 archive bytes\n       1 delete success\n"
        );
    }

    #[test]
    fn test_space_usage_failure_reports_message() {
        let body = r#"{"success": false, "error_message": "no such collection"}"#;
        let (result, _) = run_statement("photos space usage", vec![MockResponse::ok_with_body(body)]);
        assert!(result.unwrap_err().to_string().contains("no such collection"));
    }

    #[test]
    fn test_retrieve_streams_body() {
        let payload = vec![7u8; READ_BUFFER_SIZE + 10];
        let transport = MockTransport::with_responses(vec![MockResponse::ok_with_body(payload.clone())]);
        let command = command::parse("photos retrieve key blob").unwrap();
        let route = command::route(&command, None).unwrap();
        let mut connection =
            HttpConnection::with_transport("photos.nimbus.io", None, TestFixtures::config(), transport);

        let mut out = Vec::new();
        execute(&mut connection, &command, route.to_request(), &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_archive_uploads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"archive me").unwrap();
        let line = format!("photos archive key notes.txt {}", file.path().display());

        let (result, handle) = run_statement(
            &line,
            vec![MockResponse::created().with_body(r#"{"version_identifier": "v1"}"#)],
        );
        assert!(result.unwrap().contains("v1"));

        let request = handle.last_request().unwrap();
        assert_eq!(request.uri, "/data/notes.txt");
        assert_eq!(request.body.as_ref(), b"archive me");
    }

    #[test]
    fn test_unexpected_status_is_an_error() {
        let (result, _) = run_statement(
            "delete collection photos",
            vec![MockResponse::error(404, "Not Found")],
        );
        assert!(result.is_err());
    }
}
