use std::{io::Read, path::PathBuf};

use {
    anyhow::{Context, Result},
    clap::{ArgMatches, Args},
    sharebridge_config::ShareConfig,
    sharebridge_pipeline::{
        ExtensionContext, IncomingRequest, InvocationController, InvocationError, JsonRequest,
        RequestAttachment, ShareRequest,
    },
    tracing::warn,
};

#[derive(Args)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .multiple(true)
        .args(["request", "text", "url", "file"]),
))]
pub struct ShareArgs {
    /// JSON request file, or `-` for stdin.
    #[arg(long, conflicts_with_all = ["text", "url", "file", "aux"])]
    request: Option<String>,
    /// Share a piece of text (repeatable).
    #[arg(long)]
    text: Vec<String>,
    /// Share a link (repeatable).
    #[arg(long)]
    url: Vec<String>,
    /// Share a local file (repeatable).
    #[arg(long)]
    file: Vec<PathBuf>,
    /// Text typed alongside the shared items.
    #[arg(long)]
    aux: Option<String>,
}

/// Reports the outcome on stderr; the summary goes to stdout.
struct TerminalContext;

impl ExtensionContext for TerminalContext {
    fn complete_request(&self) {}

    fn cancel_request(&self, domain: &'static str, error: &InvocationError) {
        eprintln!("share cancelled ({domain}): {error}");
    }
}

/// Process exit status for a cancelled invocation (sysexits.h).
pub fn exit_code(error: &InvocationError) -> i32 {
    match error {
        InvocationError::Config(_) => 78,
        InvocationError::NoAttachments { .. } => 65,
        InvocationError::NoAppGroup { .. } => 73,
        InvocationError::Publish { .. } => 74,
    }
}

/// `matches` are the `share` subcommand's matches. They carry the
/// positions used to keep ad-hoc flags in the order they were typed.
pub async fn handle_share(
    args: ShareArgs,
    matches: Option<&ArgMatches>,
    config: ShareConfig,
) -> Result<()> {
    let request = build_request(args, matches)?;
    let controller = InvocationController::new(config);

    match controller.execute(request.as_ref(), &TerminalContext).await {
        Ok(report) => {
            let summary = serde_json::json!({
                "status": "completed",
                "items": report.items,
                "storage_root": report.storage_root,
                "woke": report.woke,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        },
        Err(error) => {
            warn!(domain = error.domain(), "exiting after cancelled share");
            std::process::exit(exit_code(&error));
        },
    }
}

/// Ad-hoc flags become one group per value, in command-line order. A
/// request that is not JSON is handed over as is and fails after the
/// config has been read.
fn build_request(
    args: ShareArgs,
    matches: Option<&ArgMatches>,
) -> Result<Box<dyn IncomingRequest>> {
    if let Some(source) = args.request {
        let raw = read_request(&source)?;
        return Ok(Box::new(JsonRequest::parse(&raw)));
    }

    let mut tagged = Vec::new();
    tag(&mut tagged, matches, "text", args.text, RequestAttachment::text);
    tag(&mut tagged, matches, "url", args.url, RequestAttachment::url);
    tag(&mut tagged, matches, "file", args.file, RequestAttachment::file);
    tagged.sort_by_key(|(position, _)| *position);

    let mut request = tagged
        .into_iter()
        .fold(ShareRequest::new(), |request, (_, attachment)| {
            request.with(attachment)
        });
    if let Some(aux) = args.aux {
        request = request.with_auxiliary_text(aux);
    }
    Ok(Box::new(request))
}

/// Pair each value of flag `id` with its argv position. Values without a
/// known position sort last, keeping their relative order.
fn tag<T>(
    out: &mut Vec<(usize, RequestAttachment)>,
    matches: Option<&ArgMatches>,
    id: &str,
    values: Vec<T>,
    attach: impl Fn(T) -> RequestAttachment,
) {
    let positions: Vec<usize> = matches
        .and_then(|m| m.indices_of(id))
        .map(Iterator::collect)
        .unwrap_or_default();
    out.extend(values.into_iter().enumerate().map(|(i, value)| {
        (positions.get(i).copied().unwrap_or(usize::MAX), attach(value))
    }));
}

fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("reading request from stdin")?;
        Ok(raw)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading request {source}"))
    }
}
