//! `lidsweep resolve`: one-off lookups against the session mappings.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use lidsweep_identity::context::MessageContext;
use lidsweep_identity::{IdentityResolver, ResolutionSource};
use lidsweep_io::SessionDirMapping;

use crate::sweep::load_config;
use crate::CliError;

#[derive(Args)]
pub struct ResolveArgs {
    /// JID or phone number to resolve
    #[arg(required_unless_present = "context", conflicts_with = "context")]
    pub jid: Option<String>,

    /// Resolve the sender of a message context (JSON) instead
    #[arg(long)]
    pub context: Option<String>,

    /// Directory holding lid-mapping-*_reverse.json files
    #[arg(long, env = "SESSION_PATH")]
    pub session_path: Option<PathBuf>,

    /// Path to a sweep .toml config file (for `session_path`)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output JSON instead of the bare number
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ResolveOutput {
    input: String,
    canonical: String,
    source: ResolutionSource,
    phone_jid: String,
}

pub fn cmd_resolve(args: ResolveArgs) -> Result<(), CliError> {
    let session_path = match args.session_path {
        Some(path) => path,
        None => load_config(args.config.as_deref())?.session_path,
    };
    let resolver = IdentityResolver::new(SessionDirMapping::new(session_path));

    let input = match (args.jid, args.context) {
        (Some(jid), _) => jid,
        (None, Some(raw)) => {
            let ctx = MessageContext::from_json(&raw)
                .map_err(|e| CliError::usage(format!("invalid message context: {e}")))?;
            ctx.sender_jid()
                .map(str::to_string)
                .ok_or_else(|| {
                    CliError::usage("message context has no sender")
                        .with_hint("expected `from` or `key.remoteJid`")
                })?
        }
        (None, None) => return Err(CliError::usage("nothing to resolve")),
    };

    let resolution = resolver.resolve_detailed(&input);
    let output = ResolveOutput {
        phone_jid: resolver.normalize_to_phone_jid(&resolution.canonical),
        canonical: resolution.canonical,
        source: resolution.source,
        input,
    };

    if args.json {
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    } else {
        println!("{}", output.canonical);
        eprintln!("{} ({})", output.input, output.source);
    }

    if output.source.is_degraded() {
        eprintln!("warning: no usable LID mapping, LID returned as-is");
    }
    Ok(())
}
