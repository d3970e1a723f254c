//! Mask command - runs the masking engine over stdin or a URI

use std::io::{self, Read, Write};

use anyhow::Context;
use clap::Args;

use crate::domain::{MaskStrategy, MaskingEngine};

/// Arguments for the mask command
#[derive(Args, Clone, Debug)]
pub struct MaskArgs {
    /// Comma-separated field or query parameter names
    #[arg(long)]
    pub fields: String,

    /// Reveal a prefix of each value instead of masking it fully
    #[arg(long)]
    pub pii: bool,

    /// Mask query parameters of this URI instead of reading stdin
    #[arg(long)]
    pub uri: Option<String>,

    /// Content type of the stdin content
    #[arg(long, default_value = "application/json")]
    pub content_type: String,
}

impl MaskArgs {
    fn strategy(&self) -> MaskStrategy {
        if self.pii {
            MaskStrategy::Pii
        } else {
            MaskStrategy::Full
        }
    }
}

/// Run the mask command
pub fn run(args: MaskArgs) -> anyhow::Result<()> {
    let engine = MaskingEngine::new();

    let output = match &args.uri {
        Some(uri) => engine.mask_query(uri, &args.fields, args.strategy()),
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
            mask(&engine, &args, &content)
        }
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output)?;

    Ok(())
}

fn mask(engine: &MaskingEngine, args: &MaskArgs, content: &str) -> String {
    engine.mask_content(&args.content_type, content, &args.fields, args.strategy())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pii: bool, content_type: &str) -> MaskArgs {
        MaskArgs {
            fields: "password,email".to_string(),
            pii,
            uri: None,
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_mask_json_content() {
        let engine = MaskingEngine::new();
        let output = mask(
            &engine,
            &args(false, "application/json"),
            r#"{"password":"secret","name":"frank"}"#,
        );
        assert_eq!(output, r#"{"password":"******","name":"frank"}"#);
    }

    #[test]
    fn test_mask_form_content_partially() {
        let engine = MaskingEngine::new();
        let output = mask(
            &engine,
            &args(true, "application/x-www-form-urlencoded"),
            "email=john@example.net&name=frank",
        );
        assert_eq!(output, "email=jo****@example.net&name=frank");
    }
}
