use anyhow::Result;

use crate::config::Config;
use crate::pipeline::Resolver;
use crate::session::Conversation;

/// Resolves a single message from the command line, exactly as `POST /chat`
/// would, and prints the reply.
///
/// With `json = true` the output is the `/chat` response body plus the tier
/// that answered.
pub async fn run_ask(config: &Config, message: &str, json: bool) -> Result<()> {
    let resolver = Resolver::from_config(config).await?;
    let mut conversation = Conversation::new();
    let resolution = resolver.resolve(&mut conversation, message).await;

    if json {
        let mut body = serde_json::json!({
            "reply": resolution.reply,
            "tier": resolution.tier.as_str(),
        });
        if let Some(index) = resolution.index {
            body["index"] = serde_json::json!(index);
        }
        println!("{}", serde_json::to_string(&body)?);
    } else {
        println!("{}", resolution.reply);
    }

    Ok(())
}
