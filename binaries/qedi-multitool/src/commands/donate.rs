use clap::Parser;
use qedi_structs::SuiAddress;

use crate::shared::{GlobalArgs, Tool, print_json};

#[derive(Parser)]
pub struct Args {
    recipient: SuiAddress,
    /// Amount in SUI, e.g. `0.5`.
    amount: String,
}

/// Always paid from the key's own coins, even with `--relay-url` set.
pub async fn run(args: Args, global: &GlobalArgs) -> anyhow::Result<()> {
    if global.key.is_none() {
        anyhow::bail!("donations need --key");
    }
    let tool = Tool::new(global).await?;
    let executed = tool.client.donate(args.recipient, &args.amount).await?;
    print_json(&executed)
}
