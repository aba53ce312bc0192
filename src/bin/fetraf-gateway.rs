use anyhow::Result;
use fetraf_gateway::cli::{actions, actions::Action, start};

#[tokio::main]
async fn main() -> Result<()> {
    let action = start()?;

    match action {
        Action::Server { .. } => actions::server::handle(action).await?,
    }

    Ok(())
}
