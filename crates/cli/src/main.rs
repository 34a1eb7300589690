use clap::Parser;

use buildledger_cli::{Cli, run};
use buildledger_infra::EngineConfig;

fn main() -> anyhow::Result<()> {
    buildledger_observability::init();

    let cli = Cli::parse();
    let output = run(cli, EngineConfig::from_env())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
