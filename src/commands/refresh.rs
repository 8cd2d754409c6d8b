use super::common::GlobalArgs;
use clap::Parser;
use healthdeck::Result;
use healthdeck::reports::{ColorMode, generate_console, generate_json};

#[derive(Parser, Debug)]
pub struct RefreshArgs {
    /// Ignore cached results and collect everything again
    #[arg(long)]
    pub force: bool,

    /// Print the aggregate as JSON
    #[arg(long)]
    pub json: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,
}

pub async fn refresh(global: &GlobalArgs, args: &RefreshArgs) -> Result<()> {
    let dashboard = global.open_dashboard()?;
    let snapshot = dashboard.refresh_all(args.force).await?;

    let mut output = String::new();
    if args.json {
        generate_json(&snapshot.summary, &mut output)?;
    } else {
        generate_console(&snapshot.summary, args.color, &mut output)?;
    }

    print!("{output}");
    Ok(())
}
