use super::common::GlobalArgs;
use clap::Parser;
use healthdeck::Result;
use healthdeck::reports::{ColorMode, generate_console, generate_json};

#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Print the aggregate as JSON
    #[arg(long)]
    pub json: bool,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,
}

pub fn summary(global: &GlobalArgs, args: &SummaryArgs) -> Result<()> {
    let aggregate = global.open_dashboard()?.summary();

    let mut output = String::new();
    if args.json {
        generate_json(&aggregate, &mut output)?;
    } else {
        generate_console(&aggregate, args.color, &mut output)?;
    }

    print!("{output}");
    Ok(())
}
