use super::common::GlobalArgs;
use clap::Parser;
use healthdeck::Result;
use healthdeck::collectors::dashboard::CollectorKind;
use healthdeck::reports::generate_json;

#[derive(Parser, Debug)]
pub struct DetailArgs {
    /// Collector whose detail payload is printed
    #[arg(value_name = "COLLECTOR")]
    pub collector: CollectorKind,
}

pub async fn detail(global: &GlobalArgs, args: &DetailArgs) -> Result<()> {
    let payload = global.open_dashboard()?.detail(args.collector).await?;

    let mut output = String::new();
    generate_json(&payload, &mut output)?;
    print!("{output}");
    Ok(())
}
