use super::common::GlobalArgs;
use clap::Parser;
use healthdeck::Result;
use healthdeck::collectors::logs::human_size;

#[derive(Parser, Debug)]
pub struct TruncateArgs {
    /// Log file to empty, with or without the `.log` suffix
    #[arg(value_name = "NAME")]
    pub name: String,
}

pub async fn truncate_log(global: &GlobalArgs, args: &TruncateArgs) -> Result<()> {
    match global.open_dashboard()?.truncate_log(&args.name).await? {
        Ok(report) => {
            println!("Truncated {} ({} freed)", report.filename, human_size(report.previous_size_bytes));
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    }
}
