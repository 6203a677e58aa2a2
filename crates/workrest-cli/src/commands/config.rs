use clap::Subcommand;
use workrest_core::CfgPatch;

use super::session::Session;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the active timer configuration
    Show,
    /// Change one or more timer configuration fields
    Set {
        /// Total work goal in hours
        #[arg(long)]
        total_hours: Option<f64>,
        /// Work phase length in minutes
        #[arg(long)]
        work_min: Option<f64>,
        /// Rest phase length in minutes
        #[arg(long)]
        rest_min: Option<f64>,
        /// Snooze increment in minutes
        #[arg(long)]
        snooze_min: Option<f64>,
    },
    /// Restore the default timer configuration from settings
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open()?;

    match action {
        ConfigAction::Show => {}
        ConfigAction::Set {
            total_hours,
            work_min,
            rest_min,
            snooze_min,
        } => {
            let patch = CfgPatch {
                total_hours,
                work_min,
                rest_min,
                snooze_min,
            };
            if patch.is_empty() {
                return Err("nothing to set; pass at least one field".into());
            }
            session.engine.configure(&patch)?;
        }
        ConfigAction::Reset => {
            let defaults = session.settings.defaults;
            session.engine.configure(&CfgPatch {
                total_hours: Some(defaults.total_hours),
                work_min: Some(defaults.work_min),
                rest_min: Some(defaults.rest_min),
                snooze_min: Some(defaults.snooze_min),
            })?;
        }
    }

    println!("{}", serde_json::to_string_pretty(session.engine.cfg())?);
    session.save()?;
    Ok(())
}
